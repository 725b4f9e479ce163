use russh::client::Handler;
use russh::keys::{HashAlg, PublicKey, PublicKeyBase64};
use tracing::{info, warn};

/// SSH client handler: verifies the server key against an optional allow-list.
pub(crate) struct ClientHandler {
    /// OpenSSH `SHA256:...` fingerprints or raw base64 keys. Empty accepts any key.
    pub allowed_fingerprints: Vec<String>,
}

impl Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(&mut self, server_public_key: &PublicKey) -> Result<bool, Self::Error> {
        let fingerprint = server_public_key.fingerprint(HashAlg::Sha256).to_string();
        if self.allowed_fingerprints.is_empty() {
            info!(%fingerprint, "accepting server key (no allow-list configured)");
            return Ok(true);
        }

        let key_b64 = server_public_key.public_key_base64();
        let ok = key_allowed(&self.allowed_fingerprints, &fingerprint, &key_b64);
        if !ok {
            warn!(%fingerprint, "server key not in allow-list");
        }
        Ok(ok)
    }
}

pub(crate) fn key_allowed(allowed: &[String], fingerprint: &str, key_b64: &str) -> bool {
    allowed
        .iter()
        .map(|s| s.trim())
        .any(|s| s == fingerprint || s == key_b64)
}
