//! Interactive prompts.

use std::io::{self, BufRead, Write};
use std::path::Path;

use capysync_transfer::{ConcurrencyMode, TransferDirection};

use crate::config::Config;

/// Password used when the prompt is left empty (matches the public demo server).
const DEFAULT_PASSWORD: &str = "password";

/// Everything a run needs, gathered from the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub direction: TransferDirection,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub local_path: String,
    pub remote_path: String,
    pub mode: ConcurrencyMode,
}

impl SyncRequest {
    /// Returns `(source, dest)` for the chosen direction.
    pub fn endpoints(&self) -> (&str, &str) {
        match self.direction {
            TransferDirection::Upload => (&self.local_path, &self.remote_path),
            TransferDirection::Download => (&self.remote_path, &self.local_path),
        }
    }
}

/// Errors produced while reading the prompts.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("Invalid Action: {0}")]
    InvalidAction(String),

    #[error("invalid port: {0}")]
    InvalidPort(String),

    #[error("input closed")]
    Eof,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Line-oriented prompter over any reader/writer pair.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Prints `label [default]: ` and returns the trimmed answer or `default`.
    pub fn ask(&mut self, label: &str, default: &str) -> Result<String, PromptError> {
        write!(self.output, "{label} [{default}]: ")?;
        let answer = self.read_answer()?;
        Ok(if answer.is_empty() {
            default.to_string()
        } else {
            answer
        })
    }

    /// Asks the upload/download menu. Empty selects Download.
    pub fn ask_direction(&mut self) -> Result<TransferDirection, PromptError> {
        write!(
            self.output,
            "1\t=>\tUpload\n2\t=>\tDownload\nSelect an Option [2]: "
        )?;
        match self.read_answer()?.as_str() {
            "1" => Ok(TransferDirection::Upload),
            "" | "2" => Ok(TransferDirection::Download),
            other => Err(PromptError::InvalidAction(other.to_string())),
        }
    }

    pub fn ask_port(&mut self, default: u16) -> Result<u16, PromptError> {
        let answer = self.ask("Enter Port Number", &default.to_string())?;
        answer
            .parse()
            .map_err(|_| PromptError::InvalidPort(answer))
    }

    /// Only `y`/`Y` counts as yes.
    pub fn ask_yes_no(&mut self, label: &str) -> Result<bool, PromptError> {
        write!(self.output, "{label} [y/n]: ")?;
        Ok(self.read_answer()?.eq_ignore_ascii_case("y"))
    }

    fn read_answer(&mut self) -> Result<String, PromptError> {
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(PromptError::Eof);
        }
        Ok(line.trim().to_string())
    }
}

/// Asks every question in order and builds the request.
///
/// `read_password` is called for the password so a terminal can hide input.
pub fn gather<R, W, P>(
    prompter: &mut Prompter<R, W>,
    config: &Config,
    cwd: &Path,
    read_password: P,
) -> Result<SyncRequest, PromptError>
where
    R: BufRead,
    W: Write,
    P: FnOnce(&str) -> io::Result<String>,
{
    let direction = prompter.ask_direction()?;
    let host = prompter.ask("Enter Hostname", &config.host)?;
    let port = prompter.ask_port(config.port)?;
    let username = prompter.ask("Enter Username", &config.username)?;

    prompter.output.flush()?;
    let password = read_password("Enter Password: ")?;
    let password = if password.is_empty() {
        DEFAULT_PASSWORD.to_string()
    } else {
        password
    };

    let mode = if prompter.ask_yes_no("Use Multithreading?")? {
        ConcurrencyMode::ThreadPool
    } else {
        ConcurrencyMode::Sequential
    };

    let (local_path, remote_path) = match direction {
        TransferDirection::Upload => {
            let default_local = cwd.join("upload").to_string_lossy().into_owned();
            let local = prompter.ask("Enter Local Path", &default_local)?;
            let remote = prompter.ask("Enter Remote Path", &config.remote_path)?;
            (local, remote)
        }
        TransferDirection::Download => {
            let remote = prompter.ask("Enter Remote Path", &config.remote_path)?;
            let default_local = cwd.join("download").to_string_lossy().into_owned();
            let local = prompter.ask("Enter Local Path", &default_local)?;
            (local, remote)
        }
    };

    Ok(SyncRequest {
        direction,
        host,
        port,
        username,
        password,
        local_path,
        remote_path,
        mode,
    })
}
