use std::path::{Component, Path};

/// Error returned when a directory entry name is not a single plain component.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid entry name {name:?}: {reason}")]
pub struct InvalidEntryName {
    pub name: String,
    pub reason: &'static str,
}

/// Validates that a listed entry name joins onto its parent without escaping it.
///
/// Rejects:
/// - Empty names
/// - Names containing `/` (or `\` on Windows)
/// - `.` and `..`
/// - Absolute paths and Windows prefix components (`C:`, `\\server`)
pub fn validate_entry_name(name: &str) -> Result<(), InvalidEntryName> {
    let invalid = |reason| InvalidEntryName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("empty name"));
    }
    if name.contains('/') {
        return Err(invalid("contains a path separator"));
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        (Some(Component::ParentDir), _) => Err(invalid("parent directory reference")),
        (Some(Component::CurDir), _) => Err(invalid("current directory reference")),
        (Some(Component::RootDir | Component::Prefix(_)), _) => Err(invalid("absolute path")),
        _ => Err(invalid("contains a path separator")),
    }
}
