//! Centralized error types for mimeShell.
//!
//! Malformed input never shows up here: the parser degrades to a coarser
//! representation instead. These variants cover I/O and caller mistakes.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mimeShell library.
#[derive(Error, Debug)]
pub enum MimeError {
    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified file does not exist.
    #[error("Message file not found: {0}")]
    FileNotFound(PathBuf),

    /// The caller asked for the Nth part of a kind and there are fewer.
    #[error("No {kind} part at index {index}")]
    PartNotFound { kind: String, index: usize },

    /// The requested header is not present on the part.
    #[error("Header not found: {0}")]
    HeaderNotFound(String),

    /// A child was attached to a part that is not a container.
    #[error("Part is not a multipart container")]
    NotMultipart,

    /// An edit operation could not be applied to the tree.
    #[error("Invalid edit: {0}")]
    InvalidEdit(String),

    /// The `micalg` parameter names a digest we cannot compute.
    #[error("Unsupported digest algorithm: {0}")]
    UnsupportedDigest(String),

    /// A `multipart/signed` structure lacks its signature part.
    #[error("Signed message has no signature part")]
    SignatureMissing,
}

/// Convenience alias for `Result<T, MimeError>`.
pub type Result<T> = std::result::Result<T, MimeError>;

impl MimeError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a `PartNotFound` for the given kind label.
    pub fn part_not_found(kind: impl Into<String>, index: usize) -> Self {
        Self::PartNotFound {
            kind: kind.into(),
            index,
        }
    }

    /// `true` for the "absent, not corrupt" family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::PartNotFound { .. } | Self::HeaderNotFound(_) | Self::SignatureMissing
        )
    }
}

/// Allow `?` on `std::io::Error` inside functions returning `MimeError`
/// when no path context is available (rare, prefer `MimeError::io`).
impl From<std::io::Error> for MimeError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_family() {
        assert!(MimeError::part_not_found("text/plain", 2).is_not_found());
        assert!(MimeError::HeaderNotFound("X-Foo".into()).is_not_found());
        assert!(!MimeError::NotMultipart.is_not_found());
    }

    #[test]
    fn test_display_part_not_found() {
        let err = MimeError::part_not_found("text/html", 1);
        assert_eq!(err.to_string(), "No text/html part at index 1");
    }
}
