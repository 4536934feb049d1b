//! Error types for the pwdkeeper core library.

use crate::core::envelope::EnvelopeError;
use thiserror::Error;

/// All errors that can occur within the pwdkeeper core library.
#[derive(Debug, Error)]
pub enum KeeperError {
    /// A record ID was requested that does not exist in the tree.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A move would place a folder inside itself or one of its descendants.
    #[error("Cyclic move: {0}")]
    CyclicMove(String),

    /// A structural request that cannot be honoured for a reason other than a
    /// cycle (inserting under a leaf, detaching the root, duplicate IDs).
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// The document bytes are not a valid record document.
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// The envelope could not be opened with the supplied passphrase.
    #[error("Decryption failed: {0}")]
    Decryption(#[from] EnvelopeError),

    /// A caller-supplied argument is out of range.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The legacy import source could not be read.
    #[error("Import failed: {0}")]
    ImportIo(std::io::Error),

    /// An I/O operation on the filesystem failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be converted to or from JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias that pins the error type to [`KeeperError`].
pub type Result<T> = std::result::Result<T, KeeperError>;

impl KeeperError {
    /// Returns a short, human-readable message suitable for display to the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound(_) => "Record no longer exists".to_string(),
            Self::CyclicMove(_) => "A folder cannot be moved into itself".to_string(),
            Self::InvalidTarget(msg) => msg.clone(),
            Self::MalformedDocument(_) => "Could not read the password file".to_string(),
            Self::Decryption(EnvelopeError::AuthenticationFailed) => {
                "Wrong password, please try again".to_string()
            }
            Self::Decryption(e) => format!("Could not decrypt the password file: {e}"),
            Self::InvalidInput(msg) => msg.clone(),
            Self::ImportIo(e) => format!("Import failed: {e}"),
            Self::Io(e) => format!("File error: {e}"),
            Self::Json(e) => format!("Data format error: {e}"),
        }
    }
}
