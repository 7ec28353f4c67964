//! Error types for ramdisk_core.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using ramdisk_core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can abort a ramdisk action or a ledger operation.
///
/// Every action failure leaves the ledger state exactly as it was before
/// the call.
#[derive(Error, Debug)]
pub enum Error {
    /// An action argument is out of range (e.g. filename length).
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// A string is not a valid 64-bit name.
    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// `create` was called for a file that already exists.
    #[error("File exists: {filename}")]
    AlreadyExists { filename: String },

    /// The file targeted by an action does not exist.
    #[error("File does not exist: {filename}")]
    NotFound { filename: String },

    /// The caller is authenticated but is not the file's owner.
    #[error("Not file owner: {account} does not own {filename}")]
    NotOwner { account: String, filename: String },

    /// The caller could not authenticate as the named account.
    #[error("Missing authority of {account}")]
    PermissionDenied { account: String },

    /// The suffix of the requested filename is still being auctioned.
    #[error("Suffix auction open: {suffix}")]
    AuctionOpen { suffix: String },

    /// The suffix of the requested filename belongs to someone else.
    #[error("Suffix not owned by {account}: {suffix}")]
    SuffixNotOwned { account: String, suffix: String },

    /// Node data exceeds the ledger's per-call cap.
    #[error("Node data too large: {size} bytes (limit {limit})")]
    NodeTooLarge { size: usize, limit: usize },

    /// Ledger directory is invalid or not initialized.
    #[error("Invalid ledger at {path}: {reason}")]
    InvalidLedger { path: PathBuf, reason: String },

    /// A persisted snapshot failed validation.
    #[error("Corrupted state at {path}: {reason}")]
    CorruptedState { path: PathBuf, reason: String },

    /// I/O error occurred during ledger file operations.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Snapshot (de)serialization failed.
    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

impl Error {
    /// Create an InvalidArgument error.
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Create an InvalidName error.
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(filename: impl ToString) -> Self {
        Error::AlreadyExists {
            filename: filename.to_string(),
        }
    }

    /// Create a NotFound error.
    pub fn not_found(filename: impl ToString) -> Self {
        Error::NotFound {
            filename: filename.to_string(),
        }
    }

    /// Create a NotOwner error.
    pub fn not_owner(account: impl ToString, filename: impl ToString) -> Self {
        Error::NotOwner {
            account: account.to_string(),
            filename: filename.to_string(),
        }
    }

    /// Create a PermissionDenied error.
    pub fn permission_denied(account: impl ToString) -> Self {
        Error::PermissionDenied {
            account: account.to_string(),
        }
    }

    /// Create an AuctionOpen error.
    pub fn auction_open(suffix: impl ToString) -> Self {
        Error::AuctionOpen {
            suffix: suffix.to_string(),
        }
    }

    /// Create a SuffixNotOwned error.
    pub fn suffix_not_owned(account: impl ToString, suffix: impl ToString) -> Self {
        Error::SuffixNotOwned {
            account: account.to_string(),
            suffix: suffix.to_string(),
        }
    }

    /// Create a NodeTooLarge error.
    pub fn node_too_large(size: usize, limit: usize) -> Self {
        Error::NodeTooLarge { size, limit }
    }

    /// Create an InvalidLedger error.
    pub fn invalid_ledger(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::InvalidLedger {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a CorruptedState error.
    pub fn corrupted_state(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::CorruptedState {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True for errors raised by the action checks (as opposed to host I/O).
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::InvalidArgument { .. }
                | Error::AlreadyExists { .. }
                | Error::NotFound { .. }
                | Error::NotOwner { .. }
                | Error::PermissionDenied { .. }
                | Error::AuctionOpen { .. }
                | Error::SuffixNotOwned { .. }
                | Error::NodeTooLarge { .. }
        )
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error::Io { source: err.error }
    }
}
