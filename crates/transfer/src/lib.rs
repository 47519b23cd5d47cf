//! Building blocks of the chunked transfer engine: upload session state,
//! ranged download plans, the assembly buffer, byte sources and the
//! MIME/size policy shared with callers.

mod assembly;
mod chunked;
mod mime;
mod plan;
mod policy;
mod types;
mod validation;

pub use assembly::{AssemblyBuffer, RangeSlot};
pub use chunked::{
    ByteSource, DiskFile, InMemoryFile, calculate_file_checksum, checksum_bytes,
};
pub use mime::{file_type_label, resolve_safe_mime_type};
pub use plan::{ByteRange, DownloadPlan};
pub use policy::{
    FileFilter, FilterOutcome, extract_extension, format_file_size, normalize_allowed_types,
};
pub use types::{SessionStatus, TransferSession};
pub use validation::{sanitize_download_name, validate_file_name};

use cloudfiles_protocol::{RemoteFault, normalize_fault_message};

/// Errors produced by the transfer engine.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// Bad caller input; raised before any remote call.
    #[error("validation error: {0}")]
    Validation(String),

    /// A remote call failed or returned unusable data.
    #[error("remote error: {0}")]
    Remote(String),

    #[error("chunk length mismatch at [{start}-{end}]: expected {expected}, got {actual}")]
    LengthMismatch {
        start: u64,
        end: u64,
        expected: u64,
        actual: u64,
    },

    #[error("base64 decode error: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("assembly incomplete: {filled} of {total} ranges written")]
    IncompleteAssembly { filled: usize, total: usize },

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TransferError {
    /// Returns `true` for errors raised before any remote activity.
    pub fn is_validation(&self) -> bool {
        matches!(self, TransferError::Validation(_))
    }

    /// A single readable sentence for notification surfaces.
    pub fn user_message(&self) -> String {
        match self {
            TransferError::Remote(msg) => {
                normalize_fault_message(&serde_json::Value::String(msg.clone()))
            }
            other => other.to_string(),
        }
    }
}

impl From<RemoteFault> for TransferError {
    fn from(fault: RemoteFault) -> Self {
        TransferError::Remote(fault.describe())
    }
}
