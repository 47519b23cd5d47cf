//! Data types for the transfer flows.

use cloudfiles_protocol::constants::{BIG_FILE_SIZE, DEFAULT_CHUNK_SIZE, DEFAULT_THREADS};
use cloudfiles_transfer::ByteRange;

use crate::save::SavedFile;

/// Size thresholds and fan-out used by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferPolicy {
    /// Files at or below this size use the single-call paths.
    pub big_file_size: u64,
    pub chunk_size: u64,
    pub threads: usize,
}

impl Default for TransferPolicy {
    fn default() -> Self {
        Self {
            big_file_size: BIG_FILE_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            threads: DEFAULT_THREADS,
        }
    }
}

/// Outcome of a finished upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    /// Caller-side placeholder id the upload was started for.
    pub caller_file_id: String,
    /// Remote file id; `None` only if the remote never reported one.
    pub file_id: Option<String>,
    pub parent_folder_id: Option<String>,
}

/// Progress event emitted during upload.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    /// Percentage update. A chunked upload always ends with exactly one
    /// `percent == 100` event.
    Progress {
        caller_file_id: String,
        file_id: Option<String>,
        parent_folder_id: Option<String>,
        percent: u8,
    },
    /// Upload finished and the remote file is known.
    Completed { result: UploadResult },
    /// Upload aborted; placeholder state must be cleaned up by the caller.
    Failed {
        caller_file_id: String,
        error: String,
    },
}

/// A ranged download request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub file_version_id: String,
    pub total_size: u64,
    pub chunk_size: u64,
    pub threads: usize,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
}

impl DownloadRequest {
    /// Creates a request with default chunk size and thread count.
    pub fn new(file_version_id: impl Into<String>, total_size: u64) -> Self {
        Self {
            file_version_id: file_version_id.into(),
            total_size,
            chunk_size: DEFAULT_CHUNK_SIZE,
            threads: DEFAULT_THREADS,
            file_name: None,
            mime_type: None,
        }
    }

    pub fn with_chunking(mut self, chunk_size: u64, threads: usize) -> Self {
        self.chunk_size = chunk_size;
        self.threads = threads;
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// Progress event emitted during download.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadEvent {
    /// One range was fetched and assembled.
    RangeCompleted {
        file_version_id: String,
        range: ByteRange,
        completed: usize,
        total: usize,
    },
    /// A range (or the request itself) failed. `range` is `None` for
    /// failures outside any range, such as validation.
    Failed {
        file_version_id: String,
        range: Option<ByteRange>,
        error: String,
    },
    /// The assembled file was handed to the save trigger.
    Completed {
        file_version_id: String,
        file: SavedFile,
    },
}
