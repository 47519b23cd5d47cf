use cloudfiles_protocol::messages::{ChunkUploadResponse, UploadedFile};

use crate::TransferError;

/// Lifecycle of an upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

/// In-memory state of one chunked upload.
///
/// Owned by a single upload loop, so no interior locking. The remote's byte
/// count is authoritative: [`apply_response`](Self::apply_response) adopts it
/// rather than adding the local chunk size.
#[derive(Debug, Clone)]
pub struct TransferSession {
    file_name: String,
    total_bytes: u64,
    uploaded_bytes: u64,
    resume_session_id: Option<String>,
    result_file: Option<UploadedFile>,
    status: SessionStatus,
    error: String,
}

impl TransferSession {
    /// Creates a pending session for `total_bytes` bytes.
    pub fn new(file_name: impl Into<String>, total_bytes: u64) -> Self {
        Self {
            file_name: file_name.into(),
            total_bytes,
            uploaded_bytes: 0,
            resume_session_id: None,
            result_file: None,
            status: SessionStatus::Pending,
            error: String::new(),
        }
    }

    /// Marks the session as in-progress.
    pub fn start(&mut self) {
        self.status = SessionStatus::InProgress;
    }

    /// Adopts the remote's view after a chunk round-trip.
    ///
    /// A response carrying the final file completes the session. Otherwise
    /// the reported byte count must move forward and stay within the file.
    pub fn apply_response(&mut self, resp: ChunkUploadResponse) -> Result<(), TransferError> {
        if resp.resumable_session_id.is_some() {
            self.resume_session_id = resp.resumable_session_id;
        }

        if let Some(file) = resp.file {
            self.uploaded_bytes = self.total_bytes;
            self.result_file = Some(file);
            return Ok(());
        }

        let latest = resp.resumable_latest_byte;
        if latest > self.total_bytes {
            return Err(TransferError::Remote(format!(
                "remote reported {latest} bytes for a {} byte file",
                self.total_bytes
            )));
        }
        if latest <= self.uploaded_bytes {
            return Err(TransferError::Remote(format!(
                "upload made no progress: remote at {latest}, expected more than {}",
                self.uploaded_bytes
            )));
        }
        self.uploaded_bytes = latest;
        Ok(())
    }

    /// Marks the session as completed.
    pub fn complete(&mut self) {
        self.status = SessionStatus::Completed;
    }

    /// Marks the session as failed with an error message.
    pub fn fail(&mut self, err: &str) {
        self.status = SessionStatus::Failed;
        self.error = err.to_string();
    }

    /// `floor(uploaded / total * 100)`; an empty file counts as done.
    pub fn percent(&self) -> u8 {
        if self.total_bytes == 0 {
            return 100;
        }
        (u128::from(self.uploaded_bytes) * 100 / u128::from(self.total_bytes)) as u8
    }

    /// Returns `true` once every byte has been accepted by the remote.
    pub fn is_finished(&self) -> bool {
        self.uploaded_bytes >= self.total_bytes
    }

    /// Returns `true` if the session is pending or in-progress.
    pub fn is_active(&self) -> bool {
        matches!(self.status, SessionStatus::Pending | SessionStatus::InProgress)
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn uploaded_bytes(&self) -> u64 {
        self.uploaded_bytes
    }

    pub fn resume_session_id(&self) -> Option<&str> {
        self.resume_session_id.as_deref()
    }

    /// Remote file id, set only once the remote signalled completion.
    pub fn result_file_id(&self) -> Option<&str> {
        self.result_file.as_ref().map(|f| f.id.as_str())
    }

    pub fn result_parent_id(&self) -> Option<&str> {
        self.result_file.as_ref().and_then(UploadedFile::parent_folder_id)
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn error(&self) -> &str {
        &self.error
    }
}
