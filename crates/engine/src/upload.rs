//! Whole and chunked resumable upload.

use cloudfiles_protocol::codec;
use cloudfiles_protocol::messages::{ChunkUploadRequest, WholeUploadRequest};
use cloudfiles_transfer::{ByteSource, TransferError, TransferSession, validate_file_name};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::port::RemoteTransferPort;
use crate::types::{UploadEvent, UploadResult};

/// Runs uploads against one remote port.
pub struct UploadEngine<'a> {
    port: &'a dyn RemoteTransferPort,
}

impl<'a> UploadEngine<'a> {
    pub fn new(port: &'a dyn RemoteTransferPort) -> Self {
        Self { port }
    }

    /// Uploads the whole file in a single remote call.
    pub async fn upload_whole(
        &self,
        source: &dyn ByteSource,
        caller_file_id: &str,
    ) -> Result<UploadResult, TransferError> {
        validate_file_name(source.name())?;
        let size = usize::try_from(source.size())
            .map_err(|_| TransferError::Validation("file too large for a single upload".into()))?;
        let bytes = source.read_range(0, size)?;

        debug!(file = %source.name(), bytes = bytes.len(), "uploading whole file");
        let file = self
            .port
            .upload_whole(WholeUploadRequest {
                file_name: source.name().to_string(),
                content_to_upload: codec::encode(&bytes),
            })
            .await?;

        Ok(UploadResult {
            caller_file_id: caller_file_id.to_string(),
            parent_folder_id: file.parent_folder_id().map(str::to_string),
            file_id: Some(file.id),
        })
    }

    /// Uploads the file through a resumable session, one chunk per call.
    ///
    /// The next offset always comes from the remote's byte count. Progress
    /// goes to `events_tx`; the stream ends with exactly one 100% event.
    pub async fn upload_in_chunks(
        &self,
        source: &dyn ByteSource,
        caller_file_id: &str,
        chunk_size: u64,
        events_tx: &mpsc::Sender<UploadEvent>,
    ) -> Result<UploadResult, TransferError> {
        validate_file_name(source.name())?;
        if chunk_size == 0 {
            return Err(TransferError::Validation("chunk size must be positive".into()));
        }
        let chunk_len = usize::try_from(chunk_size)
            .map_err(|_| TransferError::Validation(format!("chunk size {chunk_size} too large")))?;

        let mut session = TransferSession::new(source.name(), source.size());
        session.start();

        while !session.is_finished() {
            let offset = session.uploaded_bytes();
            let chunk = source.read_range(offset, chunk_len)?;
            if chunk.is_empty() {
                let err = TransferError::Validation(format!(
                    "source ended at {offset} of {} bytes",
                    session.total_bytes()
                ));
                session.fail(&err.to_string());
                return Err(err);
            }

            let request = ChunkUploadRequest {
                file_name: source.name().to_string(),
                chunk_to_upload: codec::encode(&chunk),
                resumable_session_id: session.resume_session_id().map(str::to_string),
                start_byte: offset,
                total_bytes: session.total_bytes(),
            };

            let response = match self.port.upload_chunk(request).await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!(file = %source.name(), offset, error = %e, "chunk upload failed");
                    session.fail(&e.to_string());
                    return Err(e);
                }
            };

            let carries_file = response.file.is_some();
            let reported = response.resumable_latest_byte;
            if let Err(e) = session.apply_response(response) {
                session.fail(&e.to_string());
                return Err(e);
            }

            let percent = session.percent();
            debug!(
                file = %source.name(),
                uploaded = session.uploaded_bytes(),
                total = session.total_bytes(),
                percent,
                "chunk accepted"
            );

            // The completing round trip is reported by the trailing event.
            if !carries_file && reported != 0 && percent != 100 {
                let _ = events_tx
                    .send(UploadEvent::Progress {
                        caller_file_id: caller_file_id.to_string(),
                        file_id: session.result_file_id().map(str::to_string),
                        parent_folder_id: session.result_parent_id().map(str::to_string),
                        percent,
                    })
                    .await;
            }
        }

        session.complete();
        let result = UploadResult {
            caller_file_id: caller_file_id.to_string(),
            file_id: session.result_file_id().map(str::to_string),
            parent_folder_id: session.result_parent_id().map(str::to_string),
        };

        let _ = events_tx
            .send(UploadEvent::Progress {
                caller_file_id: caller_file_id.to_string(),
                file_id: result.file_id.clone(),
                parent_folder_id: result.parent_folder_id.clone(),
                percent: 100,
            })
            .await;

        info!(file = %source.name(), bytes = session.total_bytes(), "chunked upload finished");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{FILE_ID, FOLDER_ID, MockPort, sample};
    use cloudfiles_protocol::messages::ChunkUploadResponse;
    use cloudfiles_transfer::InMemoryFile;

    const MIB: usize = 1024 * 1024;

    fn drain(rx: &mut mpsc::Receiver<UploadEvent>) -> Vec<UploadEvent> {
        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        events
    }

    fn percents(events: &[UploadEvent]) -> Vec<u8> {
        events
            .iter()
            .filter_map(|e| match e {
                UploadEvent::Progress { percent, .. } => Some(*percent),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn small_file_uploads_in_one_call() {
        let port = MockPort::default();
        let data = sample(500 * 1024);
        let source = InMemoryFile::new("report.pdf", data.clone());

        let result = UploadEngine::new(&port)
            .upload_whole(&source, "tmp-1")
            .await
            .unwrap();

        assert_eq!(port.whole_uploads.lock().unwrap().len(), 1);
        assert!(port.chunk_uploads.lock().unwrap().is_empty());
        assert_eq!(port.received(), data);
        assert_eq!(result.file_id.as_deref(), Some(FILE_ID));
        assert_eq!(result.parent_folder_id.as_deref(), Some(FOLDER_ID));
        assert_eq!(result.caller_file_id, "tmp-1");
    }

    #[tokio::test]
    async fn large_file_uploads_in_sequential_chunks() {
        let port = MockPort::default();
        let data = sample(5 * MIB);
        let source = InMemoryFile::new("video.mp4", data.clone());
        let (tx, mut rx) = mpsc::channel(64);

        let result = UploadEngine::new(&port)
            .upload_in_chunks(&source, "tmp-2", 2 * MIB as u64, &tx)
            .await
            .unwrap();

        let calls = port.chunk_uploads.lock().unwrap().clone();
        assert_eq!(calls.len(), 3);
        assert_eq!(
            calls.iter().map(|c| c.start_byte).collect::<Vec<_>>(),
            vec![0, 2 * MIB as u64, 4 * MIB as u64]
        );
        assert!(calls[0].resumable_session_id.is_none());
        assert_eq!(calls[1].resumable_session_id.as_deref(), Some("session-1"));
        assert!(calls.iter().all(|c| c.total_bytes == 5 * MIB as u64));
        assert_eq!(port.received(), data);

        assert_eq!(result.file_id.as_deref(), Some(FILE_ID));
        let events = drain(&mut rx);
        assert_eq!(percents(&events), vec![40, 80, 100]);
        assert_eq!(percents(&events).iter().filter(|p| **p == 100).count(), 1);
    }

    #[tokio::test]
    async fn chunk_failure_aborts_upload() {
        let port = MockPort::failing_chunk(1);
        let source = InMemoryFile::new("video.mp4", sample(5 * MIB));
        let (tx, mut rx) = mpsc::channel(64);

        let err = UploadEngine::new(&port)
            .upload_in_chunks(&source, "tmp-3", 2 * MIB as u64, &tx)
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::Remote(_)));
        assert_eq!(err.user_message(), "Drive quota exceeded");
        assert_eq!(port.chunk_uploads.lock().unwrap().len(), 2);
        assert_eq!(percents(&drain(&mut rx)), vec![40]);
    }

    #[tokio::test]
    async fn stalled_remote_is_an_error_not_a_loop() {
        let port = MockPort::replying(ChunkUploadResponse {
            resumable_latest_byte: 0,
            resumable_session_id: Some("s".into()),
            file: None,
        });
        let source = InMemoryFile::new("a.bin", sample(3 * MIB));
        let (tx, _rx) = mpsc::channel(64);

        let err = UploadEngine::new(&port)
            .upload_in_chunks(&source, "tmp-4", 2 * MIB as u64, &tx)
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::Remote(_)));
        assert_eq!(port.chunk_uploads.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_file_emits_only_final_progress() {
        let port = MockPort::default();
        let source = InMemoryFile::new("empty.txt", Vec::new());
        let (tx, mut rx) = mpsc::channel(8);

        let result = UploadEngine::new(&port)
            .upload_in_chunks(&source, "tmp-5", 1024, &tx)
            .await
            .unwrap();

        assert!(port.chunk_uploads.lock().unwrap().is_empty());
        assert!(result.file_id.is_none());
        assert_eq!(percents(&drain(&mut rx)), vec![100]);
    }

    #[tokio::test]
    async fn zero_chunk_size_rejected_before_any_call() {
        let port = MockPort::default();
        let source = InMemoryFile::new("a.bin", sample(10));
        let (tx, _rx) = mpsc::channel(8);

        let err = UploadEngine::new(&port)
            .upload_in_chunks(&source, "tmp-6", 0, &tx)
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(port.chunk_uploads.lock().unwrap().is_empty());
    }
}
