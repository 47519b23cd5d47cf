//! Transfer orchestrator.
//!
//! Picks the single-call or chunked path by size, reports terminal
//! events, and owns the event channels the UI layer listens on.

use cloudfiles_transfer::{ByteSource, TransferError};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::download::DownloadEngine;
use crate::port::RemoteTransferPort;
use crate::save::{LocalSaveTrigger, SavedFile};
use crate::types::{DownloadEvent, DownloadRequest, TransferPolicy, UploadEvent, UploadResult};
use crate::upload::UploadEngine;

const EVENT_CAPACITY: usize = 256;

/// Routes uploads and downloads through the size policy.
///
/// Events only flow once a receiver has been taken. Until then they are
/// dropped, so a caller that never listens cannot stall a transfer.
pub struct TransferOrchestrator {
    policy: TransferPolicy,
    upload_tx: mpsc::Sender<UploadEvent>,
    upload_taken: bool,
    download_tx: mpsc::Sender<DownloadEvent>,
    download_taken: bool,
}

impl Default for TransferOrchestrator {
    fn default() -> Self {
        Self::new(TransferPolicy::default())
    }
}

/// Sender whose receiver is already gone; every send fails immediately.
fn detached<T>() -> mpsc::Sender<T> {
    let (tx, _) = mpsc::channel(1);
    tx
}

impl TransferOrchestrator {
    pub fn new(policy: TransferPolicy) -> Self {
        Self {
            policy,
            upload_tx: detached(),
            upload_taken: false,
            download_tx: detached(),
            download_taken: false,
        }
    }

    pub fn policy(&self) -> TransferPolicy {
        self.policy
    }

    /// Takes the upload event receiver. Can only be called once.
    ///
    /// The receiver has to be drained: a full channel holds the upload back.
    pub fn take_upload_events(&mut self) -> Option<mpsc::Receiver<UploadEvent>> {
        if self.upload_taken {
            return None;
        }
        let (tx, rx) = mpsc::channel(EVENT_CAPACITY);
        self.upload_tx = tx;
        self.upload_taken = true;
        Some(rx)
    }

    /// Takes the download event receiver. Can only be called once.
    pub fn take_download_events(&mut self) -> Option<mpsc::Receiver<DownloadEvent>> {
        if self.download_taken {
            return None;
        }
        let (tx, rx) = mpsc::channel(EVENT_CAPACITY);
        self.download_tx = tx;
        self.download_taken = true;
        Some(rx)
    }

    /// Uploads `source`, whole when it is at most `big_file_size` bytes.
    pub async fn upload(
        &self,
        port: &dyn RemoteTransferPort,
        source: &dyn ByteSource,
        caller_file_id: &str,
    ) -> Result<UploadResult, TransferError> {
        let engine = UploadEngine::new(port);
        let outcome = if source.size() <= self.policy.big_file_size {
            engine.upload_whole(source, caller_file_id).await
        } else {
            engine
                .upload_in_chunks(source, caller_file_id, self.policy.chunk_size, &self.upload_tx)
                .await
        };

        match outcome {
            Ok(result) => {
                info!(
                    file = %source.name(),
                    file_id = result.file_id.as_deref().unwrap_or_default(),
                    "upload completed"
                );
                let _ = self
                    .upload_tx
                    .send(UploadEvent::Completed {
                        result: result.clone(),
                    })
                    .await;
                Ok(result)
            }
            Err(e) => {
                error!(file = %source.name(), error = %e, "upload failed");
                let _ = self
                    .upload_tx
                    .send(UploadEvent::Failed {
                        caller_file_id: caller_file_id.to_string(),
                        error: e.user_message(),
                    })
                    .await;
                Err(e)
            }
        }
    }

    /// Downloads a file version, whole when small and in ranges otherwise.
    ///
    /// Zero chunk size or thread count on the request fall back to the
    /// policy defaults.
    pub async fn download(
        &self,
        port: &dyn RemoteTransferPort,
        saver: &dyn LocalSaveTrigger,
        mut request: DownloadRequest,
    ) -> Result<SavedFile, TransferError> {
        let engine = DownloadEngine::new(port, saver);

        if request.total_size > 0 && request.total_size <= self.policy.big_file_size {
            let outcome = engine
                .download_whole(
                    &request.file_version_id,
                    request.file_name.as_deref(),
                    request.mime_type.as_deref(),
                )
                .await;
            let event = match &outcome {
                Ok(file) => DownloadEvent::Completed {
                    file_version_id: request.file_version_id.clone(),
                    file: file.clone(),
                },
                Err(e) => DownloadEvent::Failed {
                    file_version_id: request.file_version_id.clone(),
                    range: None,
                    error: e.user_message(),
                },
            };
            let _ = self.download_tx.send(event).await;
            return outcome;
        }

        if request.chunk_size == 0 {
            request.chunk_size = self.policy.chunk_size;
        }
        if request.threads == 0 {
            request.threads = self.policy.threads;
        }
        let outcome = engine.download_in_parallel(&request, &self.download_tx).await;
        match &outcome {
            Ok(file) => info!(file = %file.file_name, bytes = file.size, "download completed"),
            Err(e) => error!(file_version = %request.file_version_id, error = %e, "download failed"),
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{FILE_ID, MemorySaver, MockPort, sample};
    use cloudfiles_transfer::InMemoryFile;
    use std::time::Duration;
    use tokio::time::timeout;

    fn small_policy() -> TransferPolicy {
        TransferPolicy {
            big_file_size: 100,
            chunk_size: 40,
            threads: 2,
        }
    }

    #[tokio::test]
    async fn small_upload_takes_whole_path() {
        let mut orch = TransferOrchestrator::new(small_policy());
        let mut rx = orch.take_upload_events().unwrap();
        assert!(orch.take_upload_events().is_none());
        let port = MockPort::default();

        let result = orch
            .upload(&port, &InMemoryFile::new("a.txt", sample(100)), "tmp")
            .await
            .unwrap();

        assert_eq!(result.file_id.as_deref(), Some(FILE_ID));
        assert_eq!(port.whole_uploads.lock().unwrap().len(), 1);
        assert!(matches!(rx.try_recv().unwrap(), UploadEvent::Completed { .. }));
    }

    #[tokio::test]
    async fn large_upload_takes_chunked_path() {
        let mut orch = TransferOrchestrator::new(small_policy());
        let mut rx = orch.take_upload_events().unwrap();
        let port = MockPort::default();

        orch.upload(&port, &InMemoryFile::new("a.txt", sample(101)), "tmp")
            .await
            .unwrap();

        assert_eq!(port.chunk_uploads.lock().unwrap().len(), 3);
        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        assert!(matches!(events.last(), Some(UploadEvent::Completed { .. })));
        assert!(matches!(
            events[events.len() - 2],
            UploadEvent::Progress { percent: 100, .. }
        ));
    }

    #[tokio::test]
    async fn failed_upload_reports_readable_error() {
        let mut orch = TransferOrchestrator::new(small_policy());
        let mut rx = orch.take_upload_events().unwrap();
        let port = MockPort::failing_chunk(0);

        let err = orch
            .upload(&port, &InMemoryFile::new("a.txt", sample(500)), "tmp-7")
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::Remote(_)));
        match rx.try_recv().unwrap() {
            UploadEvent::Failed {
                caller_file_id,
                error,
            } => {
                assert_eq!(caller_file_id, "tmp-7");
                assert_eq!(error, "Drive quota exceeded");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn download_path_follows_size() {
        let data = sample(300);
        let port = MockPort::serving(data.clone());
        let saver = MemorySaver::default();
        let orch = TransferOrchestrator::new(small_policy());

        orch.download(&port, &saver, DownloadRequest::new("v", 80))
            .await
            .unwrap();
        assert_eq!(port.whole_downloads.lock().unwrap().len(), 1);

        let request = DownloadRequest::new("v", 300).with_chunking(0, 0);
        orch.download(&port, &saver, request).await.unwrap();
        assert_eq!(port.range_requests.lock().unwrap().len(), 8);
        assert_eq!(saver.saved.lock().unwrap()[1].bytes, data);
    }

    fn byte_policy() -> TransferPolicy {
        TransferPolicy {
            big_file_size: 0,
            chunk_size: 1,
            threads: 4,
        }
    }

    #[tokio::test]
    async fn upload_without_listener_runs_to_completion() {
        let orch = TransferOrchestrator::new(byte_policy());
        let port = MockPort::default();
        let data = sample(400);

        let result = timeout(
            Duration::from_secs(5),
            orch.upload(&port, &InMemoryFile::new("a.bin", data.clone()), "tmp"),
        )
        .await
        .expect("upload stalled")
        .unwrap();

        assert_eq!(result.file_id.as_deref(), Some(FILE_ID));
        assert_eq!(port.chunk_uploads.lock().unwrap().len(), 400);
        assert_eq!(port.received(), data);
    }

    #[tokio::test]
    async fn download_without_listener_runs_to_completion() {
        let data = sample(300);
        let port = MockPort::serving(data.clone());
        let saver = MemorySaver::default();
        let orch = TransferOrchestrator::new(byte_policy());

        timeout(
            Duration::from_secs(5),
            orch.download(&port, &saver, DownloadRequest::new("v", 300)),
        )
        .await
        .expect("download stalled")
        .unwrap();

        assert_eq!(port.range_requests.lock().unwrap().len(), 300);
        assert_eq!(saver.saved.lock().unwrap()[0].bytes, data);
    }

    #[tokio::test]
    async fn dropped_receivers_do_not_stall_transfers() {
        let mut orch = TransferOrchestrator::new(byte_policy());
        drop(orch.take_upload_events());
        drop(orch.take_download_events());
        let port = MockPort::serving(sample(300));
        let saver = MemorySaver::default();

        let uploaded = timeout(
            Duration::from_secs(5),
            orch.upload(&port, &InMemoryFile::new("a.bin", sample(300)), "tmp"),
        )
        .await
        .expect("upload stalled");
        assert!(uploaded.is_ok());

        let downloaded = timeout(
            Duration::from_secs(5),
            orch.download(&port, &saver, DownloadRequest::new("v", 300)),
        )
        .await
        .expect("download stalled");
        assert!(downloaded.is_ok());
    }
}
