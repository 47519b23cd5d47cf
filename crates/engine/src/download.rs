//! Whole and parallel ranged download.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use cloudfiles_protocol::codec;
use cloudfiles_protocol::messages::RangeDownloadRequest;
use cloudfiles_transfer::{
    AssemblyBuffer, ByteRange, DownloadPlan, RangeSlot, TransferError, resolve_safe_mime_type,
    sanitize_download_name,
};
use futures_util::future::join_all;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::port::RemoteTransferPort;
use crate::save::{LocalSaveTrigger, SaveRequest, SavedFile};
use crate::types::{DownloadEvent, DownloadRequest};

/// Runs downloads against one remote port and hands results to a saver.
pub struct DownloadEngine<'a> {
    port: &'a dyn RemoteTransferPort,
    saver: &'a dyn LocalSaveTrigger,
}

/// Work queue and failure flag shared by the workers of one download.
struct RangeQueue<'b> {
    slots: Mutex<std::vec::IntoIter<RangeSlot<'b>>>,
    failed: AtomicBool,
    first_error: Mutex<Option<TransferError>>,
    completed: AtomicUsize,
    total: usize,
}

impl<'b> RangeQueue<'b> {
    fn new(slots: Vec<RangeSlot<'b>>) -> Self {
        let total = slots.len();
        Self {
            slots: Mutex::new(slots.into_iter()),
            failed: AtomicBool::new(false),
            first_error: Mutex::new(None),
            completed: AtomicUsize::new(0),
            total,
        }
    }

    /// Next unclaimed range, or `None` once drained or after a failure.
    fn claim(&self) -> Option<RangeSlot<'b>> {
        if self.failed.load(Ordering::SeqCst) {
            return None;
        }
        self.slots.lock().ok()?.next()
    }

    fn record_failure(&self, err: TransferError) {
        self.failed.store(true, Ordering::SeqCst);
        if let Ok(mut first) = self.first_error.lock() {
            first.get_or_insert(err);
        }
    }

    fn take_error(&self) -> Option<TransferError> {
        self.first_error.lock().ok().and_then(|mut e| e.take())
    }
}

impl<'a> DownloadEngine<'a> {
    pub fn new(port: &'a dyn RemoteTransferPort, saver: &'a dyn LocalSaveTrigger) -> Self {
        Self { port, saver }
    }

    /// Fetches the whole file in one call and saves it.
    pub async fn download_whole(
        &self,
        file_version_id: &str,
        file_name: Option<&str>,
        mime_type: Option<&str>,
    ) -> Result<SavedFile, TransferError> {
        if file_version_id.is_empty() {
            return Err(TransferError::Validation("file version id is required".into()));
        }

        let encoded = self.port.download_whole(file_version_id.to_string()).await?;
        let bytes = codec::decode(&encoded)?;
        debug!(file_version = %file_version_id, bytes = bytes.len(), "whole download fetched");

        self.saver
            .save(SaveRequest {
                bytes,
                mime_type: resolve_safe_mime_type(mime_type),
                file_name: sanitize_download_name(file_name),
            })
            .await
    }

    /// Fetches the file as ranges over a pool of workers, then saves it.
    ///
    /// Workers share one queue, so a slow range never holds up the others.
    /// After the first failure no new ranges are claimed; in-flight fetches
    /// finish and are discarded, and the first error is returned.
    pub async fn download_in_parallel(
        &self,
        request: &DownloadRequest,
        events_tx: &mpsc::Sender<DownloadEvent>,
    ) -> Result<SavedFile, TransferError> {
        let planned = DownloadPlan::new(request.total_size, request.chunk_size, request.threads)
            .and_then(|plan| AssemblyBuffer::new(&plan).map(|buffer| (plan, buffer)));
        let (plan, mut buffer) = match planned {
            Ok(planned) => planned,
            Err(e) => {
                self.emit_failed(events_tx, request, None, e.user_message()).await;
                return Err(e);
            }
        };

        info!(
            file_version = %request.file_version_id,
            bytes = plan.total_size(),
            ranges = plan.len(),
            workers = plan.worker_count(),
            "starting ranged download"
        );

        {
            let queue = RangeQueue::new(buffer.slots());
            let workers =
                (0..plan.worker_count()).map(|worker| self.run_worker(worker, &queue, request, events_tx));
            join_all(workers).await;

            if let Some(err) = queue.take_error() {
                return Err(err);
            }
        }

        let result = match buffer.into_bytes() {
            Ok(bytes) => {
                self.saver
                    .save(SaveRequest {
                        bytes,
                        mime_type: resolve_safe_mime_type(request.mime_type.as_deref()),
                        file_name: sanitize_download_name(request.file_name.as_deref()),
                    })
                    .await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(file) => {
                let _ = events_tx
                    .send(DownloadEvent::Completed {
                        file_version_id: request.file_version_id.clone(),
                        file: file.clone(),
                    })
                    .await;
                Ok(file)
            }
            Err(e) => {
                self.emit_failed(events_tx, request, None, e.user_message()).await;
                Err(e)
            }
        }
    }

    async fn run_worker(
        &self,
        worker: usize,
        queue: &RangeQueue<'_>,
        request: &DownloadRequest,
        events_tx: &mpsc::Sender<DownloadEvent>,
    ) {
        while let Some(slot) = queue.claim() {
            let range = slot.range();
            match self.fetch_into(&request.file_version_id, slot).await {
                Ok(range) => {
                    let completed = queue.completed.fetch_add(1, Ordering::SeqCst) + 1;
                    debug!(worker, start = range.start, end = range.end, completed, "range done");
                    let _ = events_tx
                        .send(DownloadEvent::RangeCompleted {
                            file_version_id: request.file_version_id.clone(),
                            range,
                            completed,
                            total: queue.total,
                        })
                        .await;
                }
                Err(e) => {
                    warn!(worker, start = range.start, end = range.end, error = %e, "range failed");
                    let error = e.user_message();
                    queue.record_failure(e);
                    self.emit_failed(events_tx, request, Some(range), error).await;
                    return;
                }
            }
        }
    }

    async fn fetch_into(
        &self,
        file_version_id: &str,
        slot: RangeSlot<'_>,
    ) -> Result<ByteRange, TransferError> {
        let range = slot.range();
        let encoded = self
            .port
            .download_range(RangeDownloadRequest {
                file_version_id: file_version_id.to_string(),
                start_byte: range.start,
                end_byte: range.end,
            })
            .await?;
        let bytes = codec::decode(&encoded)?;
        slot.fill(&bytes)
    }

    async fn emit_failed(
        &self,
        events_tx: &mpsc::Sender<DownloadEvent>,
        request: &DownloadRequest,
        range: Option<ByteRange>,
        error: String,
    ) {
        let _ = events_tx
            .send(DownloadEvent::Failed {
                file_version_id: request.file_version_id.clone(),
                range,
                error,
            })
            .await;
    }
}
