//! In-memory remote used by the engine tests.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use cloudfiles_protocol::codec;
use cloudfiles_protocol::messages::{
    ChunkUploadRequest, ChunkUploadResponse, RangeDownloadRequest, UploadedFile,
    WholeUploadRequest,
};
use cloudfiles_transfer::TransferError;

use crate::port::{PortFuture, RemoteTransferPort};
use crate::save::{LocalSaveTrigger, SaveRequest, SavedFile};

pub const FILE_ID: &str = "file-1";
pub const FOLDER_ID: &str = "folder-1";

/// Remote that accepts uploads into memory and serves `data` for downloads.
#[derive(Default)]
pub struct MockPort {
    pub data: Vec<u8>,
    pub whole_uploads: Mutex<Vec<WholeUploadRequest>>,
    pub chunk_uploads: Mutex<Vec<ChunkUploadRequest>>,
    pub range_requests: Mutex<Vec<RangeDownloadRequest>>,
    pub whole_downloads: Mutex<Vec<String>>,
    received: Mutex<Vec<u8>>,
    /// Chunk call index (0-based) that fails.
    pub fail_chunk_call: Option<usize>,
    /// Range start offsets that fail.
    pub fail_ranges: HashSet<u64>,
    /// Range start offsets answered one byte short.
    pub short_ranges: HashSet<u64>,
    /// Extra latency applied to a range, keyed by start offset.
    pub delays: Vec<(u64, Duration)>,
    /// Fixed answer for every chunk call instead of the simulated session.
    pub chunk_reply: Option<ChunkUploadResponse>,
}

impl MockPort {
    pub fn serving(data: Vec<u8>) -> Self {
        Self {
            data,
            ..Default::default()
        }
    }

    /// Remote whose `call`-th chunk upload (0-based) fails.
    pub fn failing_chunk(call: usize) -> Self {
        Self {
            fail_chunk_call: Some(call),
            ..Default::default()
        }
    }

    /// Remote answering every chunk call with `reply`.
    pub fn replying(reply: ChunkUploadResponse) -> Self {
        Self {
            chunk_reply: Some(reply),
            ..Default::default()
        }
    }

    pub fn received(&self) -> Vec<u8> {
        self.received.lock().unwrap().clone()
    }

    fn uploaded_file() -> UploadedFile {
        UploadedFile {
            id: FILE_ID.into(),
            parents: vec![FOLDER_ID.into()],
        }
    }
}

impl RemoteTransferPort for MockPort {
    fn upload_whole(&self, request: WholeUploadRequest) -> PortFuture<'_, UploadedFile> {
        Box::pin(async move {
            let bytes = codec::decode(&request.content_to_upload)?;
            *self.received.lock().unwrap() = bytes;
            self.whole_uploads.lock().unwrap().push(request);
            Ok(Self::uploaded_file())
        })
    }

    fn upload_chunk(&self, request: ChunkUploadRequest) -> PortFuture<'_, ChunkUploadResponse> {
        Box::pin(async move {
            let call = {
                let mut calls = self.chunk_uploads.lock().unwrap();
                calls.push(request.clone());
                calls.len() - 1
            };
            if self.fail_chunk_call == Some(call) {
                return Err(TransferError::Remote("UPLOAD_FAILED: Drive quota exceeded".into()));
            }
            if let Some(reply) = &self.chunk_reply {
                return Ok(reply.clone());
            }

            let bytes = codec::decode(&request.chunk_to_upload)?;
            let mut received = self.received.lock().unwrap();
            if request.start_byte != received.len() as u64 {
                return Err(TransferError::Remote("chunk out of order".into()));
            }
            received.extend_from_slice(&bytes);
            let latest = received.len() as u64;
            Ok(ChunkUploadResponse {
                resumable_latest_byte: latest,
                resumable_session_id: Some("session-1".into()),
                file: (latest == request.total_bytes).then(Self::uploaded_file),
            })
        })
    }

    fn download_whole(&self, file_version_id: String) -> PortFuture<'_, String> {
        Box::pin(async move {
            self.whole_downloads.lock().unwrap().push(file_version_id);
            Ok(codec::encode(&self.data))
        })
    }

    fn download_range(&self, request: RangeDownloadRequest) -> PortFuture<'_, String> {
        Box::pin(async move {
            self.range_requests.lock().unwrap().push(request.clone());
            let delay = self
                .delays
                .iter()
                .find(|(start, _)| *start == request.start_byte)
                .map(|(_, d)| *d);
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            } else {
                tokio::task::yield_now().await;
            }

            if self.fail_ranges.contains(&request.start_byte) {
                return Err(TransferError::Remote(format!(
                    "range {} unavailable",
                    request.start_byte
                )));
            }
            let start = request.start_byte as usize;
            let mut end = (request.end_byte as usize + 1).min(self.data.len());
            if self.short_ranges.contains(&request.start_byte) {
                end -= 1;
            }
            Ok(codec::encode(&self.data[start..end]))
        })
    }
}

/// Save trigger that keeps saved files in memory.
#[derive(Default)]
pub struct MemorySaver {
    pub saved: Mutex<Vec<SaveRequest>>,
}

impl LocalSaveTrigger for MemorySaver {
    fn save(&self, request: SaveRequest) -> PortFuture<'_, SavedFile> {
        Box::pin(async move {
            let file = SavedFile {
                path: request.file_name.clone().into(),
                file_name: request.file_name.clone(),
                mime_type: request.mime_type.clone(),
                size: request.bytes.len() as u64,
                sha256: cloudfiles_transfer::checksum_bytes(&request.bytes),
            };
            self.saved.lock().unwrap().push(request);
            Ok(file)
        })
    }
}

pub fn sample(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 253) as u8).collect()
}
