//! Remote transfer port trait.
//!
//! The host app implements this trait on top of its remote procedure layer.
//! Using a trait keeps transfer logic decoupled from transport and testable
//! with mocks.

use std::future::Future;
use std::pin::Pin;

use cloudfiles_protocol::messages::{
    ChunkUploadRequest, ChunkUploadResponse, RangeDownloadRequest, UploadedFile,
    WholeUploadRequest,
};
use cloudfiles_transfer::TransferError;

/// Boxed future returned by port and save-trigger methods.
pub type PortFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, TransferError>> + Send + 'a>>;

/// The four remote operations the engines depend on.
///
/// Binary content crosses this boundary as base64 text.
pub trait RemoteTransferPort: Send + Sync {
    /// Stores a whole file in one call.
    fn upload_whole(&self, request: WholeUploadRequest) -> PortFuture<'_, UploadedFile>;

    /// Sends one chunk of a resumable upload.
    fn upload_chunk(&self, request: ChunkUploadRequest) -> PortFuture<'_, ChunkUploadResponse>;

    /// Fetches a whole stored file version as base64.
    fn download_whole(&self, file_version_id: String) -> PortFuture<'_, String>;

    /// Fetches an inclusive byte range as base64.
    ///
    /// The decoded length must equal `end_byte - start_byte + 1`.
    fn download_range(&self, request: RangeDownloadRequest) -> PortFuture<'_, String>;
}
