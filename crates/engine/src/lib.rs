//! Transfer engine: chunked resumable upload and parallel ranged download.
//!
//! This crate holds the **transfer logic** only. The remote procedure layer
//! is reached through [`RemoteTransferPort`] and the user-visible save step
//! through [`LocalSaveTrigger`]; callers supply both, which keeps the
//! engines testable with mocks.
//!
//! # Upload
//!
//! Files at or below [`BIG_FILE_SIZE`] go up in a single call. Larger files
//! use a resumable session: one chunk per round-trip, strictly sequential,
//! with the remote's byte count driving the next offset.
//!
//! # Download
//!
//! Large files are split into a [`DownloadPlan`](cloudfiles_transfer::DownloadPlan)
//! and fetched by a small pool of workers sharing one queue. Each range is
//! written straight into its slot of the assembly buffer, then the whole
//! file is handed to the save trigger.

pub mod download;
pub mod orchestrator;
pub mod port;
pub mod save;
pub mod types;
pub mod upload;

#[cfg(test)]
mod mock;

pub use cloudfiles_protocol::constants::BIG_FILE_SIZE;
pub use cloudfiles_transfer::TransferError;
pub use download::DownloadEngine;
pub use orchestrator::TransferOrchestrator;
pub use port::{PortFuture, RemoteTransferPort};
pub use save::{FileSystemSaver, LocalSaveTrigger, SaveRequest, SavedFile};
pub use types::{DownloadEvent, DownloadRequest, TransferPolicy, UploadEvent, UploadResult};
pub use upload::UploadEngine;
