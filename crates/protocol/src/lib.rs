//! Wire types shared by the transfer engine and its remote collaborators.
//!
//! The remote side speaks JSON with camelCase field names and carries
//! binary content as standard base64 strings.

pub mod codec;
pub mod constants;
pub mod fault;
pub mod messages;

pub use codec::{decode, encode};
pub use fault::{RemoteFault, normalize_fault_message};
pub use messages::{ChunkUploadRequest, ChunkUploadResponse, UploadedFile};
