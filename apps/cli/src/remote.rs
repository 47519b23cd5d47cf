//! Directory-backed remote drive.
//!
//! Each stored file is `<id>.bin` plus `<id>.json` metadata. Resumable
//! upload sessions live in memory for the lifetime of the process and
//! accept chunks only at their current offset.

use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use cloudfiles_engine::{PortFuture, RemoteTransferPort, TransferError};
use cloudfiles_protocol::codec;
use cloudfiles_protocol::messages::{
    ChunkUploadRequest, ChunkUploadResponse, RangeDownloadRequest, UploadedFile,
    WholeUploadRequest,
};
use cloudfiles_transfer::validate_file_name;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::debug;

/// Folder every stored file is reported under.
pub const ROOT_FOLDER_ID: &str = "root";

/// Metadata stored next to each file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub mime_type: Option<String>,
    pub parents: Vec<String>,
}

struct PendingUpload {
    file_name: String,
    total_bytes: u64,
    received: u64,
    part_path: PathBuf,
}

pub struct DirectoryRemote {
    root: PathBuf,
    sessions: Mutex<HashMap<String, PendingUpload>>,
}

impl DirectoryRemote {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reads the metadata of a stored file.
    pub async fn metadata(&self, id: &str) -> Result<StoredFile, TransferError> {
        let path = self.path_for(id, "json")?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TransferError::Remote(format!("file not found: {id}")));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    fn path_for(&self, id: &str, ext: &str) -> Result<PathBuf, TransferError> {
        validate_file_name(id)?;
        Ok(self.root.join(format!("{id}.{ext}")))
    }

    /// Moves finished bytes into place under a new id and writes metadata.
    async fn store(&self, file_name: &str, data_path: &Path) -> Result<UploadedFile, TransferError> {
        let id = uuid::Uuid::new_v4().to_string();
        let size = tokio::fs::metadata(data_path).await?.len();
        tokio::fs::rename(data_path, self.path_for(&id, "bin")?).await?;

        let meta = StoredFile {
            id: id.clone(),
            name: file_name.to_string(),
            size,
            mime_type: mime_for_name(file_name),
            parents: vec![ROOT_FOLDER_ID.to_string()],
        };
        tokio::fs::write(self.path_for(&id, "json")?, serde_json::to_vec_pretty(&meta)?).await?;
        debug!(id = %id, name = %file_name, size, "file stored");

        Ok(UploadedFile {
            id,
            parents: meta.parents,
        })
    }

    async fn write_whole(&self, request: WholeUploadRequest) -> Result<UploadedFile, TransferError> {
        validate_file_name(&request.file_name)?;
        let bytes = codec::decode(&request.content_to_upload)?;
        tokio::fs::create_dir_all(&self.root).await?;

        let part = self.root.join(format!(".{}.part", uuid::Uuid::new_v4()));
        tokio::fs::write(&part, &bytes).await?;
        self.store(&request.file_name, &part).await
    }

    async fn append_chunk(
        &self,
        request: ChunkUploadRequest,
    ) -> Result<ChunkUploadResponse, TransferError> {
        validate_file_name(&request.file_name)?;
        let bytes = codec::decode(&request.chunk_to_upload)?;
        let mut sessions = self.sessions.lock().await;

        let session_id = match request.resumable_session_id {
            Some(id) => id,
            None => {
                if request.start_byte != 0 {
                    return Err(TransferError::Remote(
                        "a new upload session must start at byte 0".into(),
                    ));
                }
                tokio::fs::create_dir_all(&self.root).await?;
                let id = uuid::Uuid::new_v4().to_string();
                sessions.insert(
                    id.clone(),
                    PendingUpload {
                        file_name: request.file_name.clone(),
                        total_bytes: request.total_bytes,
                        received: 0,
                        part_path: self.root.join(format!(".{id}.part")),
                    },
                );
                id
            }
        };

        let Some(pending) = sessions.get_mut(&session_id) else {
            return Err(TransferError::Remote(format!(
                "unknown upload session: {session_id}"
            )));
        };
        if request.start_byte != pending.received {
            return Err(TransferError::Remote(format!(
                "chunk at byte {} does not continue session at byte {}",
                request.start_byte, pending.received
            )));
        }
        if pending.received + bytes.len() as u64 > pending.total_bytes {
            return Err(TransferError::Remote("chunk exceeds declared file size".into()));
        }

        let mut part = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&pending.part_path)
            .await?;
        part.write_all(&bytes).await?;
        part.flush().await?;
        pending.received += bytes.len() as u64;

        let latest = pending.received;
        if latest < pending.total_bytes {
            return Ok(ChunkUploadResponse {
                resumable_latest_byte: latest,
                resumable_session_id: Some(session_id),
                file: None,
            });
        }

        let Some(done) = sessions.remove(&session_id) else {
            return Err(TransferError::Remote(format!(
                "unknown upload session: {session_id}"
            )));
        };
        drop(sessions);
        let file = self.store(&done.file_name, &done.part_path).await?;
        Ok(ChunkUploadResponse {
            resumable_latest_byte: latest,
            resumable_session_id: Some(session_id),
            file: Some(file),
        })
    }

    async fn read_all(&self, id: String) -> Result<String, TransferError> {
        let bytes = match tokio::fs::read(self.path_for(&id, "bin")?).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TransferError::Remote(format!("file not found: {id}")));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(codec::encode(&bytes))
    }

    async fn read_range(&self, request: RangeDownloadRequest) -> Result<String, TransferError> {
        let path = self.path_for(&request.file_version_id, "bin")?;
        let mut file = match tokio::fs::File::open(&path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TransferError::Remote(format!(
                    "file not found: {}",
                    request.file_version_id
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let size = file.metadata().await?.len();
        if request.end_byte < request.start_byte || request.end_byte >= size {
            return Err(TransferError::Remote(format!(
                "range [{}-{}] outside file of {size} bytes",
                request.start_byte, request.end_byte
            )));
        }

        let mut buf = vec![0u8; request.expected_len() as usize];
        file.seek(SeekFrom::Start(request.start_byte)).await?;
        file.read_exact(&mut buf).await?;
        Ok(codec::encode(&buf))
    }
}

impl RemoteTransferPort for DirectoryRemote {
    fn upload_whole(&self, request: WholeUploadRequest) -> PortFuture<'_, UploadedFile> {
        Box::pin(self.write_whole(request))
    }

    fn upload_chunk(&self, request: ChunkUploadRequest) -> PortFuture<'_, ChunkUploadResponse> {
        Box::pin(self.append_chunk(request))
    }

    fn download_whole(&self, file_version_id: String) -> PortFuture<'_, String> {
        Box::pin(self.read_all(file_version_id))
    }

    fn download_range(&self, request: RangeDownloadRequest) -> PortFuture<'_, String> {
        Box::pin(self.read_range(request))
    }
}

/// Best-effort MIME type from the file extension.
fn mime_for_name(name: &str) -> Option<String> {
    let ext = cloudfiles_transfer::extract_extension(name);
    let mime = match ext.as_str() {
        "pdf" => "application/pdf",
        "json" => "application/json",
        "zip" => "application/zip",
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "html" | "htm" => "text/html",
        "xml" => "text/xml",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "exe" => "application/x-msdownload",
        _ => return None,
    };
    Some(mime.to_string())
}
