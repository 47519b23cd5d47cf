//! Local save trigger: the last step of every download.

use std::path::{Path, PathBuf};

use cloudfiles_transfer::{TransferError, checksum_bytes, validate_file_name};
use tracing::debug;

use crate::port::PortFuture;

/// Bytes ready to be saved under a file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub bytes: Vec<u8>,
    /// Already normalized through the MIME allow-list.
    pub mime_type: String,
    pub file_name: String,
}

/// Where and what was saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    pub path: PathBuf,
    pub file_name: String,
    pub mime_type: String,
    pub size: u64,
    /// SHA-256 hex digest of the saved bytes.
    pub sha256: String,
}

/// Performs the user-visible save of a downloaded file.
pub trait LocalSaveTrigger: Send + Sync {
    fn save(&self, request: SaveRequest) -> PortFuture<'_, SavedFile>;
}

/// Saves downloads into a directory.
///
/// Bytes go to a hidden `.part` file first and are renamed into place once
/// fully written, so a half-written file never carries the final name.
/// Existing files are kept; the new file gets a ` (n)` suffix.
#[derive(Debug, Clone)]
pub struct FileSystemSaver {
    dir: PathBuf,
}

impl FileSystemSaver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn save_to_dir(&self, request: SaveRequest) -> Result<SavedFile, TransferError> {
        validate_file_name(&request.file_name)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let target = unique_target(&self.dir, &request.file_name).await;
        let partial = self.dir.join(format!(".{}.part", request.file_name));

        tokio::fs::write(&partial, &request.bytes).await?;
        if let Err(e) = tokio::fs::rename(&partial, &target).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e.into());
        }

        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| request.file_name.clone());

        debug!(path = %target.display(), bytes = request.bytes.len(), "download saved");

        Ok(SavedFile {
            path: target,
            file_name,
            mime_type: request.mime_type,
            size: request.bytes.len() as u64,
            sha256: checksum_bytes(&request.bytes),
        })
    }
}

impl LocalSaveTrigger for FileSystemSaver {
    fn save(&self, request: SaveRequest) -> PortFuture<'_, SavedFile> {
        Box::pin(self.save_to_dir(request))
    }
}

/// Picks `name`, then `stem (1).ext`, `stem (2).ext`, … until one is free.
async fn unique_target(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
        return candidate;
    }

    let (stem, ext) = match name.rfind('.') {
        Some(dot) if dot > 0 => (&name[..dot], &name[dot..]),
        _ => (name, ""),
    };
    let mut n = 1u32;
    loop {
        let candidate = dir.join(format!("{stem} ({n}){ext}"));
        if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return candidate;
        }
        n += 1;
    }
}
