use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Mutex;

use sha2::{Digest, Sha256};

use crate::TransferError;

// ---------------------------------------------------------------------------
// Checksum helpers
// ---------------------------------------------------------------------------

/// Computes SHA-256 of `data` and returns the hex-encoded digest.
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Computes SHA-256 of an entire file and returns the hex-encoded digest.
pub fn calculate_file_checksum(path: &Path) -> Result<String, TransferError> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

// ---------------------------------------------------------------------------
// Byte sources
// ---------------------------------------------------------------------------

/// A named file whose bytes can be sliced at arbitrary offsets.
///
/// The upload loop reads from wherever the remote says it stopped, so
/// sources must support random access rather than a forward-only cursor.
pub trait ByteSource: Send + Sync {
    /// File name reported to the remote.
    fn name(&self) -> &str;

    /// Total size in bytes.
    fn size(&self) -> u64;

    /// Reads up to `len` bytes starting at `offset`.
    ///
    /// Returns fewer bytes only at end of file.
    fn read_range(&self, offset: u64, len: usize) -> Result<Vec<u8>, TransferError>;
}

/// A file held in memory.
#[derive(Debug, Clone)]
pub struct InMemoryFile {
    name: String,
    data: Vec<u8>,
}

impl InMemoryFile {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

impl ByteSource for InMemoryFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_range(&self, offset: u64, len: usize) -> Result<Vec<u8>, TransferError> {
        let start = usize::try_from(offset)
            .map_err(|_| TransferError::Validation(format!("offset {offset} out of range")))?
            .min(self.data.len());
        let end = start.saturating_add(len).min(self.data.len());
        Ok(self.data[start..end].to_vec())
    }
}

/// A file on local disk, read with seek + read per slice.
pub struct DiskFile {
    file: Mutex<std::fs::File>,
    name: String,
    size: u64,
}

impl DiskFile {
    /// Opens `path`; the reported name is the path's final component.
    pub fn open(path: &Path) -> Result<Self, TransferError> {
        let file = std::fs::File::open(path)?;
        let size = file.metadata()?.len();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| TransferError::InvalidPath(format!("no file name: {}", path.display())))?;
        Ok(Self {
            file: Mutex::new(file),
            name,
            size,
        })
    }
}

impl ByteSource for DiskFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn read_range(&self, offset: u64, len: usize) -> Result<Vec<u8>, TransferError> {
        let remaining = self.size.saturating_sub(offset);
        let read_size = std::cmp::min(remaining, len as u64) as usize;
        let mut buf = vec![0u8; read_size];
        if read_size == 0 {
            return Ok(buf);
        }

        let mut file = self
            .file
            .lock()
            .map_err(|_| TransferError::Io(std::io::Error::other("file handle poisoned")))?;
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut buf)?;
        Ok(buf)
    }
}
