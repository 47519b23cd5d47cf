//! Directory-backed relay store: one JSON file per record, so separate
//! processes can hand config to each other.

use std::path::PathBuf;

use cloudfiles_protocol::messages::ConfigRecord;
use cloudfiles_relay::{EphemeralStore, RelayError, StoreFuture};

pub struct DirectoryStore {
    dir: PathBuf,
}

impl DirectoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, config_id: &str) -> Result<PathBuf, RelayError> {
        let valid = !config_id.is_empty()
            && config_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(RelayError::Store(format!("invalid config id: {config_id}")));
        }
        Ok(self.dir.join(format!("{config_id}.json")))
    }
}

fn store_err(e: impl std::fmt::Display) -> RelayError {
    RelayError::Store(e.to_string())
}

impl EphemeralStore for DirectoryStore {
    fn generate_id(&self) -> StoreFuture<'_, String> {
        Box::pin(async { Ok(uuid::Uuid::new_v4().to_string()) })
    }

    fn put(&self, record: ConfigRecord) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let path = self.path_for(&record.config_id)?;
            tokio::fs::create_dir_all(&self.dir).await.map_err(store_err)?;

            let tmp = self.dir.join(format!(".{}.tmp", record.config_id));
            let json = serde_json::to_vec(&record)?;
            tokio::fs::write(&tmp, json).await.map_err(store_err)?;
            tokio::fs::rename(&tmp, &path).await.map_err(store_err)?;
            Ok(())
        })
    }

    fn get(&self, config_id: String) -> StoreFuture<'_, Option<String>> {
        Box::pin(async move {
            let path = self.path_for(&config_id)?;
            let content = match tokio::fs::read_to_string(&path).await {
                Ok(c) => c,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
                Err(e) => return Err(store_err(e)),
            };
            let record: ConfigRecord = serde_json::from_str(&content).map_err(store_err)?;
            Ok(Some(record.payload_json))
        })
    }

    fn delete(&self, config_id: String) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let path = self.path_for(&config_id)?;
            match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(store_err(e)),
            }
        })
    }
}
