use async_trait::async_trait;
use std::io::{ErrorKind, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::{Record, RecordStore};
use crate::errors::StoreError;

/// Stores a collection as one pretty-printed JSON array.
///
/// Each write goes to its own uniquely named temp file in the target's
/// directory, which is synced and then renamed over the target. An
/// interrupted write never leaves a truncated collection, and an abandoned
/// write cannot commit another write's half-finished file.
pub struct FileRecordStore<T> {
    path: PathBuf,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> FileRecordStore<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }

    /// `<dir>/<collection>.json`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(format!("{}.json", T::COLLECTION)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl<T: Record> RecordStore<T> for FileRecordStore<T> {
    async fn load_all(&self) -> Vec<T> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %self.path.display(),
                    collection = T::COLLECTION,
                    "No stored collection; starting empty"
                );
                return Vec::new();
            }
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    collection = T::COLLECTION,
                    error = %err,
                    "Failed to read stored collection; starting empty"
                );
                return Vec::new();
            }
        };

        match serde_json::from_slice::<Vec<T>>(&bytes) {
            Ok(records) => records,
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    collection = T::COLLECTION,
                    error = %err,
                    "Stored collection is corrupt; starting empty"
                );
                Vec::new()
            }
        }
    }

    async fn persist(&self, records: &[T]) -> Result<(), StoreError> {
        let body = serde_json::to_vec_pretty(records)?;

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &body)).await??;

        debug!(
            path = %self.path.display(),
            count = records.len(),
            "Persisted collection"
        );
        Ok(())
    }
}

fn write_atomically(path: &Path, body: &[u8]) -> Result<(), StoreError> {
    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            std::fs::create_dir_all(parent).map_err(|err| StoreError::io(parent, err))?;
            parent.to_path_buf()
        }
        None => PathBuf::from("."),
    };

    let mut temp = NamedTempFile::new_in(&dir).map_err(|err| StoreError::io(&dir, err))?;
    temp.write_all(body)
        .map_err(|err| StoreError::io(temp.path(), err))?;
    temp.as_file()
        .sync_all()
        .map_err(|err| StoreError::io(temp.path(), err))?;
    temp.persist(path)
        .map_err(|err| StoreError::io(path, err.error))?;
    Ok(())
}
