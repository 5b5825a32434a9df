//! Path-keyed blob storage used to persist deployment records.

use std::{
    collections::{HashMap, HashSet},
    fmt, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::{fs, sync::Mutex};

#[derive(Debug, thiserror::Error)]
pub enum BlobStoreError {
    #[error("Blob at {0:?} does not exist")]
    NotFound(PathBuf),
    #[error("I/O error accessing {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed (de)serializing blob at {path:?}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Raw blob storage keyed by file system paths.
#[async_trait]
pub trait BlobStore: 'static + fmt::Debug + Send + Sync {
    /// Creates the directory (with all parents) if it doesn't exist.
    async fn ensure_dir(&self, path: &Path) -> Result<(), BlobStoreError>;

    /// Writes a blob, replacing the existing one.
    async fn write_raw(&self, path: &Path, value: Vec<u8>) -> Result<(), BlobStoreError>;

    async fn read_raw(&self, path: &Path) -> Result<Vec<u8>, BlobStoreError>;

    /// Checks whether a blob or a directory exists at `path`.
    async fn path_exists(&self, path: &Path) -> Result<bool, BlobStoreError>;
}

impl dyn BlobStore + '_ {
    /// Serializes `value` as pretty-printed JSON and writes it to `path`.
    pub async fn write_json<T: Serialize>(
        &self,
        path: &Path,
        value: &T,
    ) -> Result<(), BlobStoreError> {
        let mut bytes =
            serde_json::to_vec_pretty(value).map_err(|source| BlobStoreError::Serialization {
                path: path.to_owned(),
                source,
            })?;
        bytes.push(b'\n');
        self.write_raw(path, bytes).await
    }

    pub async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T, BlobStoreError> {
        let bytes = self.read_raw(path).await?;
        serde_json::from_slice(&bytes).map_err(|source| BlobStoreError::Serialization {
            path: path.to_owned(),
            source,
        })
    }
}

/// [`BlobStore`] backed by the local file system.
#[derive(Debug, Default)]
pub struct FileBlobStore(());

impl FileBlobStore {
    pub fn arc() -> Arc<dyn BlobStore> {
        Arc::<Self>::default()
    }
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> BlobStoreError + '_ {
    move |source| {
        if source.kind() == io::ErrorKind::NotFound {
            BlobStoreError::NotFound(path.to_owned())
        } else {
            BlobStoreError::Io {
                path: path.to_owned(),
                source,
            }
        }
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn ensure_dir(&self, path: &Path) -> Result<(), BlobStoreError> {
        fs::create_dir_all(path).await.map_err(io_error(path))
    }

    async fn write_raw(&self, path: &Path, value: Vec<u8>) -> Result<(), BlobStoreError> {
        fs::write(path, value).await.map_err(io_error(path))
    }

    async fn read_raw(&self, path: &Path) -> Result<Vec<u8>, BlobStoreError> {
        fs::read(path).await.map_err(io_error(path))
    }

    async fn path_exists(&self, path: &Path) -> Result<bool, BlobStoreError> {
        fs::try_exists(path).await.map_err(io_error(path))
    }
}

#[derive(Debug, Default)]
struct MockBlobStoreInner {
    dirs: HashSet<PathBuf>,
    blobs: HashMap<PathBuf, Vec<u8>>,
}

/// In-memory [`BlobStore`]. Writing a blob requires its parent directory to be ensured first.
#[derive(Debug, Default)]
pub struct MockBlobStore {
    inner: Mutex<MockBlobStoreInner>,
}

impl MockBlobStore {
    pub fn arc() -> Arc<dyn BlobStore> {
        Arc::<Self>::default()
    }
}

#[async_trait]
impl BlobStore for MockBlobStore {
    async fn ensure_dir(&self, path: &Path) -> Result<(), BlobStoreError> {
        let mut lock = self.inner.lock().await;
        lock.dirs.extend(path.ancestors().map(Path::to_path_buf));
        Ok(())
    }

    async fn write_raw(&self, path: &Path, value: Vec<u8>) -> Result<(), BlobStoreError> {
        let mut lock = self.inner.lock().await;
        let parent = path.parent().unwrap_or(Path::new(""));
        if !parent.as_os_str().is_empty() && !lock.dirs.contains(parent) {
            return Err(BlobStoreError::NotFound(parent.to_owned()));
        }
        lock.blobs.insert(path.to_owned(), value);
        Ok(())
    }

    async fn read_raw(&self, path: &Path) -> Result<Vec<u8>, BlobStoreError> {
        let lock = self.inner.lock().await;
        lock.blobs
            .get(path)
            .cloned()
            .ok_or_else(|| BlobStoreError::NotFound(path.to_owned()))
    }

    async fn path_exists(&self, path: &Path) -> Result<bool, BlobStoreError> {
        let lock = self.inner.lock().await;
        Ok(lock.blobs.contains_key(path) || lock.dirs.contains(path))
    }
}
