//! Flat-file persistence: one JSON document holding the whole collection,
//! plus an uploads directory of photo files referenced by name.

pub mod ids;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::models::Collection;

const DOCUMENT_FILE: &str = "db.json";
const UPLOADS_DIR: &str = "uploads";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("document {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

trait IoContext<T> {
    fn at(self, path: &Path) -> StoreResult<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn at(self, path: &Path) -> StoreResult<T> {
        self.map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Document + uploads directory under a single cache directory.
///
/// Every `load` re-reads the file and every `save` replaces it whole; nothing
/// is cached between requests. Writers inside this process serialize through
/// [`FileStore::write_lock`], held from `load` to `save`. Writers in other
/// processes are not coordinated and can still lose updates.
#[derive(Debug)]
pub struct FileStore {
    document: PathBuf,
    uploads: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Create the cache directory, the uploads directory and an empty document
    /// when they are missing.
    pub async fn open(cache_dir: impl AsRef<Path>) -> StoreResult<Self> {
        let cache_dir = cache_dir.as_ref();
        let uploads = cache_dir.join(UPLOADS_DIR);
        fs::create_dir_all(&uploads).await.at(&uploads)?;

        let store = Self {
            document: cache_dir.join(DOCUMENT_FILE),
            uploads,
            write_lock: Mutex::new(()),
        };

        if !fs::try_exists(&store.document).await.at(&store.document)? {
            store.save(&Collection::default()).await?;
            info!(path = %store.document.display(), "Created empty inventory document");
        }

        Ok(store)
    }

    pub fn document_path(&self) -> &Path {
        &self.document
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads
    }

    /// Exclusive access for a load → mutate → save sequence.
    pub async fn write_lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }

    /// Read and parse the whole document. A document deleted after startup
    /// reads as an empty collection.
    pub async fn load(&self) -> StoreResult<Collection> {
        let bytes = match fs::read(&self.document).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Collection::default());
            }
            Err(e) => return Err(e).at(&self.document),
        };
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
            path: self.document.clone(),
            source,
        })
    }

    /// Replace the document with `collection`. Written to a sibling temp file
    /// and renamed so readers see either the old or the new document.
    pub async fn save(&self, collection: &Collection) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(collection)?;
        let tmp = self.document.with_extension("json.tmp");
        fs::write(&tmp, &bytes).await.at(&tmp)?;
        fs::rename(&tmp, &self.document).await.at(&self.document)?;
        debug!(items = collection.items.len(), bytes = bytes.len(), "Saved document");
        Ok(())
    }

    // ── Photos ────────────────────────────────────────────────────────────────

    /// Path of a stored photo, or `None` when `name` is not a plain file name.
    pub fn photo_path(&self, name: &str) -> Option<PathBuf> {
        let plain = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\']);
        plain.then(|| self.uploads.join(name))
    }

    /// Path of a stored photo that is present on disk.
    pub async fn existing_photo(&self, name: &str) -> StoreResult<Option<PathBuf>> {
        let Some(path) = self.photo_path(name) else {
            return Ok(None);
        };
        let exists = fs::try_exists(&path).await.at(&path)?;
        Ok(exists.then_some(path))
    }

    /// Delete a photo file. Returns whether a file was actually removed.
    pub async fn remove_photo(&self, name: &str) -> StoreResult<bool> {
        let Some(path) = self.photo_path(name) else {
            return Ok(false);
        };
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(photo = name, "Removed photo file");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).at(&path),
        }
    }

    /// Open a fresh file in the uploads directory for a client upload named
    /// `original`. Returns the stored name and the open file.
    pub async fn create_upload(&self, original: &str) -> StoreResult<(String, fs::File)> {
        let name = ids::upload_file_name(original);
        let path = self.uploads.join(&name);
        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .at(&path)?;
        Ok((name, file))
    }

    /// Write a complete photo in one call.
    #[cfg(test)]
    pub async fn write_photo(&self, original: &str, bytes: &[u8]) -> StoreResult<String> {
        use tokio::io::AsyncWriteExt;

        let (name, mut file) = self.create_upload(original).await?;
        let path = self.uploads.join(&name);
        file.write_all(bytes).await.at(&path)?;
        file.flush().await.at(&path)?;
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::models::Item;

    async fn open_temp() -> (TempDir, FileStore) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path().join("cache")).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn open_creates_layout_and_empty_document() {
        let (dir, store) = open_temp().await;
        assert!(dir.path().join("cache/uploads").is_dir());
        let raw = std::fs::read_to_string(dir.path().join("cache/db.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, serde_json::json!({ "items": [] }));
        assert!(store.load().await.unwrap().items.is_empty());
    }

    #[tokio::test]
    async fn open_keeps_existing_document() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let mut coll = Collection::default();
        coll.items.push(Item::new("1_1".into(), "Lamp".into(), String::new(), None));
        store.save(&coll).await.unwrap();

        let reopened = FileStore::open(dir.path()).await.unwrap();
        let loaded = reopened.load().await.unwrap();
        assert_eq!(loaded.items, coll.items);
    }

    #[tokio::test]
    async fn save_then_load_preserves_order() {
        let (_dir, store) = open_temp().await;
        let mut coll = Collection::default();
        for id in ["3", "1", "2"] {
            coll.items.push(Item::new(id.into(), format!("item {id}"), String::new(), None));
        }
        store.save(&coll).await.unwrap();
        let ids: Vec<String> = store.load().await.unwrap().items.into_iter().map(|it| it.id).collect();
        assert_eq!(ids, vec!["3", "1", "2"]);
        assert!(!store.document_path().with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_document_is_an_error() {
        let (_dir, store) = open_temp().await;
        std::fs::write(store.document_path(), b"{ not json").unwrap();
        assert!(matches!(store.load().await, Err(StoreError::Corrupt { .. })));
    }

    #[tokio::test]
    async fn missing_document_reads_as_empty() {
        let (_dir, store) = open_temp().await;
        std::fs::remove_file(store.document_path()).unwrap();
        assert!(store.load().await.unwrap().items.is_empty());
    }

    #[tokio::test]
    async fn photo_lifecycle() {
        let (_dir, store) = open_temp().await;
        let name = store.write_photo("cat.jpg", b"meow").await.unwrap();
        assert!(name.ends_with("-cat.jpg"));
        assert!(store.existing_photo(&name).await.unwrap().is_some());
        let path = store.existing_photo(&name).await.unwrap().unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"meow");

        assert!(store.remove_photo(&name).await.unwrap());
        assert!(!store.remove_photo(&name).await.unwrap());
        assert!(store.existing_photo(&name).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn photo_names_cannot_escape_uploads() {
        let (_dir, store) = open_temp().await;
        assert!(store.photo_path("../db.json").is_none());
        assert!(store.photo_path("..").is_none());
        assert!(store.photo_path("").is_none());
        assert!(store.existing_photo("../db.json").await.unwrap().is_none());
        assert!(store.existing_photo("a/b.jpg").await.unwrap().is_none());
    }
}
