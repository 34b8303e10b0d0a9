//! Archive store seam: object listing, download, upload, delete.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveObject {
    pub key: String,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive object not found: {0}")]
    NotFound(String),
    #[error("archive io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait]
pub trait ArchiveStore: Send + Sync {
    async fn list(&self) -> Result<Vec<ArchiveObject>, ArchiveError>;
    async fn download(&self, key: &str) -> Result<Vec<u8>, ArchiveError>;
    async fn upload(&self, key: &str, bytes: &[u8]) -> Result<(), ArchiveError>;
    async fn delete(&self, key: &str) -> Result<(), ArchiveError>;
}

fn io_err(path: &Path, source: std::io::Error) -> ArchiveError {
    ArchiveError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Directory-backed archive. Keys are `/`-separated relative paths and
/// last-modified comes from file mtime. Stands in for the remote bucket
/// during local operation; the trait is the seam for a real client.
#[derive(Debug, Clone)]
pub struct FsArchiveStore {
    root: PathBuf,
}

impl FsArchiveStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn collect_keys(dir: &Path, root: &Path, out: &mut Vec<(PathBuf, String)>) -> std::io::Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                Self::collect_keys(&path, root, out)?;
            } else {
                let key = path
                    .strip_prefix(root)
                    .unwrap_or(&path)
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/");
                out.push((path, key));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ArchiveStore for FsArchiveStore {
    async fn list(&self) -> Result<Vec<ArchiveObject>, ArchiveError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        Self::collect_keys(&self.root, &self.root, &mut files).map_err(|e| io_err(&self.root, e))?;

        let mut objects = Vec::with_capacity(files.len());
        for (path, key) in files {
            let meta = fs::metadata(&path).await.map_err(|e| io_err(&path, e))?;
            let modified = meta.modified().map_err(|e| io_err(&path, e))?;
            objects.push(ArchiveObject {
                key,
                last_modified: DateTime::<Utc>::from(modified),
            });
        }
        Ok(objects)
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, ArchiveError> {
        let path = self.key_path(key);
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ArchiveError::NotFound(key.to_string()))
            }
            Err(e) => Err(io_err(&path, e)),
        }
    }

    async fn upload(&self, key: &str, bytes: &[u8]) -> Result<(), ArchiveError> {
        let path = self.key_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| io_err(parent, e))?;
        }
        fs::write(&path, bytes).await.map_err(|e| io_err(&path, e))
    }

    async fn delete(&self, key: &str) -> Result<(), ArchiveError> {
        let path = self.key_path(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ArchiveError::NotFound(key.to_string()))
            }
            Err(e) => Err(io_err(&path, e)),
        }
    }
}

/// In-memory archive with caller-controlled timestamps. The stub used by
/// retention and links-selection tests.
#[derive(Debug, Default)]
pub struct MemoryArchiveStore {
    objects: Mutex<BTreeMap<String, (DateTime<Utc>, Vec<u8>)>>,
}

impl MemoryArchiveStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, key: &str, last_modified: DateTime<Utc>, bytes: &[u8]) {
        self.objects
            .lock()
            .await
            .insert(key.to_string(), (last_modified, bytes.to_vec()));
    }

    pub async fn keys(&self) -> Vec<String> {
        self.objects.lock().await.keys().cloned().collect()
    }
}

#[async_trait]
impl ArchiveStore for MemoryArchiveStore {
    async fn list(&self) -> Result<Vec<ArchiveObject>, ArchiveError> {
        Ok(self
            .objects
            .lock()
            .await
            .iter()
            .map(|(key, (last_modified, _))| ArchiveObject {
                key: key.clone(),
                last_modified: *last_modified,
            })
            .collect())
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, ArchiveError> {
        self.objects
            .lock()
            .await
            .get(key)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| ArchiveError::NotFound(key.to_string()))
    }

    async fn upload(&self, key: &str, bytes: &[u8]) -> Result<(), ArchiveError> {
        self.insert(key, Utc::now(), bytes).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), ArchiveError> {
        self.objects
            .lock()
            .await
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| ArchiveError::NotFound(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn fs_archive_round_trips_nested_keys() {
        let dir = tempdir().expect("tempdir");
        let store = FsArchiveStore::new(dir.path());

        store
            .upload("20260826/reports/out.sql", b"INSERT ...")
            .await
            .expect("upload");

        let listed = store.list().await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].key, "20260826/reports/out.sql");

        let bytes = store.download("20260826/reports/out.sql").await.expect("download");
        assert_eq!(bytes, b"INSERT ...");

        store.delete("20260826/reports/out.sql").await.expect("delete");
        assert!(store.list().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn fs_archive_download_of_missing_key_is_not_found() {
        let dir = tempdir().expect("tempdir");
        let store = FsArchiveStore::new(dir.path());
        let err = store.download("nope.txt").await.unwrap_err();
        assert!(matches!(err, ArchiveError::NotFound(_)));
    }

    #[tokio::test]
    async fn memory_archive_keeps_explicit_timestamps() {
        let store = MemoryArchiveStore::new();
        let ts = DateTime::parse_from_rfc3339("2020-01-01T00:00:00Z")
            .expect("ts")
            .with_timezone(&Utc);
        store.insert("20200101/foo.txt", ts, b"x").await;

        let listed = store.list().await.expect("list");
        assert_eq!(listed[0].last_modified, ts);
    }
}
