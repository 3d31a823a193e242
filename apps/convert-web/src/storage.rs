//! Filesystem blob store for uploads and processed outputs
//!
//! Blob paths are relative to the media root and always use `/`, e.g.
//! `uploads/<uuid>_scan.png` or `processed/merged_3.pdf`.

use std::io;
use std::path::{Component, Path, PathBuf};

use uuid::Uuid;

pub const UPLOADS_DIR: &str = "uploads";
pub const PROCESSED_DIR: &str = "processed";

const MAX_NAME_LEN: usize = 100;

/// Outcome of removing a blob
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    /// Missing file or a path that cannot name a blob
    Absent,
    /// The file exists but could not be removed
    Failed,
}

#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the media root and its blob directories.
    pub async fn init(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(self.root.join(UPLOADS_DIR)).await?;
        tokio::fs::create_dir_all(self.root.join(PROCESSED_DIR)).await?;
        Ok(())
    }

    /// Store an uploaded file under a unique name and return its blob path.
    pub async fn save_upload(&self, file_name: &str, bytes: &[u8]) -> io::Result<String> {
        let name = format!("{}_{}", Uuid::new_v4().simple(), sanitize_file_name(file_name));
        self.write(UPLOADS_DIR, &name, bytes).await
    }

    /// Store a conversion output as `processed/<file_name>`.
    pub async fn save_processed(&self, file_name: &str, bytes: &[u8]) -> io::Result<String> {
        self.write(PROCESSED_DIR, &sanitize_file_name(file_name), bytes)
            .await
    }

    async fn write(&self, dir: &str, name: &str, bytes: &[u8]) -> io::Result<String> {
        let dir_path = self.root.join(dir);
        tokio::fs::create_dir_all(&dir_path).await?;
        tokio::fs::write(dir_path.join(name), bytes).await?;

        let blob = format!("{}/{}", dir, name);
        tracing::debug!("Stored blob {} ({} bytes)", blob, bytes.len());
        Ok(blob)
    }

    pub async fn read(&self, blob: &str) -> io::Result<Vec<u8>> {
        let path = self.resolve(blob).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("invalid blob path: {}", blob))
        })?;
        tokio::fs::read(path).await
    }

    pub async fn exists(&self, blob: &str) -> bool {
        match self.resolve(blob) {
            Some(path) => tokio::fs::try_exists(path).await.unwrap_or(false),
            None => false,
        }
    }

    /// Delete a blob, best effort. Failures are logged, never returned.
    pub async fn remove(&self, blob: &str) -> Removal {
        let Some(path) = self.resolve(blob) else {
            tracing::warn!("Refusing to remove invalid blob path: {:?}", blob);
            return Removal::Absent;
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Removal::Removed,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Removal::Absent,
            Err(e) => {
                tracing::warn!("Could not remove blob {}: {}", blob, e);
                Removal::Failed
            }
        }
    }

    /// Map a blob path to a filesystem path inside the root.
    fn resolve(&self, blob: &str) -> Option<PathBuf> {
        let relative = Path::new(blob);
        if blob.is_empty() || relative.is_absolute() {
            return None;
        }
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }
}

/// Reduce a client-supplied file name to a safe single path segment.
///
/// Directory parts are dropped; anything outside `[A-Za-z0-9._-]` becomes `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(name);

    let mut cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_NAME_LEN)
        .collect();

    if cleaned.trim_matches('.').is_empty() {
        cleaned = "upload".to_string();
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[tokio::test]
    async fn test_upload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path());
        store.init().await.unwrap();

        let blob = store.save_upload("my scan.png", b"pixels").await.unwrap();

        assert!(blob.starts_with("uploads/"));
        assert!(blob.ends_with("_my_scan.png"));
        assert!(store.exists(&blob).await);
        assert_eq!(store.read(&blob).await.unwrap(), b"pixels");
    }

    #[tokio::test]
    async fn test_uploads_with_same_name_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path());

        let a = store.save_upload("same.pdf", b"a").await.unwrap();
        let b = store.save_upload("same.pdf", b"b").await.unwrap();

        assert_ne!(a, b);
        assert_eq!(store.read(&a).await.unwrap(), b"a");
    }

    #[tokio::test]
    async fn test_processed_blob_keeps_its_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path());

        let blob = store.save_processed("merged_4.pdf", b"%PDF").await.unwrap();
        assert_eq!(blob, "processed/merged_4.pdf");
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path());
        let blob = store.save_processed("x.pdf", b"x").await.unwrap();

        assert_eq!(store.remove(&blob).await, Removal::Removed);
        assert_eq!(store.remove(&blob).await, Removal::Absent);
        assert!(!store.exists(&blob).await);
    }

    #[tokio::test]
    async fn test_invalid_paths_are_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path().join("media"));

        let outside = dir.path().join("keep.txt");
        std::fs::write(&outside, b"keep").unwrap();

        for blob in ["", "../keep.txt", "/etc/passwd", "uploads/../../keep.txt"] {
            assert_eq!(store.remove(blob).await, Removal::Absent);
            assert!(!store.exists(blob).await);
            assert!(store.read(blob).await.is_err());
        }
        assert!(outside.exists());
    }

    #[tokio::test]
    async fn test_unremovable_blob_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path());
        store.init().await.unwrap();
        std::fs::create_dir(dir.path().join("processed/odd.pdf")).unwrap();

        assert_eq!(store.remove("processed/odd.pdf").await, Removal::Failed);
        assert!(dir.path().join("processed/odd.pdf").is_dir());
    }

    #[test]
    fn test_sanitize_examples() {
        assert_eq!(sanitize_file_name("report.pdf"), "report.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\photo 1.jpg"), "photo_1.jpg");
        assert_eq!(sanitize_file_name(".."), "upload");
        assert_eq!(sanitize_file_name(""), "upload");
    }

    proptest! {
        #[test]
        fn sanitized_names_are_single_safe_segments(name in any::<String>()) {
            let cleaned = sanitize_file_name(&name);

            prop_assert!(!cleaned.is_empty());
            prop_assert!(cleaned.len() <= MAX_NAME_LEN);
            prop_assert!(!cleaned.contains('/'));
            prop_assert!(!cleaned.contains('\\'));
            prop_assert!(cleaned != "." && cleaned != "..");
            prop_assert!(cleaned
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')));
        }
    }
}
