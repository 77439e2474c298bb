use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;

use crate::storage::{DriverKind, ObjectInfo, StorageDriver};
use crate::utils::content_type_for;

/// Local disk backend; buckets are sub-directories of the root / 本地存储
pub struct LocalDriver {
    name: String,
    root: PathBuf,
    bucket: Option<String>,
}

impl LocalDriver {
    pub fn new(name: &str, root: PathBuf, bucket: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            root,
            bucket,
        }
    }

    /// Get root directory / 获取根目录
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Normalize path to prevent directory traversal attacks / 规范化路径
    fn normalize_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        let bucket = if bucket.is_empty() {
            self.bucket.as_deref().unwrap_or("")
        } else {
            bucket
        };

        let mut full_path = self.root.clone();
        for part in [bucket, key] {
            let part = part.replace('\\', "/");
            for component in part.split('/').filter(|s| !s.is_empty() && *s != ".") {
                if component == ".." {
                    return Err(anyhow!("Access path exceeds root directory scope: {}", key));
                }
                full_path.push(component);
            }
        }
        Ok(full_path)
    }

    /// Path of a single object; a key naming no file is rejected / 对象路径，空键拒绝
    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        let named = key
            .replace('\\', "/")
            .split('/')
            .any(|s| !s.is_empty() && s != ".");
        if !named {
            return Err(anyhow!("Object key is empty: {:?}", key));
        }
        self.normalize_path(bucket, key)
    }

    fn relative_key(&self, base: &Path, path: &Path) -> String {
        path.strip_prefix(base)
            .unwrap_or(path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join("/")
    }
}

fn modified_of(metadata: &std::fs::Metadata) -> Option<String> {
    metadata
        .modified()
        .ok()
        .map(|t| chrono::DateTime::<chrono::Local>::from(t).to_rfc3339())
}

#[async_trait]
impl StorageDriver for LocalDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DriverKind {
        DriverKind::Local
    }

    fn default_bucket(&self) -> Option<&str> {
        self.bucket.as_deref()
    }

    async fn put_object(&self, bucket: &str, key: &str, data: Bytes) -> Result<ObjectInfo> {
        let full_path = self.object_path(bucket, key)?;
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full_path, &data).await?;
        let metadata = tokio::fs::metadata(&full_path).await?;

        Ok(ObjectInfo {
            key: key.trim_start_matches('/').to_string(),
            size: metadata.len(),
            is_dir: false,
            last_modified: modified_of(&metadata),
            content_type: Some(content_type_for(key)),
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let full_path = self.object_path(bucket, key)?;
        let data = tokio::fs::read(&full_path).await?;
        Ok(Bytes::from(data))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        let full_path = self.object_path(bucket, key)?;
        if full_path.is_dir() {
            tokio::fs::remove_dir_all(full_path).await?;
        } else {
            tokio::fs::remove_file(full_path).await?;
        }
        Ok(())
    }

    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool> {
        let full_path = self.object_path(bucket, key)?;
        Ok(tokio::fs::metadata(full_path).await.is_ok())
    }

    async fn list_objects(&self, bucket: &str, prefix: &str, recursive: bool) -> Result<Vec<ObjectInfo>> {
        let base = self.normalize_path(bucket, "")?;
        let start = self.normalize_path(bucket, prefix)?;
        if !start.is_dir() {
            return Ok(Vec::new());
        }

        let mut result = Vec::new();
        let mut pending = vec![start];
        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let metadata = entry.metadata().await?;
                let path = entry.path();
                let is_dir = metadata.is_dir();
                let key = self.relative_key(&base, &path);

                if is_dir && recursive {
                    pending.push(path);
                    continue;
                }
                result.push(ObjectInfo {
                    content_type: (!is_dir).then(|| content_type_for(&key)),
                    key,
                    size: if is_dir { 0 } else { metadata.len() },
                    is_dir,
                    last_modified: modified_of(&metadata),
                });
            }
        }

        result.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(result)
    }

    async fn create_folder(&self, bucket: &str, path: &str) -> Result<()> {
        let full_path = self.normalize_path(bucket, path)?;
        tokio::fs::create_dir_all(full_path).await?;
        Ok(())
    }

    fn shutdown(&self) -> Result<()> {
        tracing::debug!("Local driver {} released", self.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver(dir: &tempfile::TempDir, bucket: Option<&str>) -> LocalDriver {
        LocalDriver::new("LOCAL", dir.path().to_path_buf(), bucket.map(str::to_string))
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let driver = driver(&dir, None);

        let info = driver
            .put_object("avatars", "/2024/me.png", Bytes::from_static(b"png"))
            .await
            .unwrap();
        assert_eq!(info.key, "2024/me.png");
        assert_eq!(info.size, 3);
        assert_eq!(info.content_type.as_deref(), Some("image/png"));
        assert!(dir.path().join("avatars/2024/me.png").is_file());

        assert_eq!(driver.get_object("avatars", "2024/me.png").await.unwrap(), Bytes::from_static(b"png"));
        assert!(driver.object_exists("avatars", "2024/me.png").await.unwrap());
        assert!(!driver.object_exists("", "2024/me.png").await.unwrap());

        driver.delete_object("avatars", "2024/me.png").await.unwrap();
        assert!(!driver.object_exists("avatars", "2024/me.png").await.unwrap());
    }

    #[tokio::test]
    async fn test_default_bucket_used_for_empty_argument() {
        let dir = tempfile::tempdir().unwrap();
        let driver = driver(&dir, Some("files"));
        assert_eq!(driver.default_bucket(), Some("files"));
        driver.put_object("", "a.txt", Bytes::from_static(b"a")).await.unwrap();
        assert!(dir.path().join("files/a.txt").is_file());
    }

    #[tokio::test]
    async fn test_traversal_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let driver = driver(&dir, None);
        assert!(driver.get_object("", "../etc/passwd").await.is_err());
        assert!(driver.put_object("..", "x", Bytes::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_key_never_touches_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let driver = driver(&dir, Some("files"));
        driver.put_object("", "keep/a.txt", Bytes::from_static(b"a")).await.unwrap();
        driver.put_object("other", "b.txt", Bytes::from_static(b"b")).await.unwrap();

        for key in ["", ".", "/", "./", "\\"] {
            assert!(driver.delete_object("", key).await.is_err());
            assert!(driver.delete_object("other", key).await.is_err());
            assert!(driver.get_object("", key).await.is_err());
            assert!(driver.object_exists("", key).await.is_err());
            assert!(driver.put_object("", key, Bytes::new()).await.is_err());
        }
        assert!(dir.path().join("files/keep/a.txt").is_file());
        assert!(dir.path().join("other/b.txt").is_file());

        driver.create_folder("", "").await.unwrap();
        assert_eq!(driver.list_objects("", "", false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_flat_and_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let driver = driver(&dir, None);
        driver.put_object("b", "docs/a.txt", Bytes::from_static(b"a")).await.unwrap();
        driver.put_object("b", "docs/deep/b.txt", Bytes::from_static(b"bb")).await.unwrap();
        driver.create_folder("b", "docs/empty").await.unwrap();

        let flat = driver.list_objects("b", "docs", false).await.unwrap();
        let keys: Vec<(&str, bool)> = flat.iter().map(|o| (o.key.as_str(), o.is_dir)).collect();
        assert_eq!(keys, vec![("docs/a.txt", false), ("docs/deep", true), ("docs/empty", true)]);

        let deep = driver.list_objects("b", "docs", true).await.unwrap();
        let keys: Vec<&str> = deep.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["docs/a.txt", "docs/deep/b.txt"]);

        assert!(driver.list_objects("b", "missing", true).await.unwrap().is_empty());
    }
}
