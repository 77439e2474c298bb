//! S3驱动核心实现
//!
//! One driver serves every S3 compatible backend (S3, MinIO, COS, OSS, Qiniu).
//! The bucket argument of each call may differ from the configured default.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::Region;

use super::config::S3Config;
use crate::storage::{DriverKind, ObjectInfo, StorageDriver};
use crate::utils::{clean_key, content_type_for, dir_prefix};

/// S3驱动
pub struct S3Driver {
    name: String,
    kind: DriverKind,
    config: S3Config,
    region: Region,
    credentials: Credentials,
}

impl S3Driver {
    /// 创建新的S3驱动实例
    pub fn new(name: &str, kind: DriverKind, config: S3Config) -> Result<Self> {
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| anyhow!("创建S3凭证失败: {}", e))?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };

        let driver = Self {
            name: name.to_string(),
            kind,
            config,
            region,
            credentials,
        };
        // Fail at startup rather than on the first call
        driver.bucket("")?;
        Ok(driver)
    }

    /// S3 Bucket client for `name`, the default bucket when empty / 创建S3 Bucket客户端
    fn bucket(&self, name: &str) -> Result<Box<Bucket>> {
        let name = if name.is_empty() { self.config.bucket.as_str() } else { name };
        let bucket = Bucket::new(name, self.region.clone(), self.credentials.clone())
            .map_err(|e| anyhow!("创建S3 Bucket失败: {}", e))?;

        Ok(if self.config.path_style {
            bucket.with_path_style()
        } else {
            bucket
        })
    }
}

/// 对象键不带前导斜杠
fn object_key(key: &str) -> Result<String> {
    let cleaned = clean_key(key);
    if cleaned.is_empty() {
        return Err(anyhow!("对象键不能为空"));
    }
    Ok(cleaned)
}

fn check_status(code: u16, action: &str, key: &str) -> Result<()> {
    if (200..300).contains(&code) {
        Ok(())
    } else {
        Err(anyhow!("S3 {} {} 失败, 状态码: {}", action, key, code))
    }
}

#[async_trait]
impl StorageDriver for S3Driver {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DriverKind {
        self.kind.clone()
    }

    fn default_bucket(&self) -> Option<&str> {
        Some(&self.config.bucket)
    }

    async fn put_object(&self, bucket: &str, key: &str, data: Bytes) -> Result<ObjectInfo> {
        let key = object_key(key)?;
        let content_type = content_type_for(&key);
        let resp = self
            .bucket(bucket)?
            .put_object_with_content_type(&key, &data, &content_type)
            .await
            .map_err(|e| anyhow!("上传S3对象失败: {}", e))?;
        check_status(resp.status_code(), "PUT", &key)?;

        Ok(ObjectInfo {
            key,
            size: data.len() as u64,
            is_dir: false,
            last_modified: Some(chrono::Utc::now().to_rfc3339()),
            content_type: Some(content_type),
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let key = object_key(key)?;
        let resp = self
            .bucket(bucket)?
            .get_object(&key)
            .await
            .map_err(|e| anyhow!("读取S3对象失败: {}", e))?;
        check_status(resp.status_code(), "GET", &key)?;
        Ok(Bytes::from(resp.bytes().to_vec()))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        let key = object_key(key)?;
        let resp = self
            .bucket(bucket)?
            .delete_object(&key)
            .await
            .map_err(|e| anyhow!("删除S3对象失败: {}", e))?;
        check_status(resp.status_code(), "DELETE", &key)
    }

    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool> {
        let key = object_key(key)?;
        let (_, code) = self
            .bucket(bucket)?
            .head_object(&key)
            .await
            .map_err(|e| anyhow!("查询S3对象失败: {}", e))?;
        Ok(code == 200)
    }

    async fn list_objects(&self, bucket: &str, prefix: &str, recursive: bool) -> Result<Vec<ObjectInfo>> {
        let prefix = dir_prefix(prefix);
        let delimiter = if recursive { None } else { Some("/".to_string()) };
        let results = self
            .bucket(bucket)?
            .list(prefix.clone(), delimiter)
            .await
            .map_err(|e| anyhow!("列出S3对象失败: {}", e))?;

        let mut objects = Vec::new();
        for result in results {
            // 处理目录（公共前缀）
            for cp in result.common_prefixes.unwrap_or_default() {
                let key = cp.prefix.trim_end_matches('/').to_string();
                if key.is_empty() {
                    continue;
                }
                objects.push(ObjectInfo {
                    key,
                    size: 0,
                    is_dir: true,
                    last_modified: None,
                    content_type: None,
                });
            }

            // 处理文件，跳过目录标记
            for obj in result.contents {
                if obj.key.ends_with('/') || obj.key == prefix {
                    continue;
                }
                objects.push(ObjectInfo {
                    content_type: Some(content_type_for(&obj.key)),
                    key: obj.key,
                    size: obj.size,
                    is_dir: false,
                    last_modified: Some(obj.last_modified),
                });
            }
        }
        Ok(objects)
    }

    async fn create_folder(&self, bucket: &str, path: &str) -> Result<()> {
        let key = dir_prefix(path);
        if key.is_empty() {
            return Ok(());
        }
        let resp = self
            .bucket(bucket)?
            .put_object(&key, &[])
            .await
            .map_err(|e| anyhow!("创建S3目录失败: {}", e))?;
        check_status(resp.status_code(), "PUT", &key)
    }

    async fn presigned_url(&self, bucket: &str, key: &str, expire_secs: u32) -> Result<Option<String>> {
        let key = object_key(key)?;
        // 生成预签名URL
        let url = self
            .bucket(bucket)?
            .presign_get(&key, expire_secs.max(1), None)
            .await
            .map_err(|e| anyhow!("生成预签名URL失败: {}", e))?;
        Ok(Some(url))
    }

    fn shutdown(&self) -> Result<()> {
        tracing::debug!("S3 driver {} ({}) released", self.name, self.kind);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> S3Config {
        S3Config {
            bucket: "files".into(),
            endpoint: "http://127.0.0.1:9000".into(),
            region: "us-east-1".into(),
            access_key: "ak".into(),
            secret_key: "sk".into(),
            path_style: true,
        }
    }

    #[test]
    fn test_object_key_normalization() {
        assert_eq!(object_key("/a//b/./c.txt").unwrap(), "a/b/c.txt");
        assert!(object_key("/").is_err());
    }

    #[test]
    fn test_bucket_argument_overrides_default() {
        let driver = S3Driver::new("MINIO", DriverKind::Minio, config()).unwrap();
        assert_eq!(driver.default_bucket(), Some("files"));
        assert_eq!(driver.kind(), DriverKind::Minio);
        assert_eq!(driver.bucket("").unwrap().name(), "files");
        assert_eq!(driver.bucket("avatars").unwrap().name(), "avatars");
    }

    #[test]
    fn test_status_check() {
        assert!(check_status(204, "DELETE", "a").is_ok());
        assert!(check_status(404, "GET", "a").is_err());
    }
}
