use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Backend kind a driver factory is registered for / 存储后端种类
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DriverKind {
    S3,
    Minio,
    Cos,
    Oss,
    Qiniu,
    Local,
    Custom(String),
}

impl DriverKind {
    pub fn as_str(&self) -> &str {
        match self {
            DriverKind::S3 => "S3",
            DriverKind::Minio => "MINIO",
            DriverKind::Cos => "COS",
            DriverKind::Oss => "OSS",
            DriverKind::Qiniu => "QINIU",
            DriverKind::Local => "LOCAL",
            DriverKind::Custom(name) => name,
        }
    }

    /// S3 compatible kinds served by the S3 driver / S3 兼容的后端
    pub fn s3_compatible() -> Vec<DriverKind> {
        vec![
            DriverKind::S3,
            DriverKind::Minio,
            DriverKind::Cos,
            DriverKind::Oss,
            DriverKind::Qiniu,
        ]
    }
}

impl FromStr for DriverKind {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        Ok(match upper.as_str() {
            "S3" => DriverKind::S3,
            "MINIO" => DriverKind::Minio,
            "COS" => DriverKind::Cos,
            "OSS" => DriverKind::Oss,
            "QINIU" => DriverKind::Qiniu,
            "LOCAL" => DriverKind::Local,
            _ => DriverKind::Custom(upper),
        })
    }
}

impl From<String> for DriverKind {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }
}

impl From<&str> for DriverKind {
    fn from(value: &str) -> Self {
        DriverKind::from(value.to_string())
    }
}

impl From<DriverKind> for String {
    fn from(kind: DriverKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Object entry information / 对象条目信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
    pub is_dir: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// Storage driver interface / 存储驱动接口
///
/// An empty `bucket` argument means the driver's own default bucket.
#[async_trait]
pub trait StorageDriver: Send + Sync {
    /// Driver name / 驱动名称
    fn name(&self) -> &str;

    fn kind(&self) -> DriverKind;

    /// Bucket used when the caller names none / 默认存储桶
    fn default_bucket(&self) -> Option<&str>;

    /// Upload a complete object / 上传完整对象
    async fn put_object(&self, bucket: &str, key: &str, data: Bytes) -> Result<ObjectInfo>;

    /// Read a complete object / 读取完整对象
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes>;

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;

    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool>;

    /// List objects under `prefix` / 列出前缀下的对象
    async fn list_objects(&self, bucket: &str, prefix: &str, recursive: bool) -> Result<Vec<ObjectInfo>>;

    async fn create_folder(&self, bucket: &str, path: &str) -> Result<()>;

    /// Time limited download URL (if supported) / 获取预签名下载链接
    async fn presigned_url(&self, _bucket: &str, _key: &str, _expire_secs: u32) -> Result<Option<String>> {
        Ok(None)
    }

    /// Release held resources / 释放资源
    fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

pub type DriverBox = Arc<dyn StorageDriver>;

pub mod creator;
pub mod local_factory;
pub mod manager;
pub mod provider;

pub use creator::{DriverCreator, DriverFactory};
pub use local_factory::LocalDriverFactory;
pub use manager::{ClientMap, StartupReport, StorageManager};
pub use provider::{ClientSourceProvider, ConfigClientSourceProvider, StaticClientSourceProvider};
