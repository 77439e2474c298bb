//! S3驱动配置

use crate::config::DriverProperty;
use crate::error::StorageError;

/// S3配置
#[derive(Debug, Clone, PartialEq)]
pub struct S3Config {
    /// 存储桶名称（默认桶）
    pub bucket: String,
    /// S3端点地址
    /// AWS: https://s3.{region}.amazonaws.com
    /// 阿里云OSS: https://oss-{region}.aliyuncs.com
    /// 腾讯云COS: https://cos.{region}.myqcloud.com
    /// MinIO: http://localhost:9000
    pub endpoint: String,
    /// 区域
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    /// 强制使用路径风格（而非虚拟主机风格）
    /// MinIO等需要设置为true
    pub path_style: bool,
}

impl S3Config {
    /// Validate a property bag / 校验参数完整性
    pub fn from_property(name: &str, property: &DriverProperty) -> Result<Self, StorageError> {
        let mut missing = Vec::new();
        if property.access_key.trim().is_empty() {
            missing.push("access_key");
        }
        if property.secret_key.trim().is_empty() {
            missing.push("secret_key");
        }
        if property.endpoint.trim().is_empty() {
            missing.push("endpoint");
        }
        if property.bucket.trim().is_empty() {
            missing.push("bucket");
        }
        if !missing.is_empty() {
            return Err(StorageError::IncompleteProperty {
                name: name.to_string(),
                missing,
            });
        }

        Ok(Self {
            bucket: property.bucket.trim().to_string(),
            endpoint: property.endpoint.trim().trim_end_matches('/').to_string(),
            region: property.region.clone(),
            access_key: property.access_key.clone(),
            secret_key: property.secret_key.clone(),
            path_style: property.path_style,
        })
    }
}
