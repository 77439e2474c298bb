// Driver package / 驱动包
pub mod local;
pub mod s3;

use std::sync::Arc;

use crate::storage::DriverCreator;

/// Register all drivers to DriverCreator / 注册所有驱动
pub fn register_all(creator: &DriverCreator) {
    // Register local driver (using LocalDriverFactory from storage module) / 注册本地驱动
    creator.register_factory(Arc::new(crate::storage::LocalDriverFactory));
    // Register S3 driver (S3, MinIO, COS, OSS, Qiniu) / 注册S3对象存储驱动
    creator.register_factory(Arc::new(s3::S3DriverFactory));
}
