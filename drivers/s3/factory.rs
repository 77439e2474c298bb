//! S3驱动工厂

use std::sync::Arc;

use anyhow::Result;

use super::config::S3Config;
use super::driver::S3Driver;
use crate::config::DriverProperty;
use crate::storage::{DriverBox, DriverFactory, DriverKind};

/// S3驱动工厂（S3 / MinIO / COS / OSS / 七牛）
pub struct S3DriverFactory;

impl DriverFactory for S3DriverFactory {
    fn kinds(&self) -> Vec<DriverKind> {
        DriverKind::s3_compatible()
    }

    fn create_driver(&self, name: &str, property: &DriverProperty) -> Result<DriverBox> {
        let config = S3Config::from_property(name, property)?;
        let kind = property.kind_for(name);
        tracing::info!(
            "S3 driver {} ({}) initialized, endpoint: {}, bucket: {}",
            name,
            kind,
            config.endpoint,
            config.bucket
        );
        Ok(Arc::new(S3Driver::new(name, kind, config)?))
    }
}
