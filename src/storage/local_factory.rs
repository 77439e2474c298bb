use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use super::{DriverBox, DriverFactory, DriverKind};
use crate::config::DriverProperty;
use crate::drivers::local;

/// Default root when `location` is blank / 默认根目录
pub const DEFAULT_LOCATION: &str = "public";

pub struct LocalDriverFactory;

impl DriverFactory for LocalDriverFactory {
    fn kinds(&self) -> Vec<DriverKind> {
        vec![DriverKind::Local]
    }

    fn create_driver(&self, name: &str, property: &DriverProperty) -> Result<DriverBox> {
        let root = if property.location.trim().is_empty() {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(DEFAULT_LOCATION)
        } else {
            PathBuf::from(property.location.trim())
        };

        // 同步初始化（工厂方法是同步的）
        if !root.exists() {
            std::fs::create_dir_all(&root)?;
        }
        let canonical_root = root.canonicalize()?;

        tracing::info!("Local driver {} initialized, root: {:?}", name, canonical_root);

        let bucket = Some(property.bucket.trim())
            .filter(|b| !b.is_empty())
            .map(str::to_string);
        Ok(Arc::new(local::LocalDriver::new(name, canonical_root, bucket)))
    }
}
