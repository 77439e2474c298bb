use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{DriverBox, DriverKind};
use crate::config::DriverProperty;
use crate::error::{Result, StorageError};

/// Driver factory trait / 驱动工厂 trait
pub trait DriverFactory: Send + Sync {
    /// Kinds this factory builds / 支持的后端种类
    fn kinds(&self) -> Vec<DriverKind>;

    /// 创建驱动实例
    fn create_driver(&self, name: &str, property: &DriverProperty) -> anyhow::Result<DriverBox>;
}

/// Factories keyed by kind / 按种类注册的驱动工厂
#[derive(Default)]
pub struct DriverCreator {
    factories: RwLock<HashMap<DriverKind, Arc<dyn DriverFactory>>>,
}

impl DriverCreator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register driver factory for every kind it serves / 注册驱动工厂
    pub fn register_factory(&self, factory: Arc<dyn DriverFactory>) {
        let mut factories = self.factories.write();
        for kind in factory.kinds() {
            tracing::info!("Driver factory registered: {}", kind);
            factories.insert(kind, factory.clone());
        }
    }

    /// List all registered kinds / 列出所有可用的后端种类
    pub fn kinds(&self) -> Vec<DriverKind> {
        let mut kinds: Vec<DriverKind> = self.factories.read().keys().cloned().collect();
        kinds.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        kinds
    }

    /// Build the client `name` / 创建客户端
    pub fn create(&self, name: &str, property: &DriverProperty) -> Result<DriverBox> {
        let kind = property.kind_for(name);
        let factory = self
            .factories
            .read()
            .get(&kind)
            .cloned()
            .ok_or_else(|| StorageError::UnknownDriverKind(kind.to_string()))?;

        factory
            .create_driver(name, property)
            .map_err(|e| match e.downcast::<StorageError>() {
                Ok(storage_error) => storage_error,
                Err(other) => StorageError::Driver(other),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::testing::MemoryDriver;

    struct MemoryFactory;

    impl DriverFactory for MemoryFactory {
        fn kinds(&self) -> Vec<DriverKind> {
            vec![DriverKind::Custom("MEMORY".into()), DriverKind::Minio]
        }

        fn create_driver(&self, name: &str, property: &DriverProperty) -> anyhow::Result<DriverBox> {
            if property.bucket.is_empty() {
                return Err(StorageError::IncompleteProperty {
                    name: name.to_string(),
                    missing: vec!["bucket"],
                }
                .into());
            }
            Ok(Arc::new(MemoryDriver::new(name, Some(&property.bucket))))
        }
    }

    fn property(kind: Option<&str>, bucket: &str) -> DriverProperty {
        DriverProperty {
            kind: kind.map(DriverKind::from),
            bucket: bucket.to_string(),
            ..DriverProperty::default()
        }
    }

    #[test]
    fn test_create_by_explicit_kind_and_by_name() {
        let creator = DriverCreator::new();
        creator.register_factory(Arc::new(MemoryFactory));
        assert_eq!(creator.kinds().len(), 2);

        let by_kind = creator.create("FILES", &property(Some("memory"), "files")).unwrap();
        assert_eq!(by_kind.default_bucket(), Some("files"));

        let by_name = creator.create("MINIO", &property(None, "media")).unwrap();
        assert_eq!(by_name.name(), "MINIO");
    }

    #[test]
    fn test_unknown_kind_and_factory_errors() {
        let creator = DriverCreator::new();
        creator.register_factory(Arc::new(MemoryFactory));

        assert!(matches!(
            creator.create("QINIU", &property(None, "b")),
            Err(StorageError::UnknownDriverKind(kind)) if kind == "QINIU"
        ));
        assert!(matches!(
            creator.create("MINIO", &property(None, "")),
            Err(StorageError::IncompleteProperty { missing, .. }) if missing == vec!["bucket"]
        ));
    }
}
