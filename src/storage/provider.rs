//! Client sources loaded at startup / 启动时加载的客户端来源

use std::sync::Arc;

use indexmap::IndexMap;

use super::{ClientMap, DriverCreator};
use crate::config::DriverProperty;
use crate::utils::normalize_name;

pub trait ClientSourceProvider: Send + Sync {
    /// Named clients to register / 需要注册的客户端
    fn load_client_sources(&self) -> anyhow::Result<ClientMap>;
}

/// Builds every configured client through the [`DriverCreator`] / 根据配置创建客户端
pub struct ConfigClientSourceProvider {
    clients: IndexMap<String, DriverProperty>,
    creator: Arc<DriverCreator>,
}

impl ConfigClientSourceProvider {
    pub fn new(clients: IndexMap<String, DriverProperty>, creator: Arc<DriverCreator>) -> Self {
        Self { clients, creator }
    }
}

impl ClientSourceProvider for ConfigClientSourceProvider {
    fn load_client_sources(&self) -> anyhow::Result<ClientMap> {
        let mut loaded = ClientMap::new();
        for (name, property) in &self.clients {
            let name = normalize_name(name);
            match self.creator.create(&name, property) {
                Ok(driver) => {
                    tracing::debug!("Client {} built as {}", name, property.kind_for(&name));
                    loaded.insert(name, driver);
                }
                Err(e) => {
                    tracing::warn!("Client {} skipped: {}", name, e);
                }
            }
        }
        Ok(loaded)
    }
}

/// Already built clients / 预先构建好的客户端
#[derive(Default, Clone)]
pub struct StaticClientSourceProvider {
    clients: ClientMap,
}

impl StaticClientSourceProvider {
    pub fn new(clients: ClientMap) -> Self {
        Self { clients }
    }

    pub fn with(mut self, name: &str, driver: super::DriverBox) -> Self {
        self.clients.insert(normalize_name(name), driver);
        self
    }
}

impl ClientSourceProvider for StaticClientSourceProvider {
    fn load_client_sources(&self) -> anyhow::Result<ClientMap> {
        Ok(self.clients.clone())
    }
}
