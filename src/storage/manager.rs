use std::sync::Arc;

use arc_swap::ArcSwap;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};

use super::provider::ClientSourceProvider;
use super::DriverBox;
use crate::attribute::Attribute;
use crate::config::StorageConfig;
use crate::declaration::Declaration;
use crate::error::{Result, StorageError};
use crate::invocation::Invocation;
use crate::resolver::{ResolverChain, ResolverKind};
use crate::utils::normalize_name;

/// Registered clients in insertion order / 已注册客户端（保持插入顺序）
pub type ClientMap = IndexMap<String, DriverBox>;

/// Outcome of [`StorageManager::initialize`] / 启动加载结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupReport {
    pub loaded: usize,
    pub primary_available: bool,
}

/// Routing manager (owns the client registry) / 路由管理器
///
/// Reads go through an immutable snapshot and never block; writers serialize on
/// `write_lock` and publish a fresh snapshot.
pub struct StorageManager {
    clients: ArcSwap<ClientMap>,
    write_lock: Mutex<()>,
    primary: RwLock<String>,
    resolvers: ResolverChain,
}

impl StorageManager {
    pub fn new(primary: &str, resolvers: ResolverChain) -> Self {
        Self {
            clients: ArcSwap::from_pointee(ClientMap::new()),
            write_lock: Mutex::new(()),
            primary: RwLock::new(normalize_name(primary)),
            resolvers,
        }
    }

    /// Manager with the default resolver chain in configured order / 按配置构建
    pub fn from_config(config: &StorageConfig) -> Self {
        let chain = ResolverChain::with_orders(config.resolver_order.header, config.resolver_order.session);
        Self::new(&config.primary, chain)
    }

    pub fn primary(&self) -> String {
        self.primary.read().clone()
    }

    pub fn set_primary(&self, name: &str) {
        let name = normalize_name(name);
        let _guard = self.write_lock.lock();
        tracing::info!("Primary client switched to {}", name);
        *self.primary.write() = name;
    }

    pub fn resolvers(&self) -> &ResolverChain {
        &self.resolvers
    }

    /// Mutable chain access before the manager is shared / 共享前调整解析链
    pub fn resolvers_mut(&mut self) -> &mut ResolverChain {
        &mut self.resolvers
    }

    /// Load every client from `provider` / 从提供者加载全部客户端
    pub fn initialize(&self, provider: &dyn ClientSourceProvider) -> Result<StartupReport> {
        let sources = provider.load_client_sources()?;
        let loaded = sources.len();
        for (name, driver) in sources {
            self.add_client(&name, driver);
        }

        let primary = self.primary();
        let primary_available = self.contains(&primary);
        if primary_available {
            tracing::info!("Dynamic storage initialized with {} clients, primary {}", loaded, primary);
        } else {
            tracing::warn!(
                "Primary client {} is not registered, unqualified lookups will fail",
                primary
            );
        }
        Ok(StartupReport {
            loaded,
            primary_available,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.clients.load().contains_key(&normalize_name(name))
    }

    /// Consistent snapshot of the registry / 客户端快照
    pub fn current_clients(&self) -> Arc<ClientMap> {
        self.clients.load_full()
    }

    /// Register a client; an existing name is kept / 添加客户端（不覆盖）
    pub fn add_client(&self, name: &str, driver: DriverBox) -> bool {
        let name = normalize_name(name);
        if name.is_empty() {
            tracing::warn!("Client name is empty, add ignored");
            return false;
        }

        let _guard = self.write_lock.lock();
        let current = self.clients.load();
        if current.contains_key(&name) {
            tracing::warn!("Client {} already exists, add ignored", name);
            return false;
        }
        let mut next = ClientMap::clone(&current);
        next.insert(name.clone(), driver);
        self.clients.store(Arc::new(next));
        tracing::info!("Client added: {}", name);
        true
    }

    /// Close and evict a client / 关闭并移除客户端
    pub fn remove_client(&self, name: &str) -> Result<()> {
        let name = normalize_name(name);
        if name.is_empty() {
            return Err(StorageError::BlankClientName);
        }

        // Primary check under the writer lock so set_primary cannot interleave.
        let _guard = self.write_lock.lock();
        if name == self.primary() {
            return Err(StorageError::RemovePrimaryClient { name });
        }
        let current = self.clients.load();
        let Some(driver) = current.get(&name).cloned() else {
            tracing::warn!("Client {} does not exist, remove ignored", name);
            return Ok(());
        };

        if let Err(e) = driver.shutdown() {
            tracing::error!("Failed to close client {}: {}", name, e);
        }
        let mut next = ClientMap::clone(&current);
        next.shift_remove(&name);
        self.clients.store(Arc::new(next));
        tracing::info!("Client removed: {}", name);
        Ok(())
    }

    /// Client by name, degrading to the primary / 获取客户端，未知名称回退主客户端
    pub fn get_client(&self, name: Option<&str>) -> Result<DriverBox> {
        let clients = self.clients.load();
        match name.map(normalize_name).filter(|n| !n.is_empty()) {
            None => {
                tracing::debug!("Client name is empty, switch to primary client");
            }
            Some(name) => {
                if let Some(driver) = clients.get(&name) {
                    return Ok(driver.clone());
                }
                tracing::warn!("Client {} not found, switch to primary client", name);
            }
        }
        self.primary_from(&clients)
    }

    pub fn primary_client(&self) -> Result<DriverBox> {
        self.primary_from(&self.clients.load())
    }

    fn primary_from(&self, clients: &ClientMap) -> Result<DriverBox> {
        let primary = self.primary();
        clients
            .get(&primary)
            .cloned()
            .ok_or(StorageError::NoPrimaryClient { primary })
    }

    /// Expand a declaration into a concrete attribute / 将声明解析为路由属性
    ///
    /// Never fails: unknown clients fall back to the primary name, unresolvable
    /// buckets to the resolved client's default bucket.
    pub fn resolve_attribute(&self, invocation: &Invocation, declaration: &Declaration) -> Attribute {
        let override_kind = declaration.resolver().and_then(|r| {
            let kind = self.resolvers.named(r.name());
            if kind.is_none() {
                tracing::warn!("Resolver {} is not registered, using the chain", r.name());
            }
            kind
        });

        let clients = self.clients.load();
        let primary = self.primary();

        let client = match self.expand(override_kind, invocation, declaration.client_marker()) {
            Some(name) if clients.contains_key(&normalize_name(&name)) => normalize_name(&name),
            Some(name) => {
                tracing::warn!("Client {} not found, switch to primary client {}", name, primary);
                primary
            }
            None => {
                tracing::debug!("Client marker {:?} resolved to nothing, use primary", declaration.client_marker());
                primary
            }
        };

        let bucket = self
            .expand(override_kind, invocation, declaration.bucket_marker())
            .or_else(|| {
                clients
                    .get(&client)
                    .and_then(|c| c.default_bucket())
                    .map(str::to_string)
            })
            .unwrap_or_default();

        tracing::debug!("Routing {} to client {} bucket {:?}", invocation.method(), client, bucket);
        Attribute::new(client, bucket)
    }

    fn expand(&self, kind: Option<&ResolverKind>, invocation: &Invocation, marker: &str) -> Option<String> {
        if marker.trim().is_empty() {
            return None;
        }
        let result = match kind {
            Some(kind) => self.resolvers.determine_with(kind, invocation, marker),
            None => self.resolvers.determine(invocation, marker),
        };
        match result {
            Ok(value) => value.filter(|v| !v.trim().is_empty()),
            Err(e) => {
                tracing::warn!("{}, treated as absent", e);
                None
            }
        }
    }

    /// Close every client; one failure does not stop the rest / 关闭所有客户端
    pub fn shutdown(&self) -> usize {
        let _guard = self.write_lock.lock();
        let clients = self.clients.swap(Arc::new(ClientMap::new()));
        let mut failures = 0;
        for (name, driver) in clients.iter() {
            match driver.shutdown() {
                Ok(()) => tracing::debug!("Client {} closed", name),
                Err(e) => {
                    failures += 1;
                    tracing::error!("Failed to close client {}: {}", name, e);
                }
            }
        }
        tracing::info!("Dynamic storage shut down, {} clients closed", clients.len());
        failures
    }
}
