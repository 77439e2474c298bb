//! Storage configuration module / 存储配置模块
//!
//! Loaded from a JSON file (config.json by default). A default file is
//! written on first run / 首次运行时创建默认配置文件

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StorageError};
use crate::resolver::{HEADER_ORDER, SESSION_ORDER};
use crate::storage::DriverKind;
use crate::utils::normalize_name;

/// Overrides `primary` / 覆盖主客户端名称
pub const PRIMARY_ENV: &str = "DYNAMIC_STORAGE_PRIMARY";
/// Config file path used by the binary / 配置文件路径
pub const CONFIG_ENV: &str = "DYNAMIC_STORAGE_CONFIG";

/// Storage configuration / 存储配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Whether dynamic storage is enabled / 是否启用
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Primary (default) client name / 主客户端名称
    #[serde(default = "default_primary")]
    pub primary: String,
    /// Client name -> backend properties / 客户端配置
    #[serde(default)]
    pub clients: IndexMap<String, DriverProperty>,
    /// Ignore declarations on non-public methods / 仅识别公共方法上的声明
    #[serde(default = "default_true")]
    pub allowed_public_only: bool,
    #[serde(default)]
    pub resolver_order: ResolverOrder,
    /// Cookie carrying the session id / 会话 Cookie 名称
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Backend property bag / 后端参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverProperty {
    /// Backend kind; the client name is parsed when absent / 后端种类
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<DriverKind>,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub path_style: bool,
    /// Root directory for local disk / 本地存储根目录
    #[serde(default)]
    pub location: String,
}

/// Resolver chain orders / 解析器顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverOrder {
    #[serde(default = "default_header_order")]
    pub header: i32,
    #[serde(default = "default_session_order")]
    pub session: i32,
}

/// Server configuration / 服务器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address / 服务器监听地址
    pub host: String,
    /// Server port / 服务器端口
    pub port: u16,
}

fn default_true() -> bool {
    true
}

fn default_primary() -> String {
    "LOCAL".to_string()
}

fn default_session_cookie() -> String {
    "SESSION".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_header_order() -> i32 {
    HEADER_ORDER
}

fn default_session_order() -> i32 {
    SESSION_ORDER
}

impl Default for StorageConfig {
    fn default() -> Self {
        let mut clients = IndexMap::new();
        clients.insert(
            "LOCAL".to_string(),
            DriverProperty {
                kind: Some(DriverKind::Local),
                location: "public".to_string(),
                ..DriverProperty::default()
            },
        );
        Self {
            enabled: true,
            primary: default_primary(),
            clients,
            allowed_public_only: true,
            resolver_order: ResolverOrder::default(),
            session_cookie: default_session_cookie(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for DriverProperty {
    fn default() -> Self {
        Self {
            kind: None,
            endpoint: String::new(),
            access_key: String::new(),
            secret_key: String::new(),
            bucket: String::new(),
            region: default_region(),
            path_style: false,
            location: String::new(),
        }
    }
}

impl Default for ResolverOrder {
    fn default() -> Self {
        Self {
            header: HEADER_ORDER,
            session: SESSION_ORDER,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8180,
        }
    }
}

impl DriverProperty {
    /// Explicit kind, or the client name read as a kind / 确定后端种类
    pub fn kind_for(&self, name: &str) -> DriverKind {
        self.kind.clone().unwrap_or_else(|| DriverKind::from(name))
    }
}

impl StorageConfig {
    pub fn from_json(content: &str) -> Result<Self> {
        let mut config: StorageConfig = serde_json::from_str(content)
            .map_err(|e| StorageError::Config(format!("Failed to parse config: {}", e)))?;
        config.normalize();
        Ok(config)
    }

    /// Upper-case client keys and the primary name / 名称统一大写
    pub fn normalize(&mut self) {
        self.primary = normalize_name(&self.primary);
        self.clients = std::mem::take(&mut self.clients)
            .into_iter()
            .map(|(name, property)| (normalize_name(&name), property))
            .collect();
    }

    /// Apply environment overrides / 应用环境变量覆盖
    pub fn apply_env_overrides(&mut self) {
        if let Ok(primary) = std::env::var(PRIMARY_ENV) {
            if !primary.trim().is_empty() {
                tracing::info!("Primary client overridden by {}: {}", PRIMARY_ENV, primary);
                self.primary = normalize_name(&primary);
            }
        }
    }

    /// Get the server bind address / 获取服务器绑定地址
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Load configuration from file, or create default if not exists / 加载配置文件，不存在则创建默认配置
pub fn load_config(path: &Path) -> Result<StorageConfig> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .map_err(|e| StorageError::Config(format!("Failed to read config file: {}", e)))?;
        let config = StorageConfig::from_json(&content)?;
        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    } else {
        let config = StorageConfig::default();
        save_config(path, &config)?;
        tracing::info!("Created default configuration at {:?}", path);
        Ok(config)
    }
}

/// Save configuration to file / 保存配置到文件
pub fn save_config(path: &Path, config: &StorageConfig) -> Result<()> {
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| StorageError::Config(format!("Failed to serialize config: {}", e)))?;

    std::fs::write(path, content)
        .map_err(|e| StorageError::Config(format!("Failed to write config file: {}", e)))?;

    Ok(())
}
