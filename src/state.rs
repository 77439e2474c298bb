use dynamic_storage::facade::DynamicStorage;
use dynamic_storage::request::SessionStore;

/// Shared handler state / 应用状态
pub struct AppState {
    pub storage: DynamicStorage,
    pub sessions: SessionStore,
    pub cookie_name: String,
}
