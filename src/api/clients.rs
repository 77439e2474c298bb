use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ClientInfo {
    pub name: String,
    pub kind: String,
    pub driver: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_bucket: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClientList {
    pub primary: String,
    pub clients: Vec<ClientInfo>,
}

/// GET /api/clients - 已注册的客户端
pub async fn list_clients(State(state): State<Arc<AppState>>) -> Json<ApiResponse<ClientList>> {
    let clients = state
        .storage
        .current_clients()
        .iter()
        .map(|(name, driver)| ClientInfo {
            name: name.clone(),
            kind: driver.kind().to_string(),
            driver: driver.name().to_string(),
            default_bucket: driver.default_bucket().map(str::to_string),
        })
        .collect();

    Json(ApiResponse::success(ClientList {
        primary: state.storage.manager().primary(),
        clients,
    }))
}
