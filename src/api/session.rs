use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::{Map, Value};
use tower_cookies::{Cookie, Cookies};

use crate::api::ApiResponse;
use crate::state::AppState;

/// PUT /api/session - 设置会话属性（如 bucket），必要时创建会话
pub async fn update_session(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    Json(attributes): Json<Map<String, Value>>,
) -> Json<ApiResponse<Map<String, Value>>> {
    let session_id = match cookies.get(&state.cookie_name) {
        Some(cookie) => cookie.value().to_string(),
        None => {
            let id = uuid::Uuid::new_v4().to_string();
            let mut cookie = Cookie::new(state.cookie_name.clone(), id.clone());
            cookie.set_path("/");
            cookie.set_http_only(true);
            cookies.add(cookie);
            tracing::debug!("Session created: {}", id);
            id
        }
    };

    for (key, value) in attributes {
        state.sessions.set_attribute(&session_id, &key, value);
    }

    let current = state
        .sessions
        .get(&session_id)
        .unwrap_or_default()
        .into_iter()
        .collect();
    Json(ApiResponse::success(current))
}
