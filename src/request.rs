//! Inbound request context / 请求上下文
//!
//! Header and session markers (`#header:..`, `#session:..`) are evaluated
//! against the request currently being served. The middleware below snapshots
//! the request headers and the caller's session attributes into a task-local
//! for the duration of the request.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use parking_lot::RwLock;
use serde_json::Value;
use tower_cookies::Cookies;

use crate::context;

pub type SessionAttributes = HashMap<String, Value>;

tokio::task_local! {
    static CURRENT_REQUEST: Arc<RequestContext>;
}

/// Snapshot of one inbound request / 单个请求的快照
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    headers: HeaderMap,
    session: SessionAttributes,
}

impl RequestContext {
    pub fn new(headers: HeaderMap, session: SessionAttributes) -> Self {
        Self { headers, session }
    }

    /// Header value, `None` when absent or not visible ASCII / 获取请求头
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    /// Session attribute rendered as a string / 获取会话属性
    pub fn session_attribute(&self, name: &str) -> Option<String> {
        match self.session.get(name)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Request being served by the current task, if any / 当前任务的请求
    pub fn current() -> Option<Arc<RequestContext>> {
        CURRENT_REQUEST.try_with(Arc::clone).ok()
    }

    /// Run `fut` with `ctx` installed as the current request / 在请求作用域内执行
    pub async fn scope<F: Future>(ctx: Arc<RequestContext>, fut: F) -> F::Output {
        CURRENT_REQUEST.scope(ctx, fut).await
    }
}

/// In-memory session attribute store / 内存会话存储
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionAttributes>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_attribute(&self, session_id: &str, key: &str, value: Value) {
        self.sessions
            .write()
            .entry(session_id.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    pub fn get(&self, session_id: &str) -> Option<SessionAttributes> {
        self.sessions.read().get(session_id).cloned()
    }

    pub fn remove(&self, session_id: &str) -> Option<SessionAttributes> {
        self.sessions.write().remove(session_id)
    }
}

/// State for [`request_context_layer`] / 中间件状态
#[derive(Debug, Clone)]
pub struct RequestContextState {
    pub sessions: SessionStore,
    pub cookie_name: Arc<str>,
}

impl RequestContextState {
    pub fn new(sessions: SessionStore, cookie_name: &str) -> Self {
        Self {
            sessions,
            cookie_name: Arc::from(cookie_name),
        }
    }
}

/// Installs the request context and a fresh attribute stack for the request
/// 为请求安装上下文和独立的属性栈
///
/// Mount with `axum::middleware::from_fn_with_state`, inside a
/// `tower_cookies::CookieManagerLayer`.
pub async fn request_context_layer(
    State(state): State<RequestContextState>,
    cookies: Cookies,
    request: Request,
    next: Next,
) -> Response {
    let session = cookies
        .get(&state.cookie_name)
        .and_then(|cookie| state.sessions.get(cookie.value()))
        .unwrap_or_default();
    let ctx = Arc::new(RequestContext::new(request.headers().clone(), session));
    RequestContext::scope(ctx, context::scope(next.run(request))).await
}
