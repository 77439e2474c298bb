//! Object routes; every handler runs as an intercepted `ObjectService` call
//! so the client comes from the `X-Storage-Client` header and the bucket from
//! the session / 对象接口

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use dynamic_storage::declaration::{Declaration, DeclarationResolver, MethodId, MethodMeta, TypeMeta};
use dynamic_storage::invocation::Invocation;
use dynamic_storage::storage::ObjectInfo;
use dynamic_storage::utils::content_type_for;

use crate::api::{ApiError, ApiResponse};
use crate::state::AppState;

pub const OBJECT_SERVICE: &str = "ObjectService";
pub const CLIENT_HEADER_MARKER: &str = "#header:X-Storage-Client";
pub const BUCKET_SESSION_MARKER: &str = "#session:bucket";

/// Routing declaration for the object routes / 对象接口的路由声明
pub fn register_declarations(declarations: &DeclarationResolver) {
    let mut service = TypeMeta::new(OBJECT_SERVICE)
        .declare(Declaration::new(CLIENT_HEADER_MARKER, BUCKET_SESSION_MARKER));
    for method in ["get", "put", "delete", "list", "presign"] {
        service = service.method(MethodMeta::new(method));
    }
    declarations.register(service);
}

fn invocation(method: &str) -> Invocation {
    Invocation::new(MethodId::new(OBJECT_SERVICE, method), OBJECT_SERVICE)
}

/// GET /api/objects/*key
pub async fn get_object(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    let storage = &state.storage;
    let data = storage
        .interceptor()
        .invoke_async(invocation("get").arg("key", &key), storage.download(&key))
        .await?;

    let filename = key.rsplit('/').next().unwrap_or("download");
    let disposition = format!("inline; filename*=UTF-8''{}", urlencoding::encode(filename));
    Ok((
        [
            (header::CONTENT_TYPE, content_type_for(&key)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        data,
    )
        .into_response())
}

/// PUT /api/objects/*key
pub async fn put_object(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    body: Bytes,
) -> Result<Json<ApiResponse<ObjectInfo>>, ApiError> {
    let storage = &state.storage;
    let info = storage
        .interceptor()
        .invoke_async(invocation("put").arg("key", &key), storage.upload(&key, body))
        .await?;
    Ok(Json(ApiResponse::success(info)))
}

/// DELETE /api/objects/*key
pub async fn delete_object(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let storage = &state.storage;
    storage
        .interceptor()
        .invoke_async(invocation("delete").arg("key", &key), storage.delete(&key))
        .await?;
    Ok(Json(ApiResponse::success(())))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub recursive: bool,
}

/// GET /api/objects?prefix=..&recursive=..
pub async fn list_objects(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<ObjectInfo>>>, ApiError> {
    let storage = &state.storage;
    let objects = storage
        .interceptor()
        .invoke_async(
            invocation("list").arg("prefix", &query.prefix),
            storage.list(&query.prefix, query.recursive),
        )
        .await?;
    Ok(Json(ApiResponse::success(objects)))
}

#[derive(Debug, Deserialize)]
pub struct PresignQuery {
    #[serde(default = "default_expire")]
    pub expire: u32,
}

fn default_expire() -> u32 {
    3600
}

/// GET /api/presign/*key?expire=..
pub async fn presign_object(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(query): Query<PresignQuery>,
) -> Result<Json<ApiResponse<Option<String>>>, ApiError> {
    let storage = &state.storage;
    let url = storage
        .interceptor()
        .invoke_async(invocation("presign").arg("key", &key), storage.presign(&key, query.expire))
        .await?;
    Ok(Json(ApiResponse::success(url)))
}
