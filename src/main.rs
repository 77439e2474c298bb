use axum::{
    extract::DefaultBodyLimit,
    routing::{get, put},
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_cookies::CookieManagerLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod state;

use dynamic_storage::config;
use dynamic_storage::declaration::DeclarationResolver;
use dynamic_storage::facade::DynamicStorage;
use dynamic_storage::request::{request_context_layer, RequestContextState, SessionStore};
use dynamic_storage::storage::{ConfigClientSourceProvider, DriverCreator, StorageManager};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dynamic_storage=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "dynamic-storage v{} (built {})",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME")
    );

    // Load configuration / 加载配置
    let config_path = std::env::var(config::CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.json"));
    let mut app_config = config::load_config(&config_path)?;
    app_config.apply_env_overrides();
    if !app_config.enabled {
        tracing::warn!("Dynamic storage is disabled in {:?}, nothing to serve", config_path);
        return Ok(());
    }

    // Register driver factories and load clients / 注册驱动并加载客户端
    let creator = Arc::new(DriverCreator::new());
    dynamic_storage::register_storage_drivers(&creator);
    tracing::info!("Driver kinds available: {:?}", creator.kinds());

    let manager = Arc::new(StorageManager::from_config(&app_config));
    let provider = ConfigClientSourceProvider::new(app_config.clients.clone(), creator);
    let report = manager.initialize(&provider)?;
    tracing::info!(
        "{} clients loaded, primary {} available: {}",
        report.loaded,
        manager.primary(),
        report.primary_available
    );

    let declarations = Arc::new(DeclarationResolver::new(app_config.allowed_public_only));
    api::objects::register_declarations(&declarations);

    let sessions = SessionStore::new();
    let state = Arc::new(AppState {
        storage: DynamicStorage::new(manager.clone(), declarations),
        sessions: sessions.clone(),
        cookie_name: app_config.session_cookie.clone(),
    });

    let app = Router::new()
        .route("/api/clients", get(api::clients::list_clients))
        .route("/api/session", put(api::session::update_session))
        .route("/api/objects", get(api::objects::list_objects))
        .route(
            "/api/objects/*key",
            get(api::objects::get_object)
                .put(api::objects::put_object)
                .delete(api::objects::delete_object),
        )
        .route("/api/presign/*key", get(api::objects::presign_object))
        .layer(axum::middleware::from_fn_with_state(
            RequestContextState::new(sessions, &app_config.session_cookie),
            request_context_layer,
        ))
        .layer(DefaultBodyLimit::disable()) // No size limit
        .layer(CookieManagerLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let bind_addr = app_config.get_bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server running at http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    let failures = manager.shutdown();
    if failures > 0 {
        tracing::warn!("{} clients failed to close", failures);
    }
    Ok(())
}
