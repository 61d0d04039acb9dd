//! SSO Server
//!
//! Production server for the OAuth2 login callback:
//! - `GET /oauth/callback` - authorization code callback
//! - `GET /health`, `GET /ready` - probes
//! - `/swagger-ui` - API docs
//!
//! ## Configuration
//!
//! Read from a TOML file (`SSO_CONFIG`, or `config.toml`/`sso.toml` in the
//! usual places) and overridden by environment variables:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SSO_HTTP_PORT` | `3000` | HTTP port |
//! | `SSO_MONGODB_URI` | `mongodb://localhost:27017` | MongoDB connection URL |
//! | `SSO_MONGODB_DATABASE` | `sso` | MongoDB database name |
//! | `SSO_PROVIDER_BASE_URL` | - | Identity provider base URL (required) |
//! | `SSO_PROVIDER_CLIENT_ID` | - | OAuth2 client ID (required) |
//! | `SSO_PROVIDER_CLIENT_SECRET` | - | OAuth2 client secret |
//! | `SSO_EXTERNAL_BASE_URL` | - | Public base URL for the callback |
//! | `SSO_CALLBACK_SCHEME` | `https` | Scheme when deriving the callback from Host |
//! | `RUST_LOG` | `info` | Log level |
//! | `LOG_FORMAT` | `text` | `json` for structured output |
//!
//! Run with `--example-config` to print a commented config file.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use mongodb::{bson::doc, Database};
use tokio::{net::TcpListener, signal};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

use sso_config::{AppConfig, ConfigLoader, LoginConfig, ProviderConfig};
use sso_platform::{
    callback_router, spawn_expired_sweeper, CallbackApiState, CallbackOrchestrator,
    CallbackSettings, CleanupQueue, IdentityProviderClient, MongoPendingLoginRepository,
    MongoRosterRepository, PendingLoginRepository, ProviderSettings,
};

/// How long shutdown waits for queued cleanups
const CLEANUP_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

fn provider_settings(config: &ProviderConfig) -> ProviderSettings {
    ProviderSettings {
        base_url: config.base_url.clone(),
        token_path: config.token_path.clone(),
        user_path: config.user_path.clone(),
        client_id: config.client_id.clone(),
        client_secret: config.client_secret.clone(),
        request_timeout: Duration::from_secs(config.timeout_secs),
    }
}

fn callback_settings(config: &LoginConfig) -> CallbackSettings {
    CallbackSettings {
        validity_window: Duration::from_secs(config.validity_secs),
        exchange_timeout: Duration::from_secs(config.exchange_timeout_secs),
        callback_scheme: config.callback_scheme.clone(),
        callback_path: config.callback_path.clone(),
        external_base_url: config.external_base_url().map(str::to_string),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::args().any(|arg| arg == "--example-config") {
        print!("{}", AppConfig::example_toml());
        return Ok(());
    }

    sso_common::logging::init_logging("sso-server");

    info!("Starting SSO Server");

    let config = ConfigLoader::new().load()?;
    config.validate()?;
    if config.dev_mode {
        warn!("Development mode enabled");
    }

    // Connect to MongoDB
    info!(
        uri = %config.mongodb.uri,
        database = %config.mongodb.database,
        "Connecting to MongoDB"
    );
    let mongo_client = mongodb::Client::with_uri_str(&config.mongodb.uri).await?;
    let db = mongo_client.database(&config.mongodb.database);

    // Repositories
    let login_repo: Arc<dyn PendingLoginRepository> =
        Arc::new(MongoPendingLoginRepository::new(&db));
    let roster_repo = Arc::new(MongoRosterRepository::new(&db));

    // Identity provider
    let provider_settings = provider_settings(&config.provider);
    info!(settings = ?provider_settings, "Identity provider configured");
    let provider = Arc::new(IdentityProviderClient::new(provider_settings)?);

    // Background cleanup
    let (cleanup_queue, cleanup_task) = CleanupQueue::spawn(login_repo.clone());
    let sweeper_task = spawn_expired_sweeper(
        login_repo.clone(),
        Duration::from_secs(config.login.validity_secs),
        Duration::from_secs(config.login.sweep_interval_secs.max(1)),
    );

    let orchestrator = Arc::new(CallbackOrchestrator::new(
        login_repo,
        roster_repo,
        provider,
        cleanup_queue,
        callback_settings(&config.login),
    ));
    let callback_state = CallbackApiState::new(orchestrator)
        .with_state_cookie_name(config.login.state_cookie_name.clone());

    let (router, mut openapi) = OpenApiRouter::new()
        .nest("/oauth", callback_router(callback_state))
        .split_for_parts();

    openapi.info.title = "SSO API".to_string();
    openapi.info.version = env!("CARGO_PKG_VERSION").to_string();
    openapi.info.description = Some("OAuth2 login callback".to_string());

    let app = Router::new()
        .merge(router)
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler).with_state(db))
        .merge(SwaggerUi::new("/swagger-ui").url("/q/openapi", openapi))
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.http.host, config.http.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("SSO Server listening on http://{}", addr);
    info!("Press Ctrl+C to shutdown");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Shutdown signal received...");

    // The router owned the last cleanup sender, so the worker is draining now
    sweeper_task.abort();
    if tokio::time::timeout(CLEANUP_DRAIN_TIMEOUT, cleanup_task)
        .await
        .is_err()
    {
        warn!("Pending cleanups not drained before shutdown");
    }

    info!("SSO Server shutdown complete");
    Ok(())
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "UP",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn ready_handler(State(db): State<Database>) -> (StatusCode, Json<serde_json::Value>) {
    match db.run_command(doc! { "ping": 1 }).await {
        Ok(_) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "READY" })),
        ),
        Err(e) => {
            error!(error = %e, "MongoDB ping failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "status": "NOT_READY" })),
            )
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
