//! # Server Configuration
//!
//! This module contains the server setup and configuration for the answer bot API.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::handlers;
use crate::marketplace::MarketplaceClient;
use crate::oauth::OAuthExchanger;
use crate::pipeline::Orchestrator;
use crate::replier::OpenAiReplyGenerator;
use crate::repositories::TenantRepository;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub orchestrator: Arc<Orchestrator>,
    pub exchanger: Arc<OAuthExchanger>,
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/install", get(handlers::oauth::install))
        .route("/callback", get(handlers::oauth::callback))
        .route("/notifications", post(handlers::notifications::receive))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

/// Wires the concrete dependencies into an application state
pub fn build_state(config: AppConfig, db: DatabaseConnection) -> AppState {
    let http = reqwest::Client::new();
    let store = Arc::new(TenantRepository::new(Arc::new(db.clone())));

    let marketplace = Arc::new(MarketplaceClient::from_config(http.clone(), &config));
    let replier = Arc::new(OpenAiReplyGenerator::from_config(http.clone(), &config));
    let orchestrator = Arc::new(Orchestrator::new(store.clone(), marketplace, replier));
    let exchanger = Arc::new(OAuthExchanger::new(http, &config, store));

    AppState {
        config: Arc::new(config),
        db,
        orchestrator,
        exchanger,
    }
}

/// Starts the server with the given configuration
pub async fn run_server(
    config: AppConfig,
    db: DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    // Resolve the configured bind address
    let addr = config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;
    let profile = config.profile.clone();

    let state = build_state(config, db);
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("Server listening on: {}", addr);
    println!("Running in profile: {}", profile);

    axum::serve(listener, app).await?;

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::notifications::receive,
        crate::handlers::oauth::install,
        crate::handlers::oauth::callback,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::pipeline::NotificationEvent,
            crate::handlers::notifications::NotificationResponse,
            crate::error::ApiError,
        )
    ),
    info(
        title = "Marketplace Answer Bot API",
        description = "Webhook-driven question answering for marketplace sellers",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
