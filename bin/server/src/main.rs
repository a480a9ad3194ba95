use std::sync::Arc;

use axum::{extract::Extension, response::Json, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::{info, instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod dto;
mod routers;
mod service;

use config::Settings;
use dto::HealthResponse;
use service::GraphService;

/// Health check endpoint
#[instrument(skip_all)]
async fn healthcheck(Extension(service): Extension<Arc<GraphService>>) -> Json<HealthResponse> {
    Json(service.health().await)
}

/// Build the Axum router around a bootstrapped service
fn create_app(service: Arc<GraphService>) -> Router {
    Router::new()
        .route("/healthcheck", get(healthcheck))
        .nest("/api", routers::create_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
                .layer(CorsLayer::permissive())
                .layer(Extension(service)),
        )
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "graphboot_server=debug,graphboot_core=debug,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load();
    info!("Starting graphboot server with settings: {:?}", settings);

    let service = Arc::new(GraphService::new(&settings)?);
    let app = create_app(service);

    let listener = tokio::net::TcpListener::bind(&settings.server_address()).await?;
    info!("Server listening on {}", settings.server_address());

    axum::serve(listener, app).await?;

    Ok(())
}
