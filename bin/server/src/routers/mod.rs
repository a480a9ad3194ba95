use axum::Router;

pub mod registry;

/// Create the main API router
pub fn create_router() -> Router {
    Router::new().merge(registry::create_router())
}
