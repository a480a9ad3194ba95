use std::sync::Arc;

use axum::{extract::Extension, response::Json, routing::get, Router};

use crate::{
    dto::{ComponentList, ConditionReport},
    service::GraphService,
};

/// Create registry router
pub fn create_router() -> Router {
    Router::new()
        .route("/components", get(list_components))
        .route("/conditions", get(list_conditions))
}

/// Components in registration order
async fn list_components(Extension(service): Extension<Arc<GraphService>>) -> Json<ComponentList> {
    Json(ComponentList {
        components: service.components(),
    })
}

/// Outcome of every entry evaluated at startup
async fn list_conditions(Extension(service): Extension<Arc<GraphService>>) -> Json<ConditionReport> {
    Json(ConditionReport {
        outcomes: service.conditions(),
    })
}
