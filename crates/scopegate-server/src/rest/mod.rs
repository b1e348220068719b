mod handlers;
mod types;

use std::sync::Arc;

use axum::Router;
use axum::extract::{DefaultBodyLimit, State};
use axum::middleware;
use axum::response::Response;
use axum::routing::{get, post};
use scopegate_storage::EntityStore;

const MAX_REQUEST_BODY_SIZE: usize = 4 * 1024 * 1024; // 4 MB

use crate::metrics::{self, Metrics};
use crate::middleware::auth::{AuthState, rest_auth_middleware};
use crate::service::GatewayService;

pub struct AppState<S: EntityStore> {
    pub service: Arc<GatewayService<S>>,
    pub metrics: Arc<Metrics>,
    pub expose_error_details: bool,
}

impl<S: EntityStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            metrics: self.metrics.clone(),
            expose_error_details: self.expose_error_details,
        }
    }
}

async fn metrics_middleware(
    State(metrics): State<Arc<Metrics>>,
    request: axum::http::Request<axum::body::Body>,
    next: middleware::Next,
) -> Response {
    metrics.record_request();

    let response = next.run(request).await;

    if response.status().is_success() {
        metrics.record_success();
    } else {
        metrics.record_error();
    }

    response
}

pub fn create_router<S>(state: AppState<S>, auth: AuthState) -> Router
where
    S: EntityStore + 'static,
{
    let metrics = Arc::clone(&state.metrics);

    Router::new()
        .route("/v1/entities", post(handlers::dispatch::<S>))
        .route("/healthz", get(handlers::healthz))
        .route(
            "/metrics",
            get(metrics::metrics_handler).with_state(Arc::clone(&metrics)),
        )
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_SIZE))
        .layer(middleware::from_fn_with_state(auth, rest_auth_middleware))
        .layer(middleware::from_fn_with_state(metrics, metrics_middleware))
        .with_state(state)
}
