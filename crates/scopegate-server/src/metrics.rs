use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::service::Operation;

#[derive(Debug, Default)]
pub struct Metrics {
    request_total: AtomicU64,
    request_success: AtomicU64,
    request_error: AtomicU64,
    forbidden_total: AtomicU64,
    operations: [AtomicU64; Operation::ALL.len()],
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.request_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.request_success.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.request_error.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_forbidden(&self) {
        self.forbidden_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_operation(&self, operation: Operation) {
        self.operations[operation.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_total(&self) -> u64 {
        self.request_total.load(Ordering::Relaxed)
    }

    pub fn request_success(&self) -> u64 {
        self.request_success.load(Ordering::Relaxed)
    }

    pub fn request_error(&self) -> u64 {
        self.request_error.load(Ordering::Relaxed)
    }

    pub fn forbidden_total(&self) -> u64 {
        self.forbidden_total.load(Ordering::Relaxed)
    }

    pub fn operation_total(&self, operation: Operation) -> u64 {
        self.operations[operation.index()].load(Ordering::Relaxed)
    }

    pub fn render_prometheus(&self) -> String {
        let mut output = String::new();
        output.push_str("# HELP scopegate_requests_total Total number of requests.\n");
        output.push_str("# TYPE scopegate_requests_total counter\n");
        output.push_str(&format!(
            "scopegate_requests_total {}\n",
            self.request_total()
        ));
        output.push_str("# HELP scopegate_requests_success_total Total successful requests.\n");
        output.push_str("# TYPE scopegate_requests_success_total counter\n");
        output.push_str(&format!(
            "scopegate_requests_success_total {}\n",
            self.request_success()
        ));
        output.push_str("# HELP scopegate_requests_error_total Total failed requests.\n");
        output.push_str("# TYPE scopegate_requests_error_total counter\n");
        output.push_str(&format!(
            "scopegate_requests_error_total {}\n",
            self.request_error()
        ));
        output.push_str("# HELP scopegate_forbidden_total Requests denied by ownership checks.\n");
        output.push_str("# TYPE scopegate_forbidden_total counter\n");
        output.push_str(&format!(
            "scopegate_forbidden_total {}\n",
            self.forbidden_total()
        ));
        output.push_str("# HELP scopegate_operations_total Dispatched entity operations.\n");
        output.push_str("# TYPE scopegate_operations_total counter\n");
        for operation in Operation::ALL {
            output.push_str(&format!(
                "scopegate_operations_total{{operation=\"{}\"}} {}\n",
                operation.as_str(),
                self.operation_total(operation)
            ));
        }
        output
    }
}

pub async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        metrics.render_prometheus(),
    )
}
