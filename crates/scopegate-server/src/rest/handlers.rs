use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use scopegate_core::CallerIdentity;
use scopegate_storage::{EntityStore, ListOptions};

use crate::error::GatewayError;
use crate::service::{GatewayRequest, Operation};

use super::AppState;
use super::types::*;

fn error_status(err: &GatewayError) -> StatusCode {
    match err {
        GatewayError::Unauthenticated => StatusCode::UNAUTHORIZED,
        GatewayError::MissingParameter(_)
        | GatewayError::InvalidParameter(_)
        | GatewayError::InvalidOperation(_) => StatusCode::BAD_REQUEST,
        GatewayError::Forbidden { .. } => StatusCode::FORBIDDEN,
        GatewayError::NotFound { .. } => StatusCode::NOT_FOUND,
        GatewayError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn gateway_error_to_response(err: GatewayError, expose_details: bool) -> Response {
    let status = error_status(&err);
    let body = match err {
        GatewayError::Upstream(cause) => {
            tracing::error!(error = %cause, "entity store request failed");
            ErrorResponse {
                error: "internal server error".to_string(),
                details: expose_details.then(|| cause.to_string()),
            }
        }
        other => ErrorResponse {
            error: other.to_string(),
            details: None,
        },
    };
    (status, Json(body)).into_response()
}

fn into_gateway_request(req: EntityRequest) -> Result<GatewayRequest, GatewayError> {
    let entity = req
        .entity_name
        .ok_or(GatewayError::MissingParameter("entity_name"))?;
    let operation: Operation = req
        .operation
        .ok_or(GatewayError::MissingParameter("operation"))?
        .parse()?;

    Ok(GatewayRequest {
        entity_type: entity,
        operation,
        query: req.query,
        data: req.data,
        id: req.id,
        options: ListOptions {
            sort: req.sort,
            limit: req.limit,
        },
    })
}

pub async fn dispatch<S: EntityStore + 'static>(
    State(state): State<AppState<S>>,
    identity: Option<Extension<CallerIdentity>>,
    payload: Result<Json<EntityRequest>, JsonRejection>,
) -> Response {
    let Some(Extension(identity)) = identity else {
        return gateway_error_to_response(GatewayError::Unauthenticated, false);
    };

    let request = match payload {
        Ok(Json(body)) => into_gateway_request(body),
        Err(rejection) => Err(GatewayError::InvalidParameter(rejection.body_text())),
    };

    let result = match request {
        Ok(request) => state.service.execute(&identity, request).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(data) => (
            StatusCode::OK,
            Json(SuccessResponse {
                success: true,
                data,
            }),
        )
            .into_response(),
        Err(e) => gateway_error_to_response(e, state.expose_error_details),
    }
}

pub async fn healthz() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}
