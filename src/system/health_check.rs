use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use crate::api::common::ApiResponse;
use crate::InnerState;

/// Reports whether the store answers. Always renders the response envelope.
pub async fn health_check(State(inner): State<InnerState>) -> impl IntoResponse {
    match inner.store.health_check().await {
        Ok(()) => ApiResponse::ok(json!({ "store": "up" }), "OK").into_response(),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            ApiResponse::new(
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "store": "down" }),
                "Store unavailable",
            )
            .into_response()
        }
    }
}
