//! API module containing all versioned API endpoints

pub mod common;
pub mod v1;

use axum::Router;

use crate::InnerState;

/// Creates the main API router with all versions
#[tracing::instrument(name = "create_api_router", skip(state))]
pub fn create_api_router(state: InnerState) -> Router<InnerState> {
    tracing::info!("Creating API router with versioned endpoints");

    Router::new().nest("/v1", v1::routes::create_v1_routes(state))
}
