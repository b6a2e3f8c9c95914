mod api;
mod authentication;
mod config;
mod db;
mod errors;
mod media;
mod models;
mod system;

use std::error::Error;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use axum_prometheus::PrometheusMetricLayer;
use tower_cookies::CookieManagerLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::api::common::tracing::{
    make_custom_span, on_custom_failure, on_custom_request, on_custom_response,
};
use crate::config::{AuthSettings, Settings};
use crate::db::{init_db, Store};
use crate::media::{AssetGateway, HttpAssetGateway};

#[derive(Clone)]
pub struct InnerState {
    pub store: Arc<dyn Store>,
    pub assets: Arc<dyn AssetGateway>,
    pub auth: Arc<AuthSettings>,
    pub default_page_limit: u32,
}

/// Assembles the full application router around `state`.
pub fn create_app(state: InnerState, max_upload_bytes: usize) -> Router {
    Router::new()
        .nest("/api", api::create_api_router(state.clone()))
        .merge(system::create_system_router())
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(CookieManagerLayer::new())
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(make_custom_span)
                .on_request(on_custom_request)
                .on_response(on_custom_response)
                .on_failure(on_custom_failure),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vidtube_api=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env()?;
    let store = init_db(&settings).await?;
    let assets = HttpAssetGateway::new(&settings.assets);

    let state = InnerState {
        store,
        assets: Arc::new(assets),
        auth: Arc::new(settings.auth),
        default_page_limit: settings.default_page_limit,
    };

    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
    let app = create_app(state, settings.max_upload_bytes)
        .route("/metrics", get(|| async move { metric_handle.render() }))
        .layer(prometheus_layer);

    let listener = tokio::net::TcpListener::bind(&settings.bind_address).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
