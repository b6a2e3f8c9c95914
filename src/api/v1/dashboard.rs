use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Extension;

use crate::api::common::{ApiResponse, Pagination, PaginationParams};
use crate::authentication::Claims;
use crate::db::VideoSortField;
use crate::errors::AppError;
use crate::models::{ChannelStats, ChannelVideo};
use crate::InnerState;

#[tracing::instrument(name = "Channel stats", skip(inner, claims), fields(user_id = %claims.sub))]
pub async fn channel_stats(
    State(inner): State<InnerState>,
    Extension(claims): Extension<Claims>,
) -> Result<ApiResponse<ChannelStats>, AppError> {
    let stats = inner.store.channel_stats(claims.sub).await?;
    Ok(ApiResponse::ok(stats, "Channel stats fetched successfully"))
}

#[tracing::instrument(name = "Channel videos", skip(inner, claims, params), fields(user_id = %claims.sub))]
pub async fn channel_videos(
    State(inner): State<InnerState>,
    Extension(claims): Extension<Claims>,
    params: Result<Query<PaginationParams>, QueryRejection>,
) -> Result<ApiResponse<Vec<ChannelVideo>>, AppError> {
    let Query(params) = params?;
    let page = params.into_request(inner.default_page_limit, VideoSortField::parse)?;

    let (videos, total) = inner.store.channel_videos(claims.sub, &page).await?;
    Ok(ApiResponse::ok(videos, "Channel videos fetched successfully")
        .with_pagination(Pagination::new(&page, total)))
}
