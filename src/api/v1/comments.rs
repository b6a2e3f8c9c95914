use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::common::utils::{ensure_owner, parse_id, required_text};
use crate::api::common::{ApiResponse, Pagination, PaginationParams};
use crate::api::v1::videos::visible_video;
use crate::authentication::Claims;
use crate::db::CommentSortField;
use crate::errors::AppError;
use crate::models::{Comment, CommentWithOwner};
use crate::InnerState;

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub content: Option<String>,
}

#[tracing::instrument(name = "List comments", skip(inner, claims, params))]
pub async fn list_comments(
    State(inner): State<InnerState>,
    claims: Option<Extension<Claims>>,
    Path(video_id): Path<String>,
    params: Result<Query<PaginationParams>, QueryRejection>,
) -> Result<ApiResponse<Vec<CommentWithOwner>>, AppError> {
    let video_id = parse_id(&video_id, "video")?;
    let Query(params) = params?;
    let page = params.into_request(inner.default_page_limit, CommentSortField::parse)?;

    visible_video(&inner, video_id, claims.map(|Extension(c)| c.sub)).await?;

    let (comments, total) = inner.store.list_comments(video_id, &page).await?;
    Ok(ApiResponse::ok(comments, "Comments fetched successfully")
        .with_pagination(Pagination::new(&page, total)))
}

#[tracing::instrument(name = "Add comment", skip(inner, claims, payload), fields(user_id = %claims.sub))]
pub async fn add_comment(
    State(inner): State<InnerState>,
    Extension(claims): Extension<Claims>,
    Path(video_id): Path<String>,
    payload: Result<Json<CommentRequest>, JsonRejection>,
) -> Result<ApiResponse<Comment>, AppError> {
    let video_id = parse_id(&video_id, "video")?;
    let Json(request) = payload?;
    let content = required_text(request.content, "content")?;

    visible_video(&inner, video_id, Some(claims.sub)).await?;

    let comment = inner
        .store
        .insert_comment(video_id, claims.sub, content)
        .await?;
    tracing::debug!(comment_id = %comment.id, "Comment added");
    Ok(ApiResponse::created(comment, "Comment added successfully"))
}

#[tracing::instrument(name = "Update comment", skip(inner, claims, payload), fields(user_id = %claims.sub))]
pub async fn update_comment(
    State(inner): State<InnerState>,
    Extension(claims): Extension<Claims>,
    Path(comment_id): Path<String>,
    payload: Result<Json<CommentRequest>, JsonRejection>,
) -> Result<ApiResponse<Comment>, AppError> {
    let comment_id = parse_id(&comment_id, "comment")?;
    let Json(request) = payload?;
    let content = required_text(request.content, "content")?;

    ensure_owner(
        inner.store.find_comment(comment_id).await?,
        claims.sub,
        "Comment",
    )?;

    let comment = inner
        .store
        .update_comment(comment_id, content)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;
    Ok(ApiResponse::ok(comment, "Comment updated successfully"))
}

#[tracing::instrument(name = "Delete comment", skip(inner, claims), fields(user_id = %claims.sub))]
pub async fn delete_comment(
    State(inner): State<InnerState>,
    Extension(claims): Extension<Claims>,
    Path(comment_id): Path<String>,
) -> Result<ApiResponse<Value>, AppError> {
    let comment_id = parse_id(&comment_id, "comment")?;
    ensure_owner(
        inner.store.find_comment(comment_id).await?,
        claims.sub,
        "Comment",
    )?;

    if !inner.store.delete_comment(comment_id).await? {
        return Err(AppError::NotFound("Comment not found".to_string()));
    }
    Ok(ApiResponse::ok(json!({}), "Comment deleted successfully"))
}
