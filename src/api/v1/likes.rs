use axum::extract::{Path, State};
use axum::Extension;
use serde::Serialize;
use uuid::Uuid;

use crate::api::common::utils::parse_id;
use crate::api::common::ApiResponse;
use crate::api::v1::videos::visible_video;
use crate::authentication::Claims;
use crate::errors::AppError;
use crate::models::{Like, LikeTarget, LikedVideo};
use crate::InnerState;

#[derive(Debug, Serialize)]
pub struct LikeToggle {
    pub liked: bool,
    pub like: Like,
}

async fn ensure_target_visible(
    inner: &InnerState,
    requester: Uuid,
    target: LikeTarget,
) -> Result<(), AppError> {
    match target {
        LikeTarget::Video(id) => {
            visible_video(inner, id, Some(requester)).await?;
        }
        LikeTarget::Comment(id) => {
            let comment = inner
                .store
                .find_comment(id)
                .await?
                .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;
            visible_video(inner, comment.video_id, Some(requester))
                .await
                .map_err(|_| AppError::NotFound("Comment not found".to_string()))?;
        }
        LikeTarget::Tweet(id) => {
            if inner.store.find_tweet(id).await?.is_none() {
                return Err(AppError::NotFound("Tweet not found".to_string()));
            }
        }
    }
    Ok(())
}

async fn toggle(
    inner: &InnerState,
    liked_by: Uuid,
    target: LikeTarget,
) -> Result<ApiResponse<LikeToggle>, AppError> {
    ensure_target_visible(inner, liked_by, target).await?;

    let toggled = inner.store.toggle_like(liked_by, target).await?;
    let liked = toggled.is_created();
    tracing::debug!(target_kind = target.kind(), target_id = %target.id(), liked, "Like toggled");

    let message = if liked {
        format!("Liked {}", target.kind())
    } else {
        format!("Unliked {}", target.kind())
    };
    Ok(ApiResponse::ok(
        LikeToggle {
            liked,
            like: toggled.into_inner(),
        },
        message,
    ))
}

#[tracing::instrument(name = "Toggle video like", skip(inner, claims), fields(user_id = %claims.sub))]
pub async fn toggle_video_like(
    State(inner): State<InnerState>,
    Extension(claims): Extension<Claims>,
    Path(video_id): Path<String>,
) -> Result<ApiResponse<LikeToggle>, AppError> {
    let video_id = parse_id(&video_id, "video")?;
    toggle(&inner, claims.sub, LikeTarget::Video(video_id)).await
}

#[tracing::instrument(name = "Toggle comment like", skip(inner, claims), fields(user_id = %claims.sub))]
pub async fn toggle_comment_like(
    State(inner): State<InnerState>,
    Extension(claims): Extension<Claims>,
    Path(comment_id): Path<String>,
) -> Result<ApiResponse<LikeToggle>, AppError> {
    let comment_id = parse_id(&comment_id, "comment")?;
    toggle(&inner, claims.sub, LikeTarget::Comment(comment_id)).await
}

#[tracing::instrument(name = "Toggle tweet like", skip(inner, claims), fields(user_id = %claims.sub))]
pub async fn toggle_tweet_like(
    State(inner): State<InnerState>,
    Extension(claims): Extension<Claims>,
    Path(tweet_id): Path<String>,
) -> Result<ApiResponse<LikeToggle>, AppError> {
    let tweet_id = parse_id(&tweet_id, "tweet")?;
    toggle(&inner, claims.sub, LikeTarget::Tweet(tweet_id)).await
}

#[tracing::instrument(name = "Liked videos", skip(inner, claims), fields(user_id = %claims.sub))]
pub async fn liked_videos(
    State(inner): State<InnerState>,
    Extension(claims): Extension<Claims>,
) -> Result<ApiResponse<Vec<LikedVideo>>, AppError> {
    let videos = inner.store.liked_videos(claims.sub).await?;
    Ok(ApiResponse::ok(videos, "Liked videos fetched successfully"))
}
