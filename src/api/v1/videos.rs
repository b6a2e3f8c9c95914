use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::Extension;
use axum_typed_multipart::{FieldData, TryFromMultipart, TypedMultipart, TypedMultipartError};
use bytes::Bytes;
use futures::future::join_all;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::common::utils::{ensure_owner, optional_text, parse_id, required_text};
use crate::api::common::{ApiResponse, Pagination, PaginationParams};
use crate::authentication::Claims;
use crate::db::VideoSortField;
use crate::errors::AppError;
use crate::media::{stage_upload, AssetKind, AssetLedger};
use crate::models::{NewVideo, Video, VideoChanges, VideoFilter};
use crate::InnerState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_type: Option<crate::db::SortOrder>,
    pub user_id: Option<String>,
    pub query: Option<String>,
}

#[derive(TryFromMultipart)]
pub struct PublishVideoForm {
    pub title: Option<String>,
    pub description: Option<String>,
    #[form_data(field_name = "videoFile", limit = "unlimited")]
    pub video_file: Option<FieldData<Bytes>>,
    #[form_data(limit = "unlimited")]
    pub thumbnail: Option<FieldData<Bytes>>,
}

#[derive(TryFromMultipart)]
pub struct UpdateVideoForm {
    pub title: Option<String>,
    pub description: Option<String>,
    #[form_data(limit = "unlimited")]
    pub thumbnail: Option<FieldData<Bytes>>,
}

fn required_file(field: Option<FieldData<Bytes>>, name: &str) -> Result<FieldData<Bytes>, AppError> {
    field
        .filter(|f| !f.contents.is_empty())
        .ok_or_else(|| AppError::InvalidArgument(format!("{} is required", name)))
}

#[tracing::instrument(name = "List videos", skip(inner, params))]
pub async fn list_videos(
    State(inner): State<InnerState>,
    params: Result<Query<VideoListParams>, QueryRejection>,
) -> Result<ApiResponse<Vec<Video>>, AppError> {
    let Query(params) = params?;
    let owner_id = match optional_text(params.user_id) {
        Some(raw) => Some(parse_id(&raw, "user")?),
        None => None,
    };
    let filter = VideoFilter {
        owner_id,
        title_contains: optional_text(params.query),
        published_only: true,
    };
    let page = PaginationParams {
        page: params.page,
        limit: params.limit,
        sort_by: params.sort_by,
        sort_type: params.sort_type,
    }
    .into_request(inner.default_page_limit, VideoSortField::parse)?;

    let (videos, total) = inner.store.list_videos(&filter, &page).await?;
    tracing::debug!("Fetched {} of {} videos", videos.len(), total);
    Ok(ApiResponse::ok(videos, "Videos fetched successfully")
        .with_pagination(Pagination::new(&page, total)))
}

#[tracing::instrument(name = "Publish video", skip(inner, claims, form), fields(user_id = %claims.sub))]
pub async fn publish_video(
    State(inner): State<InnerState>,
    Extension(claims): Extension<Claims>,
    form: Result<TypedMultipart<PublishVideoForm>, TypedMultipartError>,
) -> Result<ApiResponse<Video>, AppError> {
    let TypedMultipart(form) = form?;
    let title = required_text(form.title, "title")?;
    let description = required_text(form.description, "description")?;
    let video_field = required_file(form.video_file, "videoFile")?;
    let thumbnail_field = required_file(form.thumbnail, "thumbnail")?;

    let video_file = stage_upload(video_field.contents, video_field.metadata.file_name).await?;
    let thumbnail_file =
        stage_upload(thumbnail_field.contents, thumbnail_field.metadata.file_name).await?;

    let mut ledger = AssetLedger::new(inner.assets.as_ref());
    let created = async {
        let uploaded_video = ledger.upload(video_file.path(), AssetKind::Video).await?;
        let uploaded_thumbnail = ledger.upload(thumbnail_file.path(), AssetKind::Image).await?;
        inner
            .store
            .insert_video(NewVideo {
                owner_id: claims.sub,
                title,
                description,
                duration: uploaded_video.duration.unwrap_or_default(),
                video_file: uploaded_video.asset(),
                thumbnail: uploaded_thumbnail.asset(),
            })
            .await
    }
    .await;

    match created {
        Ok(video) => {
            ledger.commit();
            tracing::info!(video_id = %video.id, "Video published");
            Ok(ApiResponse::created(video, "Video published successfully"))
        }
        Err(e) => {
            tracing::warn!("Publishing failed, removing uploaded assets: {}", e);
            ledger.rollback().await;
            Err(e)
        }
    }
}

/// Loads a video the requester may see. Drafts are only visible to their
/// owner; everyone else gets the same NotFound as for a missing id.
pub(crate) async fn visible_video(
    inner: &InnerState,
    video_id: Uuid,
    requester: Option<Uuid>,
) -> Result<Video, AppError> {
    match inner.store.find_video(video_id).await? {
        Some(video) if video.is_published || requester == Some(video.owner_id) => Ok(video),
        _ => Err(AppError::NotFound("Video not found".to_string())),
    }
}

#[tracing::instrument(name = "Get video", skip(inner, claims))]
pub async fn get_video(
    State(inner): State<InnerState>,
    claims: Option<Extension<Claims>>,
    Path(video_id): Path<String>,
) -> Result<ApiResponse<Video>, AppError> {
    let video_id = parse_id(&video_id, "video")?;
    let requester = claims.map(|Extension(c)| c.sub);
    visible_video(&inner, video_id, requester).await?;

    let video = inner
        .store
        .record_view(video_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Video not found".to_string()))?;
    Ok(ApiResponse::ok(video, "Video fetched successfully"))
}

#[tracing::instrument(name = "Update video", skip(inner, claims, form), fields(user_id = %claims.sub))]
pub async fn update_video(
    State(inner): State<InnerState>,
    Extension(claims): Extension<Claims>,
    Path(video_id): Path<String>,
    form: Result<TypedMultipart<UpdateVideoForm>, TypedMultipartError>,
) -> Result<ApiResponse<Video>, AppError> {
    let video_id = parse_id(&video_id, "video")?;
    let TypedMultipart(form) = form?;
    let title = optional_text(form.title);
    let description = optional_text(form.description);
    let thumbnail_field = form.thumbnail.filter(|f| !f.contents.is_empty());
    if title.is_none() && description.is_none() && thumbnail_field.is_none() {
        return Err(AppError::InvalidArgument(
            "At least one of title, description or thumbnail is required".to_string(),
        ));
    }

    let current = ensure_owner(inner.store.find_video(video_id).await?, claims.sub, "Video")?;

    let staged = match thumbnail_field {
        Some(field) => Some(stage_upload(field.contents, field.metadata.file_name).await?),
        None => None,
    };

    let mut ledger = AssetLedger::new(inner.assets.as_ref());
    let updated = async {
        let thumbnail = match &staged {
            Some(file) => Some(ledger.upload(file.path(), AssetKind::Image).await?.asset()),
            None => None,
        };
        let changes = VideoChanges {
            title,
            description,
            thumbnail,
            is_published: None,
        };
        inner
            .store
            .update_video(video_id, changes)
            .await?
            .ok_or_else(|| AppError::NotFound("Video not found".to_string()))
    }
    .await;

    let video = match updated {
        Ok(video) => {
            ledger.commit();
            video
        }
        Err(e) => {
            ledger.rollback().await;
            return Err(e);
        }
    };

    // The new thumbnail is persisted; only now is the old one safe to drop
    if video.thumbnail.public_id != current.thumbnail.public_id {
        if let Err(e) = inner
            .assets
            .delete(&current.thumbnail.public_id, AssetKind::Image)
            .await
        {
            tracing::warn!(public_id = %current.thumbnail.public_id, "Failed to delete replaced thumbnail: {}", e);
        }
    }

    Ok(ApiResponse::ok(video, "Video updated successfully"))
}

#[tracing::instrument(name = "Delete video", skip(inner, claims), fields(user_id = %claims.sub))]
pub async fn delete_video(
    State(inner): State<InnerState>,
    Extension(claims): Extension<Claims>,
    Path(video_id): Path<String>,
) -> Result<ApiResponse<Value>, AppError> {
    let video_id = parse_id(&video_id, "video")?;
    let video = ensure_owner(inner.store.find_video(video_id).await?, claims.sub, "Video")?;

    if !inner.store.delete_video(video_id).await? {
        return Err(AppError::NotFound("Video not found".to_string()));
    }

    let assets = [
        (&video.video_file.public_id, AssetKind::Video),
        (&video.thumbnail.public_id, AssetKind::Image),
    ];
    let results = join_all(
        assets
            .iter()
            .map(|(public_id, kind)| inner.assets.delete(public_id, *kind)),
    )
    .await;
    for ((public_id, _), result) in assets.iter().zip(results) {
        if let Err(e) = result {
            tracing::warn!(public_id = %public_id, "Failed to delete video asset: {}", e);
        }
    }

    tracing::info!(video_id = %video_id, "Video deleted");
    Ok(ApiResponse::ok(json!({}), "Video deleted successfully"))
}

#[tracing::instrument(name = "Toggle publish status", skip(inner, claims), fields(user_id = %claims.sub))]
pub async fn toggle_publish_status(
    State(inner): State<InnerState>,
    Extension(claims): Extension<Claims>,
    Path(video_id): Path<String>,
) -> Result<ApiResponse<Video>, AppError> {
    let video_id = parse_id(&video_id, "video")?;
    let video = ensure_owner(inner.store.find_video(video_id).await?, claims.sub, "Video")?;

    let changes = VideoChanges {
        is_published: Some(!video.is_published),
        ..Default::default()
    };
    let video = inner
        .store
        .update_video(video_id, changes)
        .await?
        .ok_or_else(|| AppError::NotFound("Video not found".to_string()))?;

    let message = if video.is_published {
        "Video published"
    } else {
        "Video unpublished"
    };
    Ok(ApiResponse::ok(video, message))
}
