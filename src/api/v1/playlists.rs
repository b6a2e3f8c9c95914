use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::common::utils::{ensure_owner, optional_text, parse_id, required_text};
use crate::api::common::ApiResponse;
use crate::api::v1::videos::visible_video;
use crate::authentication::Claims;
use crate::errors::AppError;
use crate::models::{Playlist, PlaylistChanges, PlaylistDetail, PlaylistSummary};
use crate::InnerState;

#[derive(Debug, Deserialize)]
pub struct PlaylistRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[tracing::instrument(name = "Create playlist", skip(inner, claims, payload), fields(user_id = %claims.sub))]
pub async fn create_playlist(
    State(inner): State<InnerState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<PlaylistRequest>, JsonRejection>,
) -> Result<ApiResponse<Playlist>, AppError> {
    let Json(request) = payload?;
    let name = required_text(request.name, "name")?;
    let description = required_text(request.description, "description")?;

    let playlist = inner
        .store
        .insert_playlist(claims.sub, name, description)
        .await?;
    tracing::info!(playlist_id = %playlist.id, "Playlist created");
    Ok(ApiResponse::created(playlist, "Playlist created successfully"))
}

#[tracing::instrument(name = "List user playlists", skip(inner))]
pub async fn list_user_playlists(
    State(inner): State<InnerState>,
    Path(user_id): Path<String>,
) -> Result<ApiResponse<Vec<PlaylistSummary>>, AppError> {
    let user_id = parse_id(&user_id, "user")?;
    if inner.store.find_user(user_id).await?.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    let playlists = inner.store.list_playlists_by_owner(user_id).await?;
    Ok(ApiResponse::ok(playlists, "Playlists fetched successfully"))
}

#[tracing::instrument(name = "Get playlist", skip(inner))]
pub async fn get_playlist(
    State(inner): State<InnerState>,
    Path(playlist_id): Path<String>,
) -> Result<ApiResponse<PlaylistDetail>, AppError> {
    let playlist_id = parse_id(&playlist_id, "playlist")?;
    let playlist = inner
        .store
        .find_playlist(playlist_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Playlist not found".to_string()))?;
    let videos = inner.store.playlist_videos(playlist_id).await?;

    Ok(ApiResponse::ok(
        PlaylistDetail { playlist, videos },
        "Playlist fetched successfully",
    ))
}

#[tracing::instrument(name = "Add video to playlist", skip(inner, claims), fields(user_id = %claims.sub))]
pub async fn add_video_to_playlist(
    State(inner): State<InnerState>,
    Extension(claims): Extension<Claims>,
    Path((video_id, playlist_id)): Path<(String, String)>,
) -> Result<ApiResponse<PlaylistDetail>, AppError> {
    let video_id = parse_id(&video_id, "video")?;
    let playlist_id = parse_id(&playlist_id, "playlist")?;

    let playlist = ensure_owner(
        inner.store.find_playlist(playlist_id).await?,
        claims.sub,
        "Playlist",
    )?;
    visible_video(&inner, video_id, Some(claims.sub)).await?;

    inner
        .store
        .add_video_to_playlist(playlist_id, video_id)
        .await?;
    let videos = inner.store.playlist_videos(playlist_id).await?;
    Ok(ApiResponse::ok(
        PlaylistDetail { playlist, videos },
        "Video added to playlist",
    ))
}

#[tracing::instrument(name = "Remove video from playlist", skip(inner, claims), fields(user_id = %claims.sub))]
pub async fn remove_video_from_playlist(
    State(inner): State<InnerState>,
    Extension(claims): Extension<Claims>,
    Path((video_id, playlist_id)): Path<(String, String)>,
) -> Result<ApiResponse<PlaylistDetail>, AppError> {
    let video_id = parse_id(&video_id, "video")?;
    let playlist_id = parse_id(&playlist_id, "playlist")?;

    let playlist = ensure_owner(
        inner.store.find_playlist(playlist_id).await?,
        claims.sub,
        "Playlist",
    )?;
    if !inner
        .store
        .remove_video_from_playlist(playlist_id, video_id)
        .await?
    {
        return Err(AppError::NotFound(
            "Video is not in the playlist".to_string(),
        ));
    }

    let videos = inner.store.playlist_videos(playlist_id).await?;
    Ok(ApiResponse::ok(
        PlaylistDetail { playlist, videos },
        "Video removed from playlist",
    ))
}

#[tracing::instrument(name = "Update playlist", skip(inner, claims, payload), fields(user_id = %claims.sub))]
pub async fn update_playlist(
    State(inner): State<InnerState>,
    Extension(claims): Extension<Claims>,
    Path(playlist_id): Path<String>,
    payload: Result<Json<PlaylistRequest>, JsonRejection>,
) -> Result<ApiResponse<Playlist>, AppError> {
    let playlist_id = parse_id(&playlist_id, "playlist")?;
    let Json(request) = payload?;
    let changes = PlaylistChanges {
        name: optional_text(request.name),
        description: optional_text(request.description),
    };
    if changes.name.is_none() && changes.description.is_none() {
        return Err(AppError::InvalidArgument(
            "name or description is required".to_string(),
        ));
    }

    ensure_owner(
        inner.store.find_playlist(playlist_id).await?,
        claims.sub,
        "Playlist",
    )?;
    let playlist = inner
        .store
        .update_playlist(playlist_id, changes)
        .await?
        .ok_or_else(|| AppError::NotFound("Playlist not found".to_string()))?;
    Ok(ApiResponse::ok(playlist, "Playlist updated successfully"))
}

#[tracing::instrument(name = "Delete playlist", skip(inner, claims), fields(user_id = %claims.sub))]
pub async fn delete_playlist(
    State(inner): State<InnerState>,
    Extension(claims): Extension<Claims>,
    Path(playlist_id): Path<String>,
) -> Result<ApiResponse<Value>, AppError> {
    let playlist_id = parse_id(&playlist_id, "playlist")?;
    ensure_owner(
        inner.store.find_playlist(playlist_id).await?,
        claims.sub,
        "Playlist",
    )?;

    if !inner.store.delete_playlist(playlist_id).await? {
        return Err(AppError::NotFound("Playlist not found".to_string()));
    }
    Ok(ApiResponse::ok(json!({}), "Playlist deleted successfully"))
}
