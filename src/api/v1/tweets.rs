use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::common::utils::{ensure_owner, parse_id, required_text};
use crate::api::common::ApiResponse;
use crate::authentication::Claims;
use crate::errors::AppError;
use crate::models::{Tweet, TweetWithOwner};
use crate::InnerState;

#[derive(Debug, Deserialize)]
pub struct TweetRequest {
    pub content: Option<String>,
}

#[tracing::instrument(name = "Create tweet", skip(inner, claims, payload), fields(user_id = %claims.sub))]
pub async fn create_tweet(
    State(inner): State<InnerState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<TweetRequest>, JsonRejection>,
) -> Result<ApiResponse<Tweet>, AppError> {
    let Json(request) = payload?;
    let content = required_text(request.content, "content")?;
    let tweet = inner.store.insert_tweet(claims.sub, content).await?;
    Ok(ApiResponse::created(tweet, "Tweet created successfully"))
}

#[tracing::instrument(name = "List user tweets", skip(inner))]
pub async fn list_user_tweets(
    State(inner): State<InnerState>,
    Path(user_id): Path<String>,
) -> Result<ApiResponse<Vec<TweetWithOwner>>, AppError> {
    let user_id = parse_id(&user_id, "user")?;
    if inner.store.find_user(user_id).await?.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let tweets = inner.store.list_tweets_by_owner(user_id).await?;
    Ok(ApiResponse::ok(tweets, "Tweets fetched successfully"))
}

#[tracing::instrument(name = "Update tweet", skip(inner, claims, payload), fields(user_id = %claims.sub))]
pub async fn update_tweet(
    State(inner): State<InnerState>,
    Extension(claims): Extension<Claims>,
    Path(tweet_id): Path<String>,
    payload: Result<Json<TweetRequest>, JsonRejection>,
) -> Result<ApiResponse<Tweet>, AppError> {
    let tweet_id = parse_id(&tweet_id, "tweet")?;
    let Json(request) = payload?;
    let content = required_text(request.content, "content")?;

    ensure_owner(inner.store.find_tweet(tweet_id).await?, claims.sub, "Tweet")?;
    let tweet = inner
        .store
        .update_tweet(tweet_id, content)
        .await?
        .ok_or_else(|| AppError::NotFound("Tweet not found".to_string()))?;
    Ok(ApiResponse::ok(tweet, "Tweet updated successfully"))
}

#[tracing::instrument(name = "Delete tweet", skip(inner, claims), fields(user_id = %claims.sub))]
pub async fn delete_tweet(
    State(inner): State<InnerState>,
    Extension(claims): Extension<Claims>,
    Path(tweet_id): Path<String>,
) -> Result<ApiResponse<Value>, AppError> {
    let tweet_id = parse_id(&tweet_id, "tweet")?;
    ensure_owner(inner.store.find_tweet(tweet_id).await?, claims.sub, "Tweet")?;

    if !inner.store.delete_tweet(tweet_id).await? {
        return Err(AppError::NotFound("Tweet not found".to_string()));
    }
    Ok(ApiResponse::ok(json!({}), "Tweet deleted successfully"))
}
