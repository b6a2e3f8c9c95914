use axum::extract::{Path, State};
use axum::Extension;
use serde::Serialize;

use crate::api::common::utils::parse_id;
use crate::api::common::ApiResponse;
use crate::authentication::Claims;
use crate::errors::AppError;
use crate::models::{ChannelProfile, SubscriberEntry, Subscription};
use crate::InnerState;

#[derive(Debug, Serialize)]
pub struct SubscriptionToggle {
    pub subscribed: bool,
    pub subscription: Subscription,
}

#[tracing::instrument(name = "Toggle subscription", skip(inner, claims), fields(user_id = %claims.sub))]
pub async fn toggle_subscription(
    State(inner): State<InnerState>,
    Extension(claims): Extension<Claims>,
    Path(channel_id): Path<String>,
) -> Result<ApiResponse<SubscriptionToggle>, AppError> {
    let channel_id = parse_id(&channel_id, "channel")?;
    if channel_id == claims.sub {
        return Err(AppError::InvalidArgument(
            "You cannot subscribe to your own channel".to_string(),
        ));
    }
    if inner.store.find_user(channel_id).await?.is_none() {
        return Err(AppError::NotFound("Channel not found".to_string()));
    }

    let toggled = inner
        .store
        .toggle_subscription(claims.sub, channel_id)
        .await?;
    let subscribed = toggled.is_created();
    tracing::info!(channel_id = %channel_id, subscribed, "Subscription toggled");

    let message = if subscribed {
        "Subscribed successfully"
    } else {
        "Unsubscribed successfully"
    };
    Ok(ApiResponse::ok(
        SubscriptionToggle {
            subscribed,
            subscription: toggled.into_inner(),
        },
        message,
    ))
}

#[tracing::instrument(name = "Channel subscribers", skip(inner))]
pub async fn channel_subscribers(
    State(inner): State<InnerState>,
    Path(channel_id): Path<String>,
) -> Result<ApiResponse<Vec<SubscriberEntry>>, AppError> {
    let channel_id = parse_id(&channel_id, "channel")?;
    if inner.store.find_user(channel_id).await?.is_none() {
        return Err(AppError::NotFound("Channel not found".to_string()));
    }
    let subscribers = inner.store.channel_subscribers(channel_id).await?;
    Ok(ApiResponse::ok(
        subscribers,
        "Subscribers fetched successfully",
    ))
}

#[tracing::instrument(name = "Subscribed channels", skip(inner))]
pub async fn subscribed_channels(
    State(inner): State<InnerState>,
    Path(subscriber_id): Path<String>,
) -> Result<ApiResponse<Vec<ChannelProfile>>, AppError> {
    let subscriber_id = parse_id(&subscriber_id, "subscriber")?;
    if inner.store.find_user(subscriber_id).await?.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    let channels = inner.store.subscribed_channels(subscriber_id).await?;
    Ok(ApiResponse::ok(
        channels,
        "Subscribed channels fetched successfully",
    ))
}
