//! Denormalized projections assembled by joining several stores.
//!
//! None of these are persisted; they are recomputed per request by the
//! [`ReadModelRepo`](crate::db::ReadModelRepo) implementation.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use crate::models::Video;

/// Totals for one channel. Every field is zero for a channel without videos.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStats {
    pub video_count: i64,
    pub subscriber_count: i64,
    pub like_count: i64,
    pub view_sum: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommenterProfile {
    pub full_name: String,
    pub avatar: String,
}

/// A channel video with its like and comment joins collapsed into counts and
/// name lists. The joined rows themselves are not part of the projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelVideo {
    #[serde(flatten)]
    pub video: Video,
    pub like_count: i64,
    pub liker_names: Vec<String>,
    pub comment_count: i64,
    pub commenter_profiles: Vec<CommenterProfile>,
}

impl<'r> FromRow<'r, PgRow> for ChannelVideo {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let Json(commenter_profiles): Json<Vec<CommenterProfile>> =
            row.try_get("commenter_profiles")?;
        Ok(Self {
            video: Video::from_row(row)?,
            like_count: row.try_get("like_count")?,
            liker_names: row.try_get("liker_names")?,
            comment_count: row.try_get("comment_count")?,
            commenter_profiles,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberProfile {
    pub id: Uuid,
    pub username: String,
    pub avatar: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberEntry {
    pub edge_id: Uuid,
    pub subscriber: SubscriberProfile,
}

impl<'r> FromRow<'r, PgRow> for SubscriberEntry {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            edge_id: row.try_get("edge_id")?,
            subscriber: SubscriberProfile {
                id: row.try_get("subscriber_id")?,
                username: row.try_get("username")?,
                avatar: row.try_get("avatar")?,
            },
        })
    }
}

/// Public face of a channel someone subscribed to; the edge itself is dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfile {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub avatar: String,
}
