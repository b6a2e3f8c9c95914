use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use crate::models::VideoSummary;

/// The entity a like points at. Exactly one target per like is enforced by
/// the type; in Postgres by a `num_nonnulls(...) = 1` check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeTarget {
    Video(Uuid),
    Comment(Uuid),
    Tweet(Uuid),
}

impl LikeTarget {
    pub fn id(&self) -> Uuid {
        match self {
            LikeTarget::Video(id) | LikeTarget::Comment(id) | LikeTarget::Tweet(id) => *id,
        }
    }

    /// Column in `likes` that holds this kind of target.
    pub fn column(&self) -> &'static str {
        match self {
            LikeTarget::Video(_) => "video_id",
            LikeTarget::Comment(_) => "comment_id",
            LikeTarget::Tweet(_) => "tweet_id",
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LikeTarget::Video(_) => "video",
            LikeTarget::Comment(_) => "comment",
            LikeTarget::Tweet(_) => "tweet",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    pub id: Uuid,
    #[serde(flatten)]
    pub target: LikeTarget,
    pub liked_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for Like {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let video_id: Option<Uuid> = row.try_get("video_id")?;
        let comment_id: Option<Uuid> = row.try_get("comment_id")?;
        let tweet_id: Option<Uuid> = row.try_get("tweet_id")?;

        let target = match (video_id, comment_id, tweet_id) {
            (Some(id), None, None) => LikeTarget::Video(id),
            (None, Some(id), None) => LikeTarget::Comment(id),
            (None, None, Some(id)) => LikeTarget::Tweet(id),
            _ => {
                return Err(sqlx::Error::ColumnDecode {
                    index: "video_id".to_string(),
                    source: "like row must reference exactly one target".into(),
                })
            }
        };

        Ok(Self {
            id: row.try_get("id")?,
            target,
            liked_by: row.try_get("liked_by")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikedVideo {
    pub like_id: Uuid,
    pub liked_at: DateTime<Utc>,
    pub video: VideoSummary,
}

impl<'r> FromRow<'r, PgRow> for LikedVideo {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            like_id: row.try_get("like_id")?,
            liked_at: row.try_get("liked_at")?,
            video: VideoSummary::from_row(row)?,
        })
    }
}
