use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use crate::models::Asset;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub duration: f64,
    pub views: i64,
    pub is_published: bool,
    pub video_file: Asset,
    pub thumbnail: Asset,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for Video {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            duration: row.try_get("duration")?,
            views: row.try_get("views")?,
            is_published: row.try_get("is_published")?,
            video_file: Asset {
                public_id: row.try_get("video_public_id")?,
                url: row.try_get("video_url")?,
            },
            thumbnail: Asset {
                public_id: row.try_get("thumbnail_public_id")?,
                url: row.try_get("thumbnail_url")?,
            },
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewVideo {
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub duration: f64,
    pub video_file: Asset,
    pub thumbnail: Asset,
}

/// Partial update applied in a single write. `None` leaves the column as is.
#[derive(Debug, Clone, Default)]
pub struct VideoChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<Asset>,
    pub is_published: Option<bool>,
}

/// Compact projection used by playlists and liked-video listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VideoSummary {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub thumbnail: String,
    pub duration: f64,
    pub views: i64,
}

impl From<&Video> for VideoSummary {
    fn from(video: &Video) -> Self {
        Self {
            id: video.id,
            owner_id: video.owner_id,
            title: video.title.clone(),
            thumbnail: video.thumbnail.url.clone(),
            duration: video.duration,
            views: video.views,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VideoFilter {
    pub owner_id: Option<Uuid>,
    pub title_contains: Option<String>,
    pub published_only: bool,
}

impl VideoFilter {
    pub fn matches(&self, video: &Video) -> bool {
        if self.published_only && !video.is_published {
            return false;
        }
        if let Some(owner_id) = self.owner_id {
            if video.owner_id != owner_id {
                return false;
            }
        }
        match &self.title_contains {
            Some(needle) => video.title.to_lowercase().contains(&needle.to_lowercase()),
            None => true,
        }
    }
}
