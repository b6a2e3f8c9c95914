use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use crate::models::UserProfile;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tweet {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TweetWithOwner {
    #[serde(flatten)]
    pub tweet: Tweet,
    pub owner: UserProfile,
}

impl<'r> FromRow<'r, PgRow> for TweetWithOwner {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            tweet: Tweet::from_row(row)?,
            owner: UserProfile {
                id: row.try_get("owner_id")?,
                username: row.try_get("owner_username")?,
                full_name: row.try_get("owner_full_name")?,
                avatar: row.try_get("owner_avatar")?,
            },
        })
    }
}
