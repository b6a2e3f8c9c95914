//! Persistence layer: repository traits plus the Postgres and in-memory stores.

pub mod memory;
pub mod postgres;
pub mod query;

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use uuid::Uuid;

use crate::config::Settings;
use crate::errors::AppError;
use crate::models::{
    ChannelProfile, ChannelStats, ChannelVideo, Comment, CommentWithOwner, LikeTarget, Like,
    LikedVideo, NewUser, NewVideo, Playlist, PlaylistChanges, PlaylistSummary, SubscriberEntry,
    Subscription, Toggled, Tweet, TweetWithOwner, User, Video, VideoChanges, VideoFilter,
    VideoSummary,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use query::{CommentSortField, PageRequest, SortOrder, VideoSortField};

pub type StoreResult<T> = Result<T, AppError>;

#[async_trait]
pub trait UserRepo {
    /// Fails with `Conflict` when the username or email is taken.
    async fn insert_user(&self, new_user: NewUser) -> StoreResult<User>;
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    /// Looks a user up by username or email, whichever is given.
    async fn find_user_by_handle(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> StoreResult<Option<User>>;
    async fn set_refresh_token(&self, id: Uuid, token: Option<String>) -> StoreResult<()>;
}

#[async_trait]
pub trait VideoRepo {
    async fn insert_video(&self, new_video: NewVideo) -> StoreResult<Video>;
    async fn find_video(&self, id: Uuid) -> StoreResult<Option<Video>>;
    /// Increments the view counter and returns the updated record.
    async fn record_view(&self, id: Uuid) -> StoreResult<Option<Video>>;
    async fn list_videos(
        &self,
        filter: &VideoFilter,
        page: &PageRequest<VideoSortField>,
    ) -> StoreResult<(Vec<Video>, u64)>;
    async fn update_video(&self, id: Uuid, changes: VideoChanges) -> StoreResult<Option<Video>>;
    /// Removes the video together with its comments, likes and playlist entries.
    async fn delete_video(&self, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait CommentRepo {
    async fn insert_comment(
        &self,
        video_id: Uuid,
        owner_id: Uuid,
        content: String,
    ) -> StoreResult<Comment>;
    async fn find_comment(&self, id: Uuid) -> StoreResult<Option<Comment>>;
    async fn list_comments(
        &self,
        video_id: Uuid,
        page: &PageRequest<CommentSortField>,
    ) -> StoreResult<(Vec<CommentWithOwner>, u64)>;
    async fn update_comment(&self, id: Uuid, content: String) -> StoreResult<Option<Comment>>;
    async fn delete_comment(&self, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait TweetRepo {
    async fn insert_tweet(&self, owner_id: Uuid, content: String) -> StoreResult<Tweet>;
    async fn find_tweet(&self, id: Uuid) -> StoreResult<Option<Tweet>>;
    async fn list_tweets_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<TweetWithOwner>>;
    async fn update_tweet(&self, id: Uuid, content: String) -> StoreResult<Option<Tweet>>;
    async fn delete_tweet(&self, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait PlaylistRepo {
    /// Fails with `Conflict` when the owner already has a playlist of that name.
    async fn insert_playlist(
        &self,
        owner_id: Uuid,
        name: String,
        description: String,
    ) -> StoreResult<Playlist>;
    async fn find_playlist(&self, id: Uuid) -> StoreResult<Option<Playlist>>;
    async fn list_playlists_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<PlaylistSummary>>;
    /// Videos of a playlist in the order they were added.
    async fn playlist_videos(&self, playlist_id: Uuid) -> StoreResult<Vec<VideoSummary>>;
    async fn update_playlist(
        &self,
        id: Uuid,
        changes: PlaylistChanges,
    ) -> StoreResult<Option<Playlist>>;
    async fn delete_playlist(&self, id: Uuid) -> StoreResult<bool>;
    /// Fails with `Conflict` when the video is already in the playlist.
    async fn add_video_to_playlist(&self, playlist_id: Uuid, video_id: Uuid) -> StoreResult<()>;
    async fn remove_video_from_playlist(
        &self,
        playlist_id: Uuid,
        video_id: Uuid,
    ) -> StoreResult<bool>;
}

#[async_trait]
pub trait LikeRepo {
    /// Removes the (liker, target) edge when present, creates it otherwise.
    async fn toggle_like(&self, liked_by: Uuid, target: LikeTarget) -> StoreResult<Toggled<Like>>;
    async fn count_likes(&self, target: LikeTarget) -> StoreResult<i64>;
    async fn liked_videos(&self, liked_by: Uuid) -> StoreResult<Vec<LikedVideo>>;
}

#[async_trait]
pub trait SubscriptionRepo {
    /// Removes the (subscriber, channel) edge when present, creates it otherwise.
    async fn toggle_subscription(
        &self,
        subscriber_id: Uuid,
        channel_id: Uuid,
    ) -> StoreResult<Toggled<Subscription>>;
}

#[async_trait]
pub trait ReadModelRepo {
    async fn channel_stats(&self, owner_id: Uuid) -> StoreResult<ChannelStats>;
    async fn channel_videos(
        &self,
        owner_id: Uuid,
        page: &PageRequest<VideoSortField>,
    ) -> StoreResult<(Vec<ChannelVideo>, u64)>;
    async fn channel_subscribers(&self, channel_id: Uuid) -> StoreResult<Vec<SubscriberEntry>>;
    async fn subscribed_channels(&self, subscriber_id: Uuid) -> StoreResult<Vec<ChannelProfile>>;
}

/// Everything the handlers need from persistence.
#[async_trait]
pub trait Store:
    UserRepo
    + VideoRepo
    + CommentRepo
    + TweetRepo
    + PlaylistRepo
    + LikeRepo
    + SubscriptionRepo
    + ReadModelRepo
    + Send
    + Sync
{
    async fn health_check(&self) -> StoreResult<()>;
}

/// Connects to Postgres when `DATABASE_URL` is configured, otherwise falls back
/// to the in-memory store.
#[tracing::instrument(name = "init_db", skip(settings))]
pub async fn init_db(settings: &Settings) -> anyhow::Result<Arc<dyn Store>> {
    match &settings.database_url {
        Some(url) => {
            tracing::info!("Connecting to Postgres");
            let store = PgStore::connect(
                url.expose_secret(),
                settings.database_max_connections,
                settings.query_timeout,
            )
            .await?;
            store.migrate().await?;
            tracing::info!("Postgres store ready");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, data will only live in memory");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
