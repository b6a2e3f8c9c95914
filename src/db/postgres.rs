use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{
    CommentRepo, CommentSortField, LikeRepo, PageRequest, PlaylistRepo, ReadModelRepo, Store,
    StoreResult, SubscriptionRepo, TweetRepo, UserRepo, VideoRepo, VideoSortField,
};
use crate::errors::AppError;
use crate::models::{
    ChannelProfile, ChannelStats, ChannelVideo, Comment, CommentWithOwner, Like, LikeTarget,
    LikedVideo, NewUser, NewVideo, Playlist, PlaylistChanges, PlaylistSummary, SubscriberEntry,
    Subscription, Toggled, Tweet, TweetWithOwner, User, Video, VideoChanges, VideoFilter,
    VideoSummary,
};

const VIDEO_SUMMARY_COLUMNS: &str =
    "v.id, v.owner_id, v.title, v.thumbnail_url AS thumbnail, v.duration, v.views";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    query_timeout: Duration,
}

impl PgStore {
    #[tracing::instrument(name = "Connect to Postgres", skip(database_url))]
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        query_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(query_timeout)
            .connect(database_url)
            .await?;
        Ok(Self::from_pool(pool, query_timeout))
    }

    pub fn from_pool(pool: PgPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Runs a query under the configured timeout, logging failures with `label`.
    async fn timed<T, F>(&self, label: &str, fut: F) -> StoreResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.query_timeout, fut).await {
            Ok(Ok(res)) => Ok(res),
            Ok(Err(e)) => {
                tracing::error!("{}: Database error: {:?}", label, e);
                Err(AppError::from(e))
            }
            Err(elapsed) => {
                tracing::error!(
                    "{}: Timeout elapsed after {:?}",
                    label,
                    self.query_timeout
                );
                Err(AppError::from(elapsed))
            }
        }
    }
}

fn conflict_as(message: &str) -> impl FnOnce(AppError) -> AppError + '_ {
    move |err| match err {
        AppError::Conflict(_) => AppError::Conflict(message.to_string()),
        other => other,
    }
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn push_video_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &VideoFilter) {
    builder.push(" WHERE TRUE");
    if filter.published_only {
        builder.push(" AND v.is_published");
    }
    if let Some(owner_id) = filter.owner_id {
        builder.push(" AND v.owner_id = ");
        builder.push_bind(owner_id);
    }
    if let Some(needle) = &filter.title_contains {
        builder.push(" AND v.title ILIKE ");
        builder.push_bind(format!("%{}%", escape_like(needle)));
    }
}

fn push_page<F>(builder: &mut QueryBuilder<'_, Postgres>, column: &str, page: &PageRequest<F>) {
    builder.push(format!(" ORDER BY {} {}, id", column, page.order.sql()));
    builder.push(" LIMIT ");
    builder.push_bind(i64::from(page.limit));
    builder.push(" OFFSET ");
    builder.push_bind(page.offset() as i64);
}

#[async_trait]
impl UserRepo for PgStore {
    async fn insert_user(&self, new_user: NewUser) -> StoreResult<User> {
        let (cover_id, cover_url) = match new_user.cover_image {
            Some(cover) => (Some(cover.public_id), Some(cover.url)),
            None => (None, None),
        };
        self.timed(
            "insert_user",
            sqlx::query_as::<_, User>(
                r#"INSERT INTO users (id, username, email, full_name, avatar_public_id, avatar_url,
                       cover_image_public_id, cover_image_url, password_hash)
                   VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                   RETURNING *"#,
            )
            .bind(Uuid::new_v4())
            .bind(&new_user.username)
            .bind(&new_user.email)
            .bind(&new_user.full_name)
            .bind(&new_user.avatar.public_id)
            .bind(&new_user.avatar.url)
            .bind(cover_id)
            .bind(cover_url)
            .bind(&new_user.password_hash)
            .fetch_one(&self.pool),
        )
        .await
        .map_err(conflict_as("User with email or username already exists"))
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.timed(
            "find_user",
            sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE id = $1"#)
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn find_user_by_handle(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> StoreResult<Option<User>> {
        self.timed(
            "find_user_by_handle",
            sqlx::query_as::<_, User>(
                r#"SELECT * FROM users
                   WHERE ($1::TEXT IS NOT NULL AND username = $1)
                      OR ($2::TEXT IS NOT NULL AND LOWER(email) = LOWER($2))
                   LIMIT 1"#,
            )
            .bind(username)
            .bind(email)
            .fetch_optional(&self.pool),
        )
        .await
    }

    async fn set_refresh_token(&self, id: Uuid, token: Option<String>) -> StoreResult<()> {
        self.timed(
            "set_refresh_token",
            sqlx::query(
                r#"UPDATE users SET refresh_token = $2, updated_at = NOW() WHERE id = $1"#,
            )
            .bind(id)
            .bind(token)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl VideoRepo for PgStore {
    async fn insert_video(&self, new_video: NewVideo) -> StoreResult<Video> {
        self.timed(
            "insert_video",
            sqlx::query_as::<_, Video>(
                r#"INSERT INTO videos (id, owner_id, title, description, duration,
                       video_public_id, video_url, thumbnail_public_id, thumbnail_url)
                   VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                   RETURNING *"#,
            )
            .bind(Uuid::new_v4())
            .bind(new_video.owner_id)
            .bind(&new_video.title)
            .bind(&new_video.description)
            .bind(new_video.duration)
            .bind(&new_video.video_file.public_id)
            .bind(&new_video.video_file.url)
            .bind(&new_video.thumbnail.public_id)
            .bind(&new_video.thumbnail.url)
            .fetch_one(&self.pool),
        )
        .await
    }

    async fn find_video(&self, id: Uuid) -> StoreResult<Option<Video>> {
        self.timed(
            "find_video",
            sqlx::query_as::<_, Video>(r#"SELECT * FROM videos WHERE id = $1"#)
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn record_view(&self, id: Uuid) -> StoreResult<Option<Video>> {
        self.timed(
            "record_view",
            sqlx::query_as::<_, Video>(
                r#"UPDATE videos SET views = views + 1 WHERE id = $1 RETURNING *"#,
            )
            .bind(id)
            .fetch_optional(&self.pool),
        )
        .await
    }

    async fn list_videos(
        &self,
        filter: &VideoFilter,
        page: &PageRequest<VideoSortField>,
    ) -> StoreResult<(Vec<Video>, u64)> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT v.* FROM videos v");
        push_video_filter(&mut builder, filter);
        push_page(&mut builder, page.sort_by.column(), page);
        let videos = self
            .timed(
                "list_videos",
                builder.build_query_as::<Video>().fetch_all(&self.pool),
            )
            .await?;

        let mut count_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM videos v");
        push_video_filter(&mut count_builder, filter);
        let total: i64 = self
            .timed(
                "list_videos: total_count",
                count_builder.build_query_scalar::<i64>().fetch_one(&self.pool),
            )
            .await?;

        Ok((videos, total.max(0) as u64))
    }

    async fn update_video(&self, id: Uuid, changes: VideoChanges) -> StoreResult<Option<Video>> {
        let (thumbnail_id, thumbnail_url) = match changes.thumbnail {
            Some(thumbnail) => (Some(thumbnail.public_id), Some(thumbnail.url)),
            None => (None, None),
        };
        self.timed(
            "update_video",
            sqlx::query_as::<_, Video>(
                r#"UPDATE videos SET
                       title = COALESCE($2, title),
                       description = COALESCE($3, description),
                       thumbnail_public_id = COALESCE($4, thumbnail_public_id),
                       thumbnail_url = COALESCE($5, thumbnail_url),
                       is_published = COALESCE($6, is_published),
                       updated_at = NOW()
                   WHERE id = $1
                   RETURNING *"#,
            )
            .bind(id)
            .bind(changes.title)
            .bind(changes.description)
            .bind(thumbnail_id)
            .bind(thumbnail_url)
            .bind(changes.is_published)
            .fetch_optional(&self.pool),
        )
        .await
    }

    async fn delete_video(&self, id: Uuid) -> StoreResult<bool> {
        // comments, likes and playlist entries go with it through ON DELETE CASCADE
        let result = self
            .timed(
                "delete_video",
                sqlx::query(r#"DELETE FROM videos WHERE id = $1"#)
                    .bind(id)
                    .execute(&self.pool),
            )
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CommentRepo for PgStore {
    async fn insert_comment(
        &self,
        video_id: Uuid,
        owner_id: Uuid,
        content: String,
    ) -> StoreResult<Comment> {
        self.timed(
            "insert_comment",
            sqlx::query_as::<_, Comment>(
                r#"INSERT INTO comments (id, video_id, owner_id, content)
                   VALUES ($1, $2, $3, $4)
                   RETURNING *"#,
            )
            .bind(Uuid::new_v4())
            .bind(video_id)
            .bind(owner_id)
            .bind(content)
            .fetch_one(&self.pool),
        )
        .await
    }

    async fn find_comment(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        self.timed(
            "find_comment",
            sqlx::query_as::<_, Comment>(r#"SELECT * FROM comments WHERE id = $1"#)
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn list_comments(
        &self,
        video_id: Uuid,
        page: &PageRequest<CommentSortField>,
    ) -> StoreResult<(Vec<CommentWithOwner>, u64)> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"SELECT * FROM (
                   SELECT c.*, u.username AS owner_username, u.full_name AS owner_full_name,
                          u.avatar_url AS owner_avatar
                   FROM comments c
                   INNER JOIN users u ON u.id = c.owner_id
                   WHERE c.video_id = "#,
        );
        builder.push_bind(video_id);
        builder.push(") AS video_comments");
        push_page(&mut builder, page.sort_by.column(), page);
        let comments = self
            .timed(
                "list_comments",
                builder
                    .build_query_as::<CommentWithOwner>()
                    .fetch_all(&self.pool),
            )
            .await?;

        let total: i64 = self
            .timed(
                "list_comments: total_count",
                sqlx::query_scalar::<_, i64>(
                    r#"SELECT COUNT(*) FROM comments c
                       INNER JOIN users u ON u.id = c.owner_id
                       WHERE c.video_id = $1"#,
                )
                .bind(video_id)
                .fetch_one(&self.pool),
            )
            .await?;

        Ok((comments, total.max(0) as u64))
    }

    async fn update_comment(&self, id: Uuid, content: String) -> StoreResult<Option<Comment>> {
        self.timed(
            "update_comment",
            sqlx::query_as::<_, Comment>(
                r#"UPDATE comments SET content = $2, updated_at = NOW() WHERE id = $1 RETURNING *"#,
            )
            .bind(id)
            .bind(content)
            .fetch_optional(&self.pool),
        )
        .await
    }

    async fn delete_comment(&self, id: Uuid) -> StoreResult<bool> {
        let result = self
            .timed(
                "delete_comment",
                sqlx::query(r#"DELETE FROM comments WHERE id = $1"#)
                    .bind(id)
                    .execute(&self.pool),
            )
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl TweetRepo for PgStore {
    async fn insert_tweet(&self, owner_id: Uuid, content: String) -> StoreResult<Tweet> {
        self.timed(
            "insert_tweet",
            sqlx::query_as::<_, Tweet>(
                r#"INSERT INTO tweets (id, owner_id, content) VALUES ($1, $2, $3) RETURNING *"#,
            )
            .bind(Uuid::new_v4())
            .bind(owner_id)
            .bind(content)
            .fetch_one(&self.pool),
        )
        .await
    }

    async fn find_tweet(&self, id: Uuid) -> StoreResult<Option<Tweet>> {
        self.timed(
            "find_tweet",
            sqlx::query_as::<_, Tweet>(r#"SELECT * FROM tweets WHERE id = $1"#)
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn list_tweets_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<TweetWithOwner>> {
        self.timed(
            "list_tweets_by_owner",
            sqlx::query_as::<_, TweetWithOwner>(
                r#"SELECT t.*, u.username AS owner_username, u.full_name AS owner_full_name,
                          u.avatar_url AS owner_avatar
                   FROM tweets t
                   INNER JOIN users u ON u.id = t.owner_id
                   WHERE t.owner_id = $1
                   ORDER BY t.created_at DESC"#,
            )
            .bind(owner_id)
            .fetch_all(&self.pool),
        )
        .await
    }

    async fn update_tweet(&self, id: Uuid, content: String) -> StoreResult<Option<Tweet>> {
        self.timed(
            "update_tweet",
            sqlx::query_as::<_, Tweet>(
                r#"UPDATE tweets SET content = $2, updated_at = NOW() WHERE id = $1 RETURNING *"#,
            )
            .bind(id)
            .bind(content)
            .fetch_optional(&self.pool),
        )
        .await
    }

    async fn delete_tweet(&self, id: Uuid) -> StoreResult<bool> {
        let result = self
            .timed(
                "delete_tweet",
                sqlx::query(r#"DELETE FROM tweets WHERE id = $1"#)
                    .bind(id)
                    .execute(&self.pool),
            )
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PlaylistRepo for PgStore {
    async fn insert_playlist(
        &self,
        owner_id: Uuid,
        name: String,
        description: String,
    ) -> StoreResult<Playlist> {
        self.timed(
            "insert_playlist",
            sqlx::query_as::<_, Playlist>(
                r#"INSERT INTO playlists (id, owner_id, name, description)
                   VALUES ($1, $2, $3, $4)
                   RETURNING *"#,
            )
            .bind(Uuid::new_v4())
            .bind(owner_id)
            .bind(name)
            .bind(description)
            .fetch_one(&self.pool),
        )
        .await
        .map_err(conflict_as("Playlist with this name already exists"))
    }

    async fn find_playlist(&self, id: Uuid) -> StoreResult<Option<Playlist>> {
        self.timed(
            "find_playlist",
            sqlx::query_as::<_, Playlist>(r#"SELECT * FROM playlists WHERE id = $1"#)
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn list_playlists_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<PlaylistSummary>> {
        self.timed(
            "list_playlists_by_owner",
            sqlx::query_as::<_, PlaylistSummary>(
                r#"SELECT p.*, COUNT(pv.video_id) AS video_count
                   FROM playlists p
                   LEFT JOIN playlist_videos pv ON pv.playlist_id = p.id
                   WHERE p.owner_id = $1
                   GROUP BY p.id
                   ORDER BY p.created_at"#,
            )
            .bind(owner_id)
            .fetch_all(&self.pool),
        )
        .await
    }

    async fn playlist_videos(&self, playlist_id: Uuid) -> StoreResult<Vec<VideoSummary>> {
        let sql = format!(
            r#"SELECT {}
               FROM playlist_videos pv
               INNER JOIN videos v ON v.id = pv.video_id
               WHERE pv.playlist_id = $1
               ORDER BY pv.position"#,
            VIDEO_SUMMARY_COLUMNS
        );
        self.timed(
            "playlist_videos",
            sqlx::query_as::<_, VideoSummary>(&sql)
                .bind(playlist_id)
                .fetch_all(&self.pool),
        )
        .await
    }

    async fn update_playlist(
        &self,
        id: Uuid,
        changes: PlaylistChanges,
    ) -> StoreResult<Option<Playlist>> {
        self.timed(
            "update_playlist",
            sqlx::query_as::<_, Playlist>(
                r#"UPDATE playlists SET
                       name = COALESCE($2, name),
                       description = COALESCE($3, description),
                       updated_at = NOW()
                   WHERE id = $1
                   RETURNING *"#,
            )
            .bind(id)
            .bind(changes.name)
            .bind(changes.description)
            .fetch_optional(&self.pool),
        )
        .await
        .map_err(conflict_as("Playlist with this name already exists"))
    }

    async fn delete_playlist(&self, id: Uuid) -> StoreResult<bool> {
        let result = self
            .timed(
                "delete_playlist",
                sqlx::query(r#"DELETE FROM playlists WHERE id = $1"#)
                    .bind(id)
                    .execute(&self.pool),
            )
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_video_to_playlist(&self, playlist_id: Uuid, video_id: Uuid) -> StoreResult<()> {
        self.timed(
            "add_video_to_playlist",
            sqlx::query(
                r#"WITH added AS (
                       INSERT INTO playlist_videos (playlist_id, video_id)
                       VALUES ($1, $2)
                       RETURNING playlist_id
                   )
                   UPDATE playlists SET updated_at = NOW()
                   WHERE id IN (SELECT playlist_id FROM added)"#,
            )
            .bind(playlist_id)
            .bind(video_id)
            .execute(&self.pool),
        )
        .await
        .map_err(conflict_as("Video is already in the playlist"))?;
        Ok(())
    }

    async fn remove_video_from_playlist(
        &self,
        playlist_id: Uuid,
        video_id: Uuid,
    ) -> StoreResult<bool> {
        let result = self
            .timed(
                "remove_video_from_playlist",
                sqlx::query(
                    r#"WITH removed AS (
                           DELETE FROM playlist_videos
                           WHERE playlist_id = $1 AND video_id = $2
                           RETURNING playlist_id
                       )
                       UPDATE playlists SET updated_at = NOW()
                       WHERE id IN (SELECT playlist_id FROM removed)"#,
                )
                .bind(playlist_id)
                .bind(video_id)
                .execute(&self.pool),
            )
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Statements of a like toggle. `insert` yields no row when a concurrent
/// toggle already created the edge; `existing` then fetches that edge.
struct LikeToggleSql {
    delete: String,
    insert: String,
    existing: String,
}

impl LikeToggleSql {
    fn for_target(target: LikeTarget) -> Self {
        let column = target.column();
        Self {
            delete: format!(
                "DELETE FROM likes WHERE liked_by = $1 AND {} = $2 RETURNING *",
                column
            ),
            insert: format!(
                "INSERT INTO likes (id, {}, liked_by) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING RETURNING *",
                column
            ),
            existing: format!(
                "SELECT * FROM likes WHERE liked_by = $1 AND {} = $2",
                column
            ),
        }
    }
}

const SUBSCRIPTION_DELETE_SQL: &str =
    "DELETE FROM subscriptions WHERE subscriber_id = $1 AND channel_id = $2 RETURNING *";
const SUBSCRIPTION_INSERT_SQL: &str = "INSERT INTO subscriptions (id, subscriber_id, channel_id) \
     VALUES ($1, $2, $3) ON CONFLICT (subscriber_id, channel_id) DO NOTHING RETURNING *";
const SUBSCRIPTION_EXISTING_SQL: &str =
    "SELECT * FROM subscriptions WHERE subscriber_id = $1 AND channel_id = $2";

#[async_trait]
impl LikeRepo for PgStore {
    async fn toggle_like(&self, liked_by: Uuid, target: LikeTarget) -> StoreResult<Toggled<Like>> {
        let sql = LikeToggleSql::for_target(target);

        let removed = self
            .timed(
                "toggle_like: delete",
                sqlx::query_as::<_, Like>(&sql.delete)
                    .bind(liked_by)
                    .bind(target.id())
                    .fetch_optional(&self.pool),
            )
            .await?;
        if let Some(like) = removed {
            return Ok(Toggled::Removed(like));
        }

        // A concurrent toggle may win the insert; the unique index keeps one edge
        let created = self
            .timed(
                "toggle_like: insert",
                sqlx::query_as::<_, Like>(&sql.insert)
                    .bind(Uuid::new_v4())
                    .bind(target.id())
                    .bind(liked_by)
                    .fetch_optional(&self.pool),
            )
            .await?;
        if let Some(like) = created {
            return Ok(Toggled::Created(like));
        }

        let existing = self
            .timed(
                "toggle_like: existing",
                sqlx::query_as::<_, Like>(&sql.existing)
                    .bind(liked_by)
                    .bind(target.id())
                    .fetch_one(&self.pool),
            )
            .await?;
        Ok(Toggled::Created(existing))
    }

    async fn count_likes(&self, target: LikeTarget) -> StoreResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM likes WHERE {} = $1", target.column());
        self.timed(
            "count_likes",
            sqlx::query_scalar::<_, i64>(&sql)
                .bind(target.id())
                .fetch_one(&self.pool),
        )
        .await
    }

    async fn liked_videos(&self, liked_by: Uuid) -> StoreResult<Vec<LikedVideo>> {
        let sql = format!(
            r#"SELECT l.id AS like_id, l.created_at AS liked_at, {}
               FROM likes l
               INNER JOIN videos v ON v.id = l.video_id
               WHERE l.liked_by = $1
               ORDER BY l.created_at DESC"#,
            VIDEO_SUMMARY_COLUMNS
        );
        self.timed(
            "liked_videos",
            sqlx::query_as::<_, LikedVideo>(&sql)
                .bind(liked_by)
                .fetch_all(&self.pool),
        )
        .await
    }
}

#[async_trait]
impl SubscriptionRepo for PgStore {
    async fn toggle_subscription(
        &self,
        subscriber_id: Uuid,
        channel_id: Uuid,
    ) -> StoreResult<Toggled<Subscription>> {
        let removed = self
            .timed(
                "toggle_subscription: delete",
                sqlx::query_as::<_, Subscription>(SUBSCRIPTION_DELETE_SQL)
                .bind(subscriber_id)
                .bind(channel_id)
                .fetch_optional(&self.pool),
            )
            .await?;
        if let Some(subscription) = removed {
            return Ok(Toggled::Removed(subscription));
        }

        let created = self
            .timed(
                "toggle_subscription: insert",
                sqlx::query_as::<_, Subscription>(SUBSCRIPTION_INSERT_SQL)
                .bind(Uuid::new_v4())
                .bind(subscriber_id)
                .bind(channel_id)
                .fetch_optional(&self.pool),
            )
            .await?;
        if let Some(subscription) = created {
            return Ok(Toggled::Created(subscription));
        }

        let existing = self
            .timed(
                "toggle_subscription: existing",
                sqlx::query_as::<_, Subscription>(SUBSCRIPTION_EXISTING_SQL)
                .bind(subscriber_id)
                .bind(channel_id)
                .fetch_one(&self.pool),
            )
            .await?;
        Ok(Toggled::Created(existing))
    }
}

#[async_trait]
impl ReadModelRepo for PgStore {
    async fn channel_stats(&self, owner_id: Uuid) -> StoreResult<ChannelStats> {
        self.timed(
            "channel_stats",
            sqlx::query_as::<_, ChannelStats>(
                r#"SELECT
                       (SELECT COUNT(*) FROM videos WHERE owner_id = $1) AS video_count,
                       (SELECT COUNT(*) FROM subscriptions WHERE channel_id = $1) AS subscriber_count,
                       (SELECT COUNT(*) FROM likes l
                            INNER JOIN videos v ON v.id = l.video_id
                            WHERE v.owner_id = $1) AS like_count,
                       (SELECT COALESCE(SUM(views), 0)::BIGINT FROM videos WHERE owner_id = $1) AS view_sum"#,
            )
            .bind(owner_id)
            .fetch_one(&self.pool),
        )
        .await
    }

    async fn channel_videos(
        &self,
        owner_id: Uuid,
        page: &PageRequest<VideoSortField>,
    ) -> StoreResult<(Vec<ChannelVideo>, u64)> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"SELECT * FROM (
                   SELECT v.*, lk.like_count, lk.liker_names, cm.comment_count, cm.commenter_profiles
                   FROM videos v
                   LEFT JOIN LATERAL (
                       SELECT COUNT(*) AS like_count,
                              COALESCE(ARRAY_AGG(u.full_name ORDER BY l.created_at), '{}'::TEXT[]) AS liker_names
                       FROM likes l
                       INNER JOIN users u ON u.id = l.liked_by
                       WHERE l.video_id = v.id
                   ) lk ON TRUE
                   LEFT JOIN LATERAL (
                       SELECT COUNT(*) AS comment_count,
                              COALESCE(
                                  JSONB_AGG(
                                      JSONB_BUILD_OBJECT('fullName', u.full_name, 'avatar', u.avatar_url)
                                      ORDER BY c.created_at
                                  ),
                                  '[]'::JSONB
                              ) AS commenter_profiles
                       FROM comments c
                       INNER JOIN users u ON u.id = c.owner_id
                       WHERE c.video_id = v.id
                   ) cm ON TRUE
                   WHERE v.owner_id = "#,
        );
        builder.push_bind(owner_id);
        builder.push(") AS channel_videos");
        push_page(&mut builder, page.sort_by.column(), page);
        let videos = self
            .timed(
                "channel_videos",
                builder.build_query_as::<ChannelVideo>().fetch_all(&self.pool),
            )
            .await?;

        let total: i64 = self
            .timed(
                "channel_videos: total_count",
                sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM videos WHERE owner_id = $1"#)
                    .bind(owner_id)
                    .fetch_one(&self.pool),
            )
            .await?;

        Ok((videos, total.max(0) as u64))
    }

    async fn channel_subscribers(&self, channel_id: Uuid) -> StoreResult<Vec<SubscriberEntry>> {
        self.timed(
            "channel_subscribers",
            sqlx::query_as::<_, SubscriberEntry>(
                r#"SELECT s.id AS edge_id, u.id AS subscriber_id, u.username, u.avatar_url AS avatar
                   FROM subscriptions s
                   INNER JOIN users u ON u.id = s.subscriber_id
                   WHERE s.channel_id = $1
                   ORDER BY s.created_at"#,
            )
            .bind(channel_id)
            .fetch_all(&self.pool),
        )
        .await
    }

    async fn subscribed_channels(&self, subscriber_id: Uuid) -> StoreResult<Vec<ChannelProfile>> {
        self.timed(
            "subscribed_channels",
            sqlx::query_as::<_, ChannelProfile>(
                r#"SELECT u.id, u.username, u.full_name, u.avatar_url AS avatar
                   FROM subscriptions s
                   INNER JOIN users u ON u.id = s.channel_id
                   WHERE s.subscriber_id = $1
                   ORDER BY s.created_at"#,
            )
            .bind(subscriber_id)
            .fetch_all(&self.pool),
        )
        .await
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> StoreResult<()> {
        self.timed("health_check", sqlx::query("SELECT 1").execute(&self.pool))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SortOrder;

    #[test]
    fn like_patterns_are_escaped() {
        assert_eq!(escape_like("100%_done\\"), "100\\%\\_done\\\\");
    }

    #[test]
    fn listing_sql_only_contains_whitelisted_columns() {
        let filter = VideoFilter {
            owner_id: Some(Uuid::nil()),
            title_contains: Some("rust".into()),
            published_only: true,
        };
        let page = PageRequest::new(2, 5, VideoSortField::Views, SortOrder::Asc);
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT v.* FROM videos v");
        push_video_filter(&mut builder, &filter);
        push_page(&mut builder, page.sort_by.column(), &page);

        assert_eq!(
            builder.sql(),
            "SELECT v.* FROM videos v WHERE TRUE AND v.is_published AND v.owner_id = $1 \
             AND v.title ILIKE $2 ORDER BY views ASC, id LIMIT $3 OFFSET $4"
        );
    }

    #[test]
    fn like_toggle_statements_share_the_edge_key() {
        for target in [
            LikeTarget::Video(Uuid::nil()),
            LikeTarget::Comment(Uuid::nil()),
            LikeTarget::Tweet(Uuid::nil()),
        ] {
            let sql = LikeToggleSql::for_target(target);
            let key = format!("liked_by = $1 AND {} = $2", target.column());
            assert!(sql.delete.contains(&key));
            assert!(sql.delete.ends_with("RETURNING *"));
            assert!(sql.existing.contains(&key));
            assert!(sql.insert.contains(&format!("(id, {}, liked_by)", target.column())));
            // a lost insert race must fall through to the existing-edge lookup, not fail
            assert!(sql.insert.ends_with("ON CONFLICT DO NOTHING RETURNING *"));
        }
    }

    #[test]
    fn subscription_insert_yields_to_the_unique_edge() {
        let key = "subscriber_id = $1 AND channel_id = $2";
        assert!(SUBSCRIPTION_DELETE_SQL.contains(key));
        assert!(SUBSCRIPTION_EXISTING_SQL.contains(key));
        assert!(SUBSCRIPTION_INSERT_SQL
            .contains("ON CONFLICT (subscriber_id, channel_id) DO NOTHING RETURNING *"));
    }

    #[test]
    fn schema_backs_the_toggle_conflict_targets() {
        let schema = include_str!("../../migrations/0001_init.sql");
        assert!(schema.contains("UNIQUE (subscriber_id, channel_id)"));
        for column in ["video_id", "comment_id", "tweet_id"] {
            assert!(schema.contains(&format!(
                "ON likes (liked_by, {}) WHERE {} IS NOT NULL",
                column, column
            )));
        }
    }
}
