//! In-memory store for local development and tests.
//!
//! All tables sit behind one `RwLock`, so every toggle is a single atomic
//! check-and-write. Read models are assembled by fanning out over the
//! tables and grouping in memory, mirroring the joins done in SQL by
//! [`PgStore`](super::PgStore).

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    CommentRepo, CommentSortField, LikeRepo, PageRequest, PlaylistRepo, ReadModelRepo, Store,
    StoreResult, SubscriptionRepo, TweetRepo, UserRepo, VideoRepo, VideoSortField,
};
use crate::errors::AppError;
use crate::models::{
    ChannelProfile, ChannelStats, ChannelVideo, Comment, CommentWithOwner, CommenterProfile,
    Like, LikeTarget, LikedVideo, NewUser, NewVideo, Playlist, PlaylistChanges, PlaylistSummary,
    SubscriberEntry, SubscriberProfile, Subscription, Toggled, Tweet, TweetWithOwner, User,
    UserProfile, Video, VideoChanges, VideoFilter, VideoSummary,
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    videos: Vec<Video>,
    comments: Vec<Comment>,
    tweets: Vec<Tweet>,
    playlists: Vec<Playlist>,
    /// (playlist, video) pairs in insertion order.
    playlist_entries: Vec<(Uuid, Uuid)>,
    likes: Vec<Like>,
    subscriptions: Vec<Subscription>,
}

impl Tables {
    fn user(&self, id: Uuid) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    fn video(&self, id: Uuid) -> Option<&Video> {
        self.videos.iter().find(|v| v.id == id)
    }

    fn video_mut(&mut self, id: Uuid) -> Option<&mut Video> {
        self.videos.iter_mut().find(|v| v.id == id)
    }

    fn drop_likes_on(&mut self, target: LikeTarget) {
        self.likes.retain(|like| like.target != target);
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn insert_user(&self, new_user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        let taken = tables.users.iter().any(|u| {
            u.username == new_user.username || u.email.eq_ignore_ascii_case(&new_user.email)
        });
        if taken {
            return Err(AppError::Conflict(
                "User with email or username already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            full_name: new_user.full_name,
            avatar_public_id: new_user.avatar.public_id,
            avatar_url: new_user.avatar.url,
            cover_image_public_id: new_user.cover_image.as_ref().map(|a| a.public_id.clone()),
            cover_image_url: new_user.cover_image.map(|a| a.url),
            password_hash: new_user.password_hash,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.user(id).cloned())
    }

    async fn find_user_by_handle(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| {
                username.is_some_and(|name| u.username == name)
                    || email.is_some_and(|mail| u.email.eq_ignore_ascii_case(mail))
            })
            .cloned())
    }

    async fn set_refresh_token(&self, id: Uuid, token: Option<String>) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(user) = tables.users.iter_mut().find(|u| u.id == id) {
            user.refresh_token = token;
            user.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[async_trait]
impl VideoRepo for MemoryStore {
    async fn insert_video(&self, new_video: NewVideo) -> StoreResult<Video> {
        let mut tables = self.tables.write().await;
        if tables.user(new_video.owner_id).is_none() {
            return Err(AppError::NotFound("Video owner does not exist".to_string()));
        }

        let now = Utc::now();
        let video = Video {
            id: Uuid::new_v4(),
            owner_id: new_video.owner_id,
            title: new_video.title,
            description: new_video.description,
            duration: new_video.duration,
            views: 0,
            is_published: true,
            video_file: new_video.video_file,
            thumbnail: new_video.thumbnail,
            created_at: now,
            updated_at: now,
        };
        tables.videos.push(video.clone());
        Ok(video)
    }

    async fn find_video(&self, id: Uuid) -> StoreResult<Option<Video>> {
        Ok(self.tables.read().await.video(id).cloned())
    }

    async fn record_view(&self, id: Uuid) -> StoreResult<Option<Video>> {
        let mut tables = self.tables.write().await;
        Ok(tables.video_mut(id).map(|video| {
            video.views += 1;
            video.clone()
        }))
    }

    async fn list_videos(
        &self,
        filter: &VideoFilter,
        page: &PageRequest<VideoSortField>,
    ) -> StoreResult<(Vec<Video>, u64)> {
        let tables = self.tables.read().await;
        let mut videos: Vec<Video> = tables
            .videos
            .iter()
            .filter(|v| filter.matches(v))
            .cloned()
            .collect();
        videos.sort_by(|a, b| page.order.apply(page.sort_by.compare(a, b)));
        let total = videos.len() as u64;
        Ok((page.window(videos), total))
    }

    async fn update_video(&self, id: Uuid, changes: VideoChanges) -> StoreResult<Option<Video>> {
        let mut tables = self.tables.write().await;
        Ok(tables.video_mut(id).map(|video| {
            if let Some(title) = changes.title {
                video.title = title;
            }
            if let Some(description) = changes.description {
                video.description = description;
            }
            if let Some(thumbnail) = changes.thumbnail {
                video.thumbnail = thumbnail;
            }
            if let Some(is_published) = changes.is_published {
                video.is_published = is_published;
            }
            video.updated_at = Utc::now();
            video.clone()
        }))
    }

    async fn delete_video(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.videos.len();
        tables.videos.retain(|v| v.id != id);
        if tables.videos.len() == before {
            return Ok(false);
        }

        let comment_ids: HashSet<Uuid> = tables
            .comments
            .iter()
            .filter(|c| c.video_id == id)
            .map(|c| c.id)
            .collect();
        tables.comments.retain(|c| c.video_id != id);
        tables.likes.retain(|like| match like.target {
            LikeTarget::Video(video_id) => video_id != id,
            LikeTarget::Comment(comment_id) => !comment_ids.contains(&comment_id),
            LikeTarget::Tweet(_) => true,
        });
        tables.playlist_entries.retain(|(_, video_id)| *video_id != id);
        Ok(true)
    }
}

#[async_trait]
impl CommentRepo for MemoryStore {
    async fn insert_comment(
        &self,
        video_id: Uuid,
        owner_id: Uuid,
        content: String,
    ) -> StoreResult<Comment> {
        let mut tables = self.tables.write().await;
        if tables.video(video_id).is_none() {
            return Err(AppError::NotFound("Video does not exist".to_string()));
        }

        let now = Utc::now();
        let comment = Comment {
            id: Uuid::new_v4(),
            video_id,
            owner_id,
            content,
            created_at: now,
            updated_at: now,
        };
        tables.comments.push(comment.clone());
        Ok(comment)
    }

    async fn find_comment(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        let tables = self.tables.read().await;
        Ok(tables.comments.iter().find(|c| c.id == id).cloned())
    }

    async fn list_comments(
        &self,
        video_id: Uuid,
        page: &PageRequest<CommentSortField>,
    ) -> StoreResult<(Vec<CommentWithOwner>, u64)> {
        let tables = self.tables.read().await;
        let mut comments: Vec<CommentWithOwner> = tables
            .comments
            .iter()
            .filter(|c| c.video_id == video_id)
            .filter_map(|c| {
                tables.user(c.owner_id).map(|owner| CommentWithOwner {
                    comment: c.clone(),
                    owner: UserProfile::from(owner),
                })
            })
            .collect();
        comments.sort_by(|a, b| page.order.apply(page.sort_by.compare(a, b)));
        let total = comments.len() as u64;
        Ok((page.window(comments), total))
    }

    async fn update_comment(&self, id: Uuid, content: String) -> StoreResult<Option<Comment>> {
        let mut tables = self.tables.write().await;
        Ok(tables.comments.iter_mut().find(|c| c.id == id).map(|comment| {
            comment.content = content;
            comment.updated_at = Utc::now();
            comment.clone()
        }))
    }

    async fn delete_comment(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.comments.len();
        tables.comments.retain(|c| c.id != id);
        let removed = tables.comments.len() != before;
        if removed {
            tables.drop_likes_on(LikeTarget::Comment(id));
        }
        Ok(removed)
    }
}

#[async_trait]
impl TweetRepo for MemoryStore {
    async fn insert_tweet(&self, owner_id: Uuid, content: String) -> StoreResult<Tweet> {
        let mut tables = self.tables.write().await;
        if tables.user(owner_id).is_none() {
            return Err(AppError::NotFound("Tweet owner does not exist".to_string()));
        }

        let now = Utc::now();
        let tweet = Tweet {
            id: Uuid::new_v4(),
            owner_id,
            content,
            created_at: now,
            updated_at: now,
        };
        tables.tweets.push(tweet.clone());
        Ok(tweet)
    }

    async fn find_tweet(&self, id: Uuid) -> StoreResult<Option<Tweet>> {
        let tables = self.tables.read().await;
        Ok(tables.tweets.iter().find(|t| t.id == id).cloned())
    }

    async fn list_tweets_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<TweetWithOwner>> {
        let tables = self.tables.read().await;
        let Some(owner) = tables.user(owner_id) else {
            return Ok(Vec::new());
        };
        let profile = UserProfile::from(owner);
        let mut tweets: Vec<TweetWithOwner> = tables
            .tweets
            .iter()
            .filter(|t| t.owner_id == owner_id)
            .map(|t| TweetWithOwner {
                tweet: t.clone(),
                owner: profile.clone(),
            })
            .collect();
        tweets.sort_by(|a, b| b.tweet.created_at.cmp(&a.tweet.created_at));
        Ok(tweets)
    }

    async fn update_tweet(&self, id: Uuid, content: String) -> StoreResult<Option<Tweet>> {
        let mut tables = self.tables.write().await;
        Ok(tables.tweets.iter_mut().find(|t| t.id == id).map(|tweet| {
            tweet.content = content;
            tweet.updated_at = Utc::now();
            tweet.clone()
        }))
    }

    async fn delete_tweet(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.tweets.len();
        tables.tweets.retain(|t| t.id != id);
        let removed = tables.tweets.len() != before;
        if removed {
            tables.drop_likes_on(LikeTarget::Tweet(id));
        }
        Ok(removed)
    }
}

#[async_trait]
impl PlaylistRepo for MemoryStore {
    async fn insert_playlist(
        &self,
        owner_id: Uuid,
        name: String,
        description: String,
    ) -> StoreResult<Playlist> {
        let mut tables = self.tables.write().await;
        if tables
            .playlists
            .iter()
            .any(|p| p.owner_id == owner_id && p.name == name)
        {
            return Err(AppError::Conflict(
                "Playlist with this name already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let playlist = Playlist {
            id: Uuid::new_v4(),
            owner_id,
            name,
            description,
            created_at: now,
            updated_at: now,
        };
        tables.playlists.push(playlist.clone());
        Ok(playlist)
    }

    async fn find_playlist(&self, id: Uuid) -> StoreResult<Option<Playlist>> {
        let tables = self.tables.read().await;
        Ok(tables.playlists.iter().find(|p| p.id == id).cloned())
    }

    async fn list_playlists_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<PlaylistSummary>> {
        let tables = self.tables.read().await;
        Ok(tables
            .playlists
            .iter()
            .filter(|p| p.owner_id == owner_id)
            .map(|p| PlaylistSummary {
                playlist: p.clone(),
                video_count: tables
                    .playlist_entries
                    .iter()
                    .filter(|(playlist_id, _)| *playlist_id == p.id)
                    .count() as i64,
            })
            .collect())
    }

    async fn playlist_videos(&self, playlist_id: Uuid) -> StoreResult<Vec<VideoSummary>> {
        let tables = self.tables.read().await;
        Ok(tables
            .playlist_entries
            .iter()
            .filter(|(id, _)| *id == playlist_id)
            .filter_map(|(_, video_id)| tables.video(*video_id).map(VideoSummary::from))
            .collect())
    }

    async fn update_playlist(
        &self,
        id: Uuid,
        changes: PlaylistChanges,
    ) -> StoreResult<Option<Playlist>> {
        let mut tables = self.tables.write().await;
        let Some(current) = tables.playlists.iter().find(|p| p.id == id).cloned() else {
            return Ok(None);
        };
        if let Some(name) = &changes.name {
            let clash = tables
                .playlists
                .iter()
                .any(|p| p.id != id && p.owner_id == current.owner_id && &p.name == name);
            if clash {
                return Err(AppError::Conflict(
                    "Playlist with this name already exists".to_string(),
                ));
            }
        }

        Ok(tables.playlists.iter_mut().find(|p| p.id == id).map(|playlist| {
            if let Some(name) = changes.name {
                playlist.name = name;
            }
            if let Some(description) = changes.description {
                playlist.description = description;
            }
            playlist.updated_at = Utc::now();
            playlist.clone()
        }))
    }

    async fn delete_playlist(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.playlists.len();
        tables.playlists.retain(|p| p.id != id);
        tables.playlist_entries.retain(|(playlist_id, _)| *playlist_id != id);
        Ok(tables.playlists.len() != before)
    }

    async fn add_video_to_playlist(&self, playlist_id: Uuid, video_id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .playlist_entries
            .contains(&(playlist_id, video_id))
        {
            return Err(AppError::Conflict(
                "Video is already in the playlist".to_string(),
            ));
        }
        tables.playlist_entries.push((playlist_id, video_id));
        if let Some(playlist) = tables.playlists.iter_mut().find(|p| p.id == playlist_id) {
            playlist.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn remove_video_from_playlist(
        &self,
        playlist_id: Uuid,
        video_id: Uuid,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.playlist_entries.len();
        tables
            .playlist_entries
            .retain(|entry| *entry != (playlist_id, video_id));
        let removed = tables.playlist_entries.len() != before;
        if removed {
            if let Some(playlist) = tables.playlists.iter_mut().find(|p| p.id == playlist_id) {
                playlist.updated_at = Utc::now();
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl LikeRepo for MemoryStore {
    async fn toggle_like(&self, liked_by: Uuid, target: LikeTarget) -> StoreResult<Toggled<Like>> {
        let mut tables = self.tables.write().await;
        if let Some(index) = tables
            .likes
            .iter()
            .position(|like| like.liked_by == liked_by && like.target == target)
        {
            return Ok(Toggled::Removed(tables.likes.remove(index)));
        }

        let like = Like {
            id: Uuid::new_v4(),
            target,
            liked_by,
            created_at: Utc::now(),
        };
        tables.likes.push(like.clone());
        Ok(Toggled::Created(like))
    }

    async fn count_likes(&self, target: LikeTarget) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables.likes.iter().filter(|like| like.target == target).count() as i64)
    }

    async fn liked_videos(&self, liked_by: Uuid) -> StoreResult<Vec<LikedVideo>> {
        let tables = self.tables.read().await;
        let mut liked: Vec<LikedVideo> = tables
            .likes
            .iter()
            .filter(|like| like.liked_by == liked_by)
            .filter_map(|like| match like.target {
                LikeTarget::Video(video_id) => tables.video(video_id).map(|video| LikedVideo {
                    like_id: like.id,
                    liked_at: like.created_at,
                    video: VideoSummary::from(video),
                }),
                _ => None,
            })
            .collect();
        liked.sort_by(|a, b| b.liked_at.cmp(&a.liked_at));
        Ok(liked)
    }
}

#[async_trait]
impl SubscriptionRepo for MemoryStore {
    async fn toggle_subscription(
        &self,
        subscriber_id: Uuid,
        channel_id: Uuid,
    ) -> StoreResult<Toggled<Subscription>> {
        let mut tables = self.tables.write().await;
        if let Some(index) = tables
            .subscriptions
            .iter()
            .position(|s| s.subscriber_id == subscriber_id && s.channel_id == channel_id)
        {
            return Ok(Toggled::Removed(tables.subscriptions.remove(index)));
        }

        let subscription = Subscription {
            id: Uuid::new_v4(),
            subscriber_id,
            channel_id,
            created_at: Utc::now(),
        };
        tables.subscriptions.push(subscription.clone());
        Ok(Toggled::Created(subscription))
    }
}

#[async_trait]
impl ReadModelRepo for MemoryStore {
    async fn channel_stats(&self, owner_id: Uuid) -> StoreResult<ChannelStats> {
        let tables = self.tables.read().await;
        let owned: Vec<&Video> = tables
            .videos
            .iter()
            .filter(|v| v.owner_id == owner_id)
            .collect();
        let owned_ids: HashSet<Uuid> = owned.iter().map(|v| v.id).collect();

        Ok(ChannelStats {
            video_count: owned.len() as i64,
            subscriber_count: tables
                .subscriptions
                .iter()
                .filter(|s| s.channel_id == owner_id)
                .count() as i64,
            like_count: tables
                .likes
                .iter()
                .filter(|like| matches!(like.target, LikeTarget::Video(id) if owned_ids.contains(&id)))
                .count() as i64,
            view_sum: owned.iter().map(|v| v.views).sum(),
        })
    }

    async fn channel_videos(
        &self,
        owner_id: Uuid,
        page: &PageRequest<VideoSortField>,
    ) -> StoreResult<(Vec<ChannelVideo>, u64)> {
        let tables = self.tables.read().await;
        let mut owned: Vec<&Video> = tables
            .videos
            .iter()
            .filter(|v| v.owner_id == owner_id)
            .collect();
        owned.sort_by(|a, b| page.order.apply(page.sort_by.compare(a, b)));
        let total = owned.len() as u64;

        let videos = page
            .window(owned)
            .into_iter()
            .map(|video| {
                let liker_names: Vec<String> = tables
                    .likes
                    .iter()
                    .filter(|like| like.target == LikeTarget::Video(video.id))
                    .filter_map(|like| tables.user(like.liked_by))
                    .map(|user| user.full_name.clone())
                    .collect();
                let commenter_profiles: Vec<CommenterProfile> = tables
                    .comments
                    .iter()
                    .filter(|c| c.video_id == video.id)
                    .filter_map(|c| tables.user(c.owner_id))
                    .map(|user| CommenterProfile {
                        full_name: user.full_name.clone(),
                        avatar: user.avatar_url.clone(),
                    })
                    .collect();

                ChannelVideo {
                    video: video.clone(),
                    like_count: liker_names.len() as i64,
                    liker_names,
                    comment_count: commenter_profiles.len() as i64,
                    commenter_profiles,
                }
            })
            .collect();
        Ok((videos, total))
    }

    async fn channel_subscribers(&self, channel_id: Uuid) -> StoreResult<Vec<SubscriberEntry>> {
        let tables = self.tables.read().await;
        Ok(tables
            .subscriptions
            .iter()
            .filter(|s| s.channel_id == channel_id)
            .filter_map(|s| {
                tables.user(s.subscriber_id).map(|user| SubscriberEntry {
                    edge_id: s.id,
                    subscriber: SubscriberProfile {
                        id: user.id,
                        username: user.username.clone(),
                        avatar: user.avatar_url.clone(),
                    },
                })
            })
            .collect())
    }

    async fn subscribed_channels(&self, subscriber_id: Uuid) -> StoreResult<Vec<ChannelProfile>> {
        let tables = self.tables.read().await;
        Ok(tables
            .subscriptions
            .iter()
            .filter(|s| s.subscriber_id == subscriber_id)
            .filter_map(|s| tables.user(s.channel_id))
            .map(|channel| ChannelProfile {
                id: channel.id,
                username: channel.username.clone(),
                full_name: channel.full_name.clone(),
                avatar: channel.avatar_url.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}
