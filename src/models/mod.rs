//! Domain records and the projections served by the API.

pub mod comments;
pub mod likes;
pub mod playlists;
pub mod read_models;
pub mod subscriptions;
pub mod tweets;
pub mod users;
pub mod videos;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use comments::{Comment, CommentWithOwner};
pub use likes::{Like, LikeTarget, LikedVideo};
pub use playlists::{Playlist, PlaylistChanges, PlaylistDetail, PlaylistSummary};
pub use read_models::{
    ChannelProfile, ChannelStats, ChannelVideo, CommenterProfile, SubscriberEntry,
    SubscriberProfile,
};
pub use subscriptions::Subscription;
pub use tweets::{Tweet, TweetWithOwner};
pub use users::{NewUser, PublicUser, User, UserProfile};
pub use videos::{NewVideo, Video, VideoChanges, VideoFilter, VideoSummary};

/// A binary asset held by the media host: its external id plus public url.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub public_id: String,
    pub url: String,
}

/// Outcome of a toggle on a relationship edge.
#[derive(Debug, Clone, PartialEq)]
pub enum Toggled<T> {
    Created(T),
    Removed(T),
}

impl<T> Toggled<T> {
    pub fn is_created(&self) -> bool {
        matches!(self, Toggled::Created(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Toggled::Created(edge) | Toggled::Removed(edge) => edge,
        }
    }
}

/// Records that belong to exactly one user.
pub trait Owned {
    fn owner_id(&self) -> Uuid;
}

/// Capability check applied before every mutation of an owned record.
pub fn is_owned_by(record: &impl Owned, requester_id: Uuid) -> bool {
    record.owner_id() == requester_id
}

impl Owned for Video {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

impl Owned for Comment {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

impl Owned for Tweet {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

impl Owned for Playlist {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}
