//! Domain records persisted in the key-value store.
//!
//! Every struct derives `Serialize` and `Deserialize` with camelCase field
//! names; the same JSON shape is stored and served over HTTP.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{FriendRequestStatus, FriendshipStatus, Visibility};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub is_private: bool,
    pub joined_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub friends_count: u32,
    pub posts_count: u32,
    pub streak: u32,
    pub settings: UserSettings,
}

impl User {
    /// Private accounts are never offered as friend suggestions.
    pub fn has_private_profile(&self) -> bool {
        self.is_private || self.settings.profile_visibility == Visibility::Private
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub allow_friend_requests: bool,
    pub show_active_status: bool,
    pub notify_on_friend_request: bool,
    pub notify_on_new_post: bool,
    pub profile_visibility: Visibility,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            allow_friend_requests: true,
            show_active_status: true,
            notify_on_friend_request: true,
            notify_on_new_post: true,
            profile_visibility: Visibility::Public,
        }
    }
}

/// Registration payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub display_name: String,
    #[serde(default)]
    pub bio: Option<String>,
}

/// Partial profile edit; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub is_private: Option<bool>,
    pub settings: Option<UserSettings>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub friends_count: u32,
    pub posts_count: u32,
    pub streak: u32,
}

// ---------------------------------------------------------------------------
// Friend graph
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequest {
    pub id: String,
    pub from_user_id: String,
    pub to_user_id: String,
    pub status: FriendRequestStatus,
    pub timestamp: DateTime<Utc>,
}

impl FriendRequest {
    pub fn is_pending(&self) -> bool {
        self.status == FriendRequestStatus::Pending
    }

    /// Pending request sent from `from` to `to`.
    pub fn is_pending_between(&self, from: &str, to: &str) -> bool {
        self.is_pending() && self.from_user_id == from && self.to_user_id == to
    }
}

/// Undirected relationship record. `user1_id` is the original requester.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Friendship {
    pub id: String,
    pub user1_id: String,
    pub user2_id: String,
    pub created_at: DateTime<Utc>,
    pub status: FriendshipStatus,
}

impl Friendship {
    /// Whether this record links `a` and `b`, in either order.
    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.user1_id == a && self.user2_id == b) || (self.user1_id == b && self.user2_id == a)
    }

    pub fn is_active(&self) -> bool {
        self.status == FriendshipStatus::Active
    }

    /// The other side of the friendship, if `user_id` is part of it.
    pub fn other(&self, user_id: &str) -> Option<&str> {
        if self.user1_id == user_id {
            Some(&self.user2_id)
        } else if self.user2_id == user_id {
            Some(&self.user1_id)
        } else {
            None
        }
    }
}

/// Durable record that `blocker_id` blocked `blocked_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub blocker_id: String,
    pub blocked_id: String,
    pub created_at: DateTime<Utc>,
}

impl Block {
    pub fn between(&self, a: &str, b: &str) -> bool {
        (self.blocker_id == a && self.blocked_id == b) || (self.blocker_id == b && self.blocked_id == a)
    }
}

// ---------------------------------------------------------------------------
// Post
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub display_name: String,
    pub user_avatar: Option<String>,
    /// Opaque reference produced by the media layer.
    pub front_image: String,
    pub back_image: String,
    pub timestamp: DateTime<Utc>,
    pub location: Option<PostLocation>,
    pub is_late: bool,
    pub late_minutes: u32,
    pub likes: Vec<Like>,
    pub comments: Vec<Comment>,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Post {
    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.likes.iter().any(|like| like.user_id == user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub display_name: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub user_avatar: Option<String>,
}

/// Post creation payload from the capture flow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub front_image: String,
    pub back_image: String,
    #[serde(default)]
    pub location: Option<PostLocation>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub is_late: bool,
    #[serde(default)]
    pub late_minutes: u32,
}
