//! Identity Store: users, friend requests, friendships and blocks.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use snapday_shared::constants::USER_ID_PREFIX;
use snapday_shared::{
    new_id, Block, FriendRequest, Friendship, NewUser, Outcome, ProfileUpdate, Rejection,
    RequestDirection, User, UserSettings,
};

use crate::collection::Collection;
use crate::error::{Degrade, Result};
use crate::keys;
use crate::kv::KvStore;
use crate::locks::KeyLocks;

pub struct IdentityStore<S> {
    users: Collection<S, User>,
    requests: Collection<S, FriendRequest>,
    friendships: Collection<S, Friendship>,
    blocks: Collection<S, Block>,
}

impl<S> Clone for IdentityStore<S> {
    fn clone(&self) -> Self {
        Self {
            users: self.users.clone(),
            requests: self.requests.clone(),
            friendships: self.friendships.clone(),
            blocks: self.blocks.clone(),
        }
    }
}

impl<S: KvStore> IdentityStore<S> {
    pub fn new(kv: Arc<S>, locks: KeyLocks) -> Self {
        Self {
            users: Collection::new(Arc::clone(&kv), locks.clone(), keys::USERS),
            requests: Collection::new(Arc::clone(&kv), locks.clone(), keys::FRIEND_REQUESTS),
            friendships: Collection::new(Arc::clone(&kv), locks.clone(), keys::FRIENDSHIPS),
            blocks: Collection::new(kv, locks, keys::BLOCKS),
        }
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Create a user. Email and username are unique, ignoring case.
    pub async fn register_user(&self, new: NewUser, now: DateTime<Utc>) -> Result<Outcome<User>> {
        let username = new.username.trim().to_string();
        let email = new.email.trim().to_string();
        if username.is_empty() || email.is_empty() {
            return Ok(Err(Rejection::InvalidInput(
                "username and email are required".into(),
            )));
        }

        let outcome = self
            .users
            .try_update(move |users| {
                if users.iter().any(|u| u.email.eq_ignore_ascii_case(&email)) {
                    return Err(Rejection::EmailTaken);
                }
                if users.iter().any(|u| u.username.eq_ignore_ascii_case(&username)) {
                    return Err(Rejection::UsernameTaken);
                }

                let user = User {
                    id: new_id(USER_ID_PREFIX),
                    username,
                    email,
                    display_name: new.display_name,
                    bio: Some(new.bio.unwrap_or_default()),
                    avatar: None,
                    is_private: false,
                    joined_at: now,
                    last_active: now,
                    friends_count: 0,
                    posts_count: 0,
                    streak: 0,
                    settings: UserSettings::default(),
                };
                users.push(user.clone());
                Ok(user)
            })
            .await?;

        match &outcome {
            Ok(user) => info!(user = %user.id, username = %user.username, "registered user"),
            Err(rejection) => debug!(%rejection, "registration rejected"),
        }
        Ok(outcome)
    }

    pub async fn get_all_users(&self) -> Vec<User> {
        self.users.load().await.degrade("users")
    }

    /// Strict lookup for write paths: a failed read is an error, not a
    /// missing user.
    pub async fn find_user(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self.users.load().await?.into_iter().find(|u| u.id == user_id))
    }

    pub async fn get_user_by_id(&self, user_id: &str) -> Option<User> {
        self.find_user(user_id).await.degrade("user")
    }

    /// Case-insensitive username lookup.
    pub async fn get_user_by_username(&self, username: &str) -> Option<User> {
        self.get_all_users()
            .await
            .into_iter()
            .find(|u| u.username.eq_ignore_ascii_case(username))
    }

    /// Insert or replace a user record.
    pub async fn save_user(&self, user: &User) -> Result<()> {
        let id = user.id.clone();
        self.users.upsert(user.clone(), move |u| u.id == id).await
    }

    /// Atomically modify one user. Returns `None` if the user does not exist.
    pub async fn update_user<F>(&self, user_id: &str, f: F) -> Result<Option<User>>
    where
        F: FnOnce(&mut User) + Send,
    {
        let outcome = self
            .users
            .try_update(|users| match users.iter_mut().find(|u| u.id == user_id) {
                Some(user) => {
                    f(user);
                    Ok(user.clone())
                }
                None => Err(()),
            })
            .await?;
        Ok(outcome.ok())
    }

    /// Apply a profile edit and touch `last_active`.
    pub async fn update_profile(
        &self,
        user_id: &str,
        update: ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<Outcome<User>> {
        let updated = self
            .update_user(user_id, move |user| {
                if let Some(display_name) = update.display_name {
                    user.display_name = display_name;
                }
                if let Some(bio) = update.bio {
                    user.bio = Some(bio);
                }
                if let Some(avatar) = update.avatar {
                    user.avatar = Some(avatar);
                }
                if let Some(is_private) = update.is_private {
                    user.is_private = is_private;
                }
                if let Some(settings) = update.settings {
                    user.settings = settings;
                }
                user.last_active = now;
            })
            .await?;
        Ok(updated.ok_or(Rejection::UserNotFound))
    }

    /// Record activity, as a login does.
    pub async fn touch_last_active(&self, user_id: &str, now: DateTime<Utc>) -> Result<Outcome<User>> {
        let updated = self.update_user(user_id, |user| user.last_active = now).await?;
        Ok(updated.ok_or(Rejection::UserNotFound))
    }

    /// Substring search over username, display name and email.
    pub async fn search_users(&self, query: &str, exclude_user_id: Option<&str>) -> Vec<User> {
        let query = query.to_lowercase();
        self.get_all_users()
            .await
            .into_iter()
            .filter(|u| exclude_user_id != Some(u.id.as_str()))
            .filter(|u| {
                u.username.to_lowercase().contains(&query)
                    || u.display_name.to_lowercase().contains(&query)
                    || u.email.to_lowercase().contains(&query)
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Friend requests
    // ------------------------------------------------------------------

    pub async fn get_friend_requests(&self) -> Vec<FriendRequest> {
        self.requests.load().await.degrade("friend requests")
    }

    pub async fn get_friend_request(&self, request_id: &str) -> Option<FriendRequest> {
        self.get_friend_requests()
            .await
            .into_iter()
            .find(|r| r.id == request_id)
    }

    pub async fn save_friend_request(&self, request: &FriendRequest) -> Result<()> {
        let id = request.id.clone();
        self.requests.upsert(request.clone(), move |r| r.id == id).await
    }

    /// Atomic read-modify-write over all friend requests.
    pub async fn update_friend_requests<R, F>(&self, f: F) -> Result<Outcome<R>>
    where
        F: FnOnce(&mut Vec<FriendRequest>) -> Outcome<R> + Send,
        R: Send,
    {
        self.requests.try_update(f).await
    }

    /// Sent: every request from the user. Received: pending requests to the user.
    pub async fn user_friend_requests(
        &self,
        user_id: &str,
        direction: RequestDirection,
    ) -> Vec<FriendRequest> {
        self.get_friend_requests()
            .await
            .into_iter()
            .filter(|r| match direction {
                RequestDirection::Sent => r.from_user_id == user_id,
                RequestDirection::Received => r.to_user_id == user_id && r.is_pending(),
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Friendships
    // ------------------------------------------------------------------

    pub async fn get_friendships(&self) -> Vec<Friendship> {
        self.friendships.load().await.degrade("friendships")
    }

    /// Strict form of [`friend_ids`](Self::friend_ids).
    pub async fn load_friend_ids(&self, user_id: &str) -> Result<HashSet<String>> {
        Ok(self
            .friendships
            .load()
            .await?
            .iter()
            .filter(|f| f.is_active())
            .filter_map(|f| f.other(user_id))
            .map(str::to_string)
            .collect())
    }

    /// Strict form of [`are_friends`](Self::are_friends).
    pub async fn check_friends(&self, a: &str, b: &str) -> Result<bool> {
        Ok(self
            .friendships
            .load()
            .await?
            .iter()
            .any(|f| f.is_active() && f.connects(a, b)))
    }

    pub async fn save_friendship(&self, friendship: &Friendship) -> Result<()> {
        let id = friendship.id.clone();
        self.friendships
            .upsert(friendship.clone(), move |f| f.id == id)
            .await
    }

    /// Atomic read-modify-write over all friendships.
    pub async fn update_friendships<R, F>(&self, f: F) -> Result<Outcome<R>>
    where
        F: FnOnce(&mut Vec<Friendship>) -> Outcome<R> + Send,
        R: Send,
    {
        self.friendships.try_update(f).await
    }

    /// Ids of everyone in an active friendship with `user_id`.
    pub async fn friend_ids(&self, user_id: &str) -> HashSet<String> {
        self.load_friend_ids(user_id).await.degrade("friend ids")
    }

    pub async fn get_user_friends(&self, user_id: &str) -> Vec<User> {
        let friend_ids = self.friend_ids(user_id).await;
        if friend_ids.is_empty() {
            return Vec::new();
        }
        self.get_all_users()
            .await
            .into_iter()
            .filter(|u| friend_ids.contains(&u.id))
            .collect()
    }

    /// Symmetric: the pair is checked in both orders.
    pub async fn are_friends(&self, a: &str, b: &str) -> bool {
        self.check_friends(a, b).await.degrade("friendship")
    }

    // ------------------------------------------------------------------
    // Blocks
    // ------------------------------------------------------------------

    pub async fn get_blocks(&self) -> Vec<Block> {
        self.blocks.load().await.degrade("blocks")
    }

    /// Record that `blocker` blocked `blocked`. Returns `false` if it already was.
    pub async fn add_block(&self, blocker: &str, blocked: &str, now: DateTime<Utc>) -> Result<bool> {
        self.blocks
            .update(|blocks| {
                if blocks
                    .iter()
                    .any(|b| b.blocker_id == blocker && b.blocked_id == blocked)
                {
                    return false;
                }
                blocks.push(Block {
                    blocker_id: blocker.to_string(),
                    blocked_id: blocked.to_string(),
                    created_at: now,
                });
                true
            })
            .await
    }

    /// Returns `false` if there was no such block.
    pub async fn remove_block(&self, blocker: &str, blocked: &str) -> Result<bool> {
        let outcome = self
            .blocks
            .try_update(|blocks| {
                let before = blocks.len();
                blocks.retain(|b| !(b.blocker_id == blocker && b.blocked_id == blocked));
                if blocks.len() == before {
                    Err(())
                } else {
                    Ok(())
                }
            })
            .await?;
        Ok(outcome.is_ok())
    }

    /// Whether either user has blocked the other.
    pub async fn is_blocked_between(&self, a: &str, b: &str) -> bool {
        self.check_blocked_between(a, b).await.degrade("blocks")
    }

    /// Strict form of [`is_blocked_between`](Self::is_blocked_between).
    pub async fn check_blocked_between(&self, a: &str, b: &str) -> Result<bool> {
        Ok(self.blocks.load().await?.iter().any(|block| block.between(a, b)))
    }
}
