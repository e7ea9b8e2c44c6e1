//! Post Store: the global post collection, per-user post indices and the
//! daily posting ledger.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error};

use snapday_shared::{Outcome, Post, Rejection};

use crate::collection::Collection;
use crate::error::{Degrade, Result};
use crate::keys;
use crate::kv::KvStore;
use crate::locks::KeyLocks;

pub struct PostStore<S> {
    kv: Arc<S>,
    locks: KeyLocks,
    posts: Collection<S, Post>,
}

impl<S> Clone for PostStore<S> {
    fn clone(&self) -> Self {
        Self {
            kv: Arc::clone(&self.kv),
            locks: self.locks.clone(),
            posts: self.posts.clone(),
        }
    }
}

impl<S: KvStore> PostStore<S> {
    pub fn new(kv: Arc<S>, locks: KeyLocks) -> Self {
        let posts = Collection::new(Arc::clone(&kv), locks.clone(), keys::POSTS);
        Self { kv, locks, posts }
    }

    pub fn locks(&self) -> &KeyLocks {
        &self.locks
    }

    fn user_index(&self, user_id: &str) -> Collection<S, Post> {
        Collection::new(Arc::clone(&self.kv), self.locks.clone(), keys::user_posts(user_id))
    }

    // ------------------------------------------------------------------
    // Write
    // ------------------------------------------------------------------

    /// Insert or replace a post in the global collection and in its
    /// author's index.
    pub async fn save_post(&self, post: &Post) -> Result<()> {
        let _guard = self.locks.lock(&keys::post_record(&post.id)).await;
        self.write_post(post).await
    }

    async fn write_post(&self, post: &Post) -> Result<()> {
        let id = post.id.clone();
        self.posts.upsert(post.clone(), move |p| p.id == id).await?;

        let id = post.id.clone();
        self.user_index(&post.user_id)
            .upsert(post.clone(), move |p| p.id == id)
            .await
    }

    /// Re-read a post, let `f` mutate it, and write it back whole.
    ///
    /// Runs under the post's record lock so two mutations of the same post
    /// never interleave. Nothing is written when `f` rejects.
    pub async fn update_post<R, F>(&self, post_id: &str, f: F) -> Result<Outcome<R>>
    where
        F: FnOnce(&mut Post) -> Outcome<R> + Send,
        R: Send,
    {
        let _guard = self.locks.lock(&keys::post_record(post_id)).await;

        let Some(mut post) = self.posts.load().await?.into_iter().find(|p| p.id == post_id) else {
            return Ok(Err(Rejection::PostNotFound));
        };

        match f(&mut post) {
            Ok(out) => {
                self.write_post(&post).await?;
                Ok(Ok(out))
            }
            Err(rejection) => {
                debug!(post = %post_id, %rejection, "post mutation rejected");
                Ok(Err(rejection))
            }
        }
    }

    /// Remove a post on behalf of `requesting_user_id`, who must be its author.
    pub async fn delete_post(&self, post_id: &str, requesting_user_id: &str) -> Result<Outcome<Post>> {
        let _guard = self.locks.lock(&keys::post_record(post_id)).await;

        let removed = self
            .posts
            .try_update(|posts| {
                let index = posts
                    .iter()
                    .position(|p| p.id == post_id)
                    .ok_or(Rejection::PostNotFound)?;
                if posts[index].user_id != requesting_user_id {
                    return Err(Rejection::NotAuthorized);
                }
                Ok(posts.remove(index))
            })
            .await?;

        let post = match removed {
            Ok(post) => post,
            Err(rejection) => return Ok(Err(rejection)),
        };

        self.user_index(&post.user_id)
            .update(|posts| posts.retain(|p| p.id != post_id))
            .await?;

        Ok(Ok(post))
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Every post, in storage order.
    pub async fn get_all_posts(&self) -> Vec<Post> {
        self.posts.load().await.degrade("posts")
    }

    /// Strict lookup for write paths.
    pub async fn find_post(&self, post_id: &str) -> Result<Option<Post>> {
        Ok(self.posts.load().await?.into_iter().find(|p| p.id == post_id))
    }

    pub async fn get_post_by_id(&self, post_id: &str) -> Option<Post> {
        self.find_post(post_id).await.degrade("post")
    }

    /// Strict form of [`get_user_posts`](Self::get_user_posts).
    pub async fn load_user_posts(&self, user_id: &str) -> Result<Vec<Post>> {
        let mut posts = self.user_index(user_id).load().await?;
        sort_newest_first(&mut posts);
        Ok(posts)
    }

    /// The author's posts, newest first.
    pub async fn get_user_posts(&self, user_id: &str) -> Vec<Post> {
        self.load_user_posts(user_id).await.degrade("user posts")
    }

    /// Posts whose timestamp falls in `[start, end)`.
    pub async fn posts_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<Post> {
        self.get_all_posts()
            .await
            .into_iter()
            .filter(|p| p.timestamp >= start && p.timestamp < end)
            .collect()
    }

    // ------------------------------------------------------------------
    // Daily ledger
    // ------------------------------------------------------------------

    /// Post id recorded for `user_id` on `day`, propagating storage failure.
    pub async fn daily_entry(&self, user_id: &str, day: &str) -> Result<Option<String>> {
        self.kv.get(&keys::daily_post(user_id, day)).await
    }

    pub async fn has_posted_on(&self, user_id: &str, day: &str) -> bool {
        self.daily_entry(user_id, day)
            .await
            .map(|entry| entry.is_some())
            .degrade("daily ledger")
    }

    pub async fn mark_daily(&self, user_id: &str, day: &str, post_id: &str) -> Result<()> {
        self.kv
            .set(&keys::daily_post(user_id, day), post_id.to_string())
            .await
            .map_err(|e| {
                error!(user = %user_id, day, error = %e, "failed to write daily ledger");
                e
            })
    }
}

pub fn sort_newest_first(posts: &mut [Post]) {
    posts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}
