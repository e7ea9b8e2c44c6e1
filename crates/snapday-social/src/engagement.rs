//! Likes and comments on posts.
//!
//! Every mutation re-reads the whole post, edits it and writes it back under
//! the post's record lock. Acting on a post the actor cannot see is
//! rejected the same way as acting on a missing one.

use std::sync::Arc;

use tracing::debug;

use snapday_shared::constants::{COMMENT_ID_PREFIX, LIKE_ID_PREFIX};
use snapday_shared::{new_id, Clock, Comment, Like, Rejection};
use snapday_store::{IdentityStore, KvStore, PostStore, Result};

use crate::feed::FeedResolver;

pub struct Engagement<S> {
    identity: IdentityStore<S>,
    posts: PostStore<S>,
    feed: FeedResolver<S>,
    clock: Arc<dyn Clock>,
}

impl<S> Clone for Engagement<S> {
    fn clone(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            posts: self.posts.clone(),
            feed: self.feed.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S: KvStore> Engagement<S> {
    pub fn new(
        identity: IdentityStore<S>,
        posts: PostStore<S>,
        feed: FeedResolver<S>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            identity,
            posts,
            feed,
            clock,
        }
    }

    async fn visible(&self, post_id: &str, user_id: &str) -> Result<bool> {
        match self.posts.find_post(post_id).await? {
            Some(post) => self.feed.check_can_see(&post, user_id).await,
            None => Ok(false),
        }
    }

    /// Returns `false` if the user already liked the post.
    pub async fn like_post(&self, post_id: &str, user_id: &str) -> Result<bool> {
        let Some(user) = self.identity.find_user(user_id).await? else {
            return Ok(false);
        };
        if !self.visible(post_id, user_id).await? {
            return Ok(false);
        }

        let now = self.clock.now_utc();
        let outcome = self
            .posts
            .update_post(post_id, |post| {
                if post.is_liked_by(user_id) {
                    return Err(Rejection::AlreadyLiked);
                }
                post.likes.push(Like {
                    id: new_id(LIKE_ID_PREFIX),
                    user_id: user.id,
                    username: user.username,
                    timestamp: now,
                });
                Ok(())
            })
            .await?;
        debug!(post = %post_id, user = %user_id, liked = outcome.is_ok(), "like");
        Ok(outcome.is_ok())
    }

    /// Remove the user's like. Succeeds whether or not there was one.
    pub async fn unlike_post(&self, post_id: &str, user_id: &str) -> Result<bool> {
        let outcome = self
            .posts
            .update_post(post_id, |post| {
                post.likes.retain(|like| like.user_id != user_id);
                Ok(())
            })
            .await?;
        Ok(outcome.is_ok())
    }

    /// Append a trimmed comment. `None` if the post or user is missing or the
    /// post is not visible to the commenter.
    pub async fn add_comment(&self, post_id: &str, user_id: &str, content: &str) -> Result<Option<Comment>> {
        let Some(user) = self.identity.find_user(user_id).await? else {
            return Ok(None);
        };
        if !self.visible(post_id, user_id).await? {
            return Ok(None);
        }

        let comment = Comment {
            id: new_id(COMMENT_ID_PREFIX),
            user_id: user.id,
            username: user.username,
            display_name: user.display_name,
            content: content.trim().to_string(),
            timestamp: self.clock.now_utc(),
            user_avatar: user.avatar,
        };
        let outcome = self
            .posts
            .update_post(post_id, |post| {
                post.comments.push(comment.clone());
                Ok(())
            })
            .await?;
        debug!(post = %post_id, user = %user_id, comment = %comment.id, "comment added");
        Ok(outcome.ok().map(|()| comment))
    }

    /// Only the comment's author or the post's author may delete it.
    pub async fn delete_comment(&self, post_id: &str, comment_id: &str, requesting_user_id: &str) -> Result<bool> {
        let outcome = self
            .posts
            .update_post(post_id, |post| {
                let index = post
                    .comments
                    .iter()
                    .position(|c| c.id == comment_id)
                    .ok_or(Rejection::CommentNotFound)?;
                let allowed = post.comments[index].user_id == requesting_user_id
                    || post.user_id == requesting_user_id;
                if !allowed {
                    return Err(Rejection::NotAuthorized);
                }
                post.comments.remove(index);
                Ok(())
            })
            .await?;
        debug!(post = %post_id, comment = %comment_id, user = %requesting_user_id, deleted = outcome.is_ok(), "delete comment");
        Ok(outcome.is_ok())
    }
}
