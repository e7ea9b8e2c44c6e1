//! Feed / Visibility Resolver.
//!
//! A viewer always sees their own posts. Everyone else's go through
//! [`Visibility::admits`], the one rule shared by the single-post check and
//! the bulk feed queries so the two can never disagree.

use std::collections::HashSet;

use snapday_shared::{Post, Visibility};
use snapday_store::{Degrade, IdentityStore, KvStore, PostStore, Result};

use snapday_store::posts::sort_newest_first;

pub struct FeedResolver<S> {
    identity: IdentityStore<S>,
    posts: PostStore<S>,
    discovery_limit: usize,
}

impl<S> Clone for FeedResolver<S> {
    fn clone(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            posts: self.posts.clone(),
            discovery_limit: self.discovery_limit,
        }
    }
}

fn visible_to(post: &Post, viewer_id: &str, friends: &HashSet<String>) -> bool {
    post.user_id == viewer_id || post.visibility.admits(friends.contains(&post.user_id))
}

impl<S: KvStore> FeedResolver<S> {
    pub fn new(identity: IdentityStore<S>, posts: PostStore<S>, discovery_limit: usize) -> Self {
        Self {
            identity,
            posts,
            discovery_limit,
        }
    }

    /// Whether `viewer_id` may see `post`. Unreadable friendships hide
    /// friends-only posts.
    pub async fn can_see(&self, post: &Post, viewer_id: &str) -> bool {
        self.check_can_see(post, viewer_id).await.degrade("visibility")
    }

    /// Strict form of [`can_see`](Self::can_see), for paths that go on to
    /// write.
    pub async fn check_can_see(&self, post: &Post, viewer_id: &str) -> Result<bool> {
        if post.user_id == viewer_id {
            return Ok(true);
        }
        match post.visibility {
            Visibility::Public => Ok(true),
            Visibility::Private => Ok(false),
            Visibility::Friends => self.identity.check_friends(&post.user_id, viewer_id).await,
        }
    }

    async fn is_known(&self, viewer_id: &str) -> bool {
        self.identity.get_user_by_id(viewer_id).await.is_some()
    }

    /// Every post the viewer may see, newest first. Empty for an unknown
    /// viewer.
    pub async fn feed_posts(&self, viewer_id: &str) -> Vec<Post> {
        if !self.is_known(viewer_id).await {
            return Vec::new();
        }
        let friends = self.identity.friend_ids(viewer_id).await;
        let mut posts: Vec<Post> = self
            .posts
            .get_all_posts()
            .await
            .into_iter()
            .filter(|p| visible_to(p, viewer_id, &friends))
            .collect();
        sort_newest_first(&mut posts);
        posts
    }

    /// Public posts from people the viewer is not yet connected to.
    pub async fn discovery_posts(&self, viewer_id: &str) -> Vec<Post> {
        if !self.is_known(viewer_id).await {
            return Vec::new();
        }
        let friends = self.identity.friend_ids(viewer_id).await;
        let mut posts: Vec<Post> = self
            .posts
            .get_all_posts()
            .await
            .into_iter()
            .filter(|p| p.visibility == Visibility::Public)
            .filter(|p| p.user_id != viewer_id && !friends.contains(&p.user_id))
            .collect();
        sort_newest_first(&mut posts);
        posts.truncate(self.discovery_limit);
        posts
    }

    /// The author's posts that `viewer_id` may see, newest first.
    pub async fn visible_user_posts(&self, viewer_id: &str, author_id: &str) -> Vec<Post> {
        let posts = self.posts.get_user_posts(author_id).await;
        if author_id == viewer_id {
            return posts;
        }
        let is_friend = self.identity.are_friends(author_id, viewer_id).await;
        posts
            .into_iter()
            .filter(|p| p.visibility.admits(is_friend))
            .collect()
    }
}
