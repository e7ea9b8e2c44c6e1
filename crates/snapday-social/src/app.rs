use std::sync::Arc;

use snapday_shared::constants::{DEFAULT_SUGGESTION_LIMIT, DISCOVERY_LIMIT};
use snapday_shared::Clock;
use snapday_store::{IdentityStore, KeyLocks, KvStore, PostStore};

use crate::engagement::Engagement;
use crate::feed::FeedResolver;
use crate::friends::FriendGraph;
use crate::posts::Posts;
use crate::stats::Stats;

/// Tunables for the social services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocialSettings {
    /// Maximum number of posts on the discovery surface.
    pub discovery_limit: usize,
    /// Default number of friend suggestions.
    pub suggestion_limit: usize,
}

impl Default for SocialSettings {
    fn default() -> Self {
        Self {
            discovery_limit: DISCOVERY_LIMIT,
            suggestion_limit: DEFAULT_SUGGESTION_LIMIT,
        }
    }
}

/// Every snapday service, wired over one key-value backend and one clock.
pub struct Snapday<S> {
    pub identity: IdentityStore<S>,
    pub friends: FriendGraph<S>,
    pub posts: Posts<S>,
    pub feed: FeedResolver<S>,
    pub engagement: Engagement<S>,
    pub clock: Arc<dyn Clock>,
    pub settings: SocialSettings,
}

impl<S> Clone for Snapday<S> {
    fn clone(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            friends: self.friends.clone(),
            posts: self.posts.clone(),
            feed: self.feed.clone(),
            engagement: self.engagement.clone(),
            clock: Arc::clone(&self.clock),
            settings: self.settings,
        }
    }
}

impl<S: KvStore> Snapday<S> {
    pub fn new(kv: Arc<S>, clock: Arc<dyn Clock>, settings: SocialSettings) -> Self {
        let locks = KeyLocks::new();
        let identity = IdentityStore::new(Arc::clone(&kv), locks.clone());
        let post_store = PostStore::new(kv, locks);
        let stats = Stats::new(identity.clone(), post_store.clone(), Arc::clone(&clock));
        let feed = FeedResolver::new(identity.clone(), post_store.clone(), settings.discovery_limit);

        Self {
            friends: FriendGraph::new(identity.clone(), stats.clone(), Arc::clone(&clock)),
            posts: Posts::new(identity.clone(), post_store.clone(), stats, Arc::clone(&clock)),
            engagement: Engagement::new(identity.clone(), post_store, feed.clone(), Arc::clone(&clock)),
            feed,
            clock,
            identity,
            settings,
        }
    }
}
