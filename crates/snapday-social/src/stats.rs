//! User counters: friends, posts and the daily streak.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use snapday_shared::constants::MILLIS_PER_DAY;
use snapday_shared::{Clock, Post, UserStats};
use snapday_store::{Degrade, IdentityStore, KvStore, PostStore, Result};

/// Count the leading posts that land exactly one day apart, starting today.
///
/// `posts` must be sorted newest first. Post `i` extends the streak only if
/// it is `i` whole days old, so a user who has not posted today has a
/// streak of zero.
pub fn compute_streak(posts: &[Post], now: DateTime<Utc>) -> u32 {
    let mut streak = 0;
    for (i, post) in posts.iter().enumerate() {
        let days_ago = (now - post.timestamp)
            .num_milliseconds()
            .div_euclid(MILLIS_PER_DAY);
        if days_ago != i as i64 {
            break;
        }
        streak += 1;
    }
    streak
}

/// Recomputes the denormalized counters stored on each user.
pub struct Stats<S> {
    identity: IdentityStore<S>,
    posts: PostStore<S>,
    clock: Arc<dyn Clock>,
}

impl<S> Clone for Stats<S> {
    fn clone(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            posts: self.posts.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S: KvStore> Stats<S> {
    pub fn new(identity: IdentityStore<S>, posts: PostStore<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            identity,
            posts,
            clock,
        }
    }

    /// Counters computed from the graph and posts. Any unreadable input is
    /// an error.
    pub async fn compute(&self, user_id: &str) -> Result<UserStats> {
        let friends = self.identity.load_friend_ids(user_id).await?;
        let posts = self.posts.load_user_posts(user_id).await?;
        Ok(UserStats {
            friends_count: friends.len() as u32,
            posts_count: posts.len() as u32,
            streak: compute_streak(&posts, self.clock.now_utc()),
        })
    }

    /// Current counters for `user_id`, zeroed if storage cannot be read.
    pub async fn user_stats(&self, user_id: &str) -> UserStats {
        self.compute(user_id).await.degrade("user stats")
    }

    /// Recompute and store the counters on the user record.
    ///
    /// Failures are logged and swallowed: the counters are derived data and
    /// the next recompute repairs them. Nothing is written unless every input
    /// was read. Returns `None` if nothing was written.
    pub async fn refresh(&self, user_id: &str) -> Option<UserStats> {
        let stats = match self.compute(user_id).await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(user = %user_id, error = %e, "stats inputs unreadable, keeping stored counters");
                return None;
            }
        };
        match self
            .identity
            .update_user(user_id, |user| {
                user.friends_count = stats.friends_count;
                user.posts_count = stats.posts_count;
                user.streak = stats.streak;
            })
            .await
        {
            Ok(Some(_)) => {
                debug!(user = %user_id, ?stats, "refreshed user stats");
                Some(stats)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(user = %user_id, error = %e, "failed to refresh user stats");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use snapday_shared::Visibility;

    fn post_at(timestamp: DateTime<Utc>) -> Post {
        Post {
            id: format!("post_{}", timestamp.timestamp()),
            user_id: "alice".into(),
            username: "alice".into(),
            display_name: "Alice".into(),
            user_avatar: None,
            front_image: "front".into(),
            back_image: "back".into(),
            timestamp,
            location: None,
            is_late: false,
            late_minutes: 0,
            likes: Vec::new(),
            comments: Vec::new(),
            visibility: Visibility::Friends,
            created_at: timestamp,
            updated_at: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 9, 18, 0, 0).unwrap()
    }

    #[test]
    fn consecutive_days_count() {
        let posts: Vec<_> = (0..3)
            .map(|d| post_at(now() - Duration::days(d) - Duration::hours(1)))
            .collect();
        assert_eq!(compute_streak(&posts, now()), 3);
    }

    #[test]
    fn no_post_today_is_zero() {
        let posts = vec![post_at(now() - Duration::hours(30))];
        assert_eq!(compute_streak(&posts, now()), 0);
        assert_eq!(compute_streak(&[], now()), 0);
    }

    #[tokio::test]
    async fn unreadable_inputs_keep_stored_counters() {
        use snapday_shared::{Friendship, FriendshipStatus, ManualClock, NewUser};
        use snapday_store::{keys, KeyLocks, MemoryKv};

        let kv = Arc::new(MemoryKv::new());
        let locks = KeyLocks::new();
        let identity = IdentityStore::new(Arc::clone(&kv), locks.clone());
        let posts = PostStore::new(Arc::clone(&kv), locks);
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::at_utc(2026, 3, 9, 18, 0));
        let stats = Stats::new(identity.clone(), posts, clock);

        let a = identity
            .register_user(
                NewUser {
                    username: "a".into(),
                    email: "a@example.com".into(),
                    display_name: "A".into(),
                    bio: None,
                },
                now(),
            )
            .await
            .unwrap()
            .unwrap();
        identity
            .save_friendship(&Friendship {
                id: "friendship_1".into(),
                user1_id: a.id.clone(),
                user2_id: "b".into(),
                created_at: now(),
                status: FriendshipStatus::Active,
            })
            .await
            .unwrap();
        assert_eq!(stats.refresh(&a.id).await.map(|s| s.friends_count), Some(1));

        let friendships = kv.get(keys::FRIENDSHIPS).await.unwrap().unwrap();
        kv.set(keys::FRIENDSHIPS, "not json".into()).await.unwrap();
        assert_eq!(stats.refresh(&a.id).await, None);
        assert_eq!(stats.user_stats(&a.id).await.friends_count, 0);

        kv.set(keys::FRIENDSHIPS, friendships).await.unwrap();
        let stored = identity.get_user_by_id(&a.id).await.unwrap();
        assert_eq!(stored.friends_count, 1);
        assert!(identity.are_friends(&a.id, "b").await);
    }

    #[test]
    fn gap_stops_the_count() {
        let posts = vec![
            post_at(now() - Duration::hours(2)),
            post_at(now() - Duration::hours(26)),
            post_at(now() - Duration::days(4)),
        ];
        assert_eq!(compute_streak(&posts, now()), 2);
    }
}
