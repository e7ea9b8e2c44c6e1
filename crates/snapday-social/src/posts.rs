//! Post lifecycle: the once-a-day gate, deletion and visibility edits.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use snapday_shared::clock::{day_key, day_window};
use snapday_shared::constants::POST_ID_PREFIX;
use snapday_shared::{new_id, Clock, NewPost, Outcome, Post, Rejection, UserStats, Visibility};
use snapday_store::{keys, IdentityStore, KvStore, PostStore, Result};

use crate::stats::Stats;

pub struct Posts<S> {
    identity: IdentityStore<S>,
    store: PostStore<S>,
    stats: Stats<S>,
    clock: Arc<dyn Clock>,
}

impl<S> Clone for Posts<S> {
    fn clone(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            store: self.store.clone(),
            stats: self.stats.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S: KvStore> Posts<S> {
    pub fn new(
        identity: IdentityStore<S>,
        store: PostStore<S>,
        stats: Stats<S>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            identity,
            store,
            stats,
            clock,
        }
    }

    /// Publish today's post for `user_id`.
    ///
    /// The ledger check, post write and ledger mark run under the user's
    /// gate lock, so two concurrent attempts on the same day cannot both
    /// pass. A ledger read failure aborts creation instead of letting a
    /// second post through.
    pub async fn create_post(&self, user_id: &str, data: NewPost) -> Result<Outcome<Post>> {
        if data.front_image.trim().is_empty() || data.back_image.trim().is_empty() {
            return Ok(Err(Rejection::InvalidInput(
                "both images are required".into(),
            )));
        }

        let gate = self.store.locks().lock(&keys::post_gate(user_id)).await;

        let Some(author) = self.identity.find_user(user_id).await? else {
            return Ok(Err(Rejection::UserNotFound));
        };

        // One reading decides both the ledger day and the timestamp.
        let now = self.clock.now();
        let day = day_key(&now);
        if self.store.daily_entry(user_id, &day).await?.is_some() {
            debug!(user = %user_id, %day, "already posted today");
            return Ok(Err(Rejection::AlreadyPostedToday));
        }

        let timestamp = now.with_timezone(&Utc);
        let post = Post {
            id: new_id(POST_ID_PREFIX),
            user_id: author.id.clone(),
            username: author.username.clone(),
            display_name: author.display_name.clone(),
            user_avatar: author.avatar.clone(),
            front_image: data.front_image,
            back_image: data.back_image,
            timestamp,
            location: data.location,
            is_late: data.is_late,
            late_minutes: data.late_minutes,
            likes: Vec::new(),
            comments: Vec::new(),
            visibility: data.visibility.unwrap_or_default(),
            created_at: timestamp,
            updated_at: None,
        };

        self.store.save_post(&post).await?;
        self.store.mark_daily(user_id, &day, &post.id).await?;
        drop(gate);

        self.stats.refresh(user_id).await;
        info!(post = %post.id, user = %user_id, %day, visibility = ?post.visibility, "post created");
        Ok(Ok(post))
    }

    /// Delete a post. Only its author may do this.
    pub async fn remove_post(&self, post_id: &str, requesting_user_id: &str) -> Result<Outcome<Post>> {
        let outcome = self.store.delete_post(post_id, requesting_user_id).await?;
        match &outcome {
            Ok(post) => {
                self.stats.refresh(&post.user_id).await;
                info!(post = %post_id, user = %requesting_user_id, "post deleted");
            }
            Err(rejection) => debug!(post = %post_id, user = %requesting_user_id, %rejection, "delete rejected"),
        }
        Ok(outcome)
    }

    /// Like [`remove_post`](Self::remove_post), reporting only whether the
    /// post was deleted.
    pub async fn delete_post(&self, post_id: &str, requesting_user_id: &str) -> Result<bool> {
        Ok(self.remove_post(post_id, requesting_user_id).await?.is_ok())
    }

    /// Change who can see a post. Only its author may do this.
    pub async fn update_visibility(
        &self,
        post_id: &str,
        requesting_user_id: &str,
        visibility: Visibility,
    ) -> Result<Outcome<Post>> {
        let now = self.clock.now_utc();
        self.store
            .update_post(post_id, |post| {
                if post.user_id != requesting_user_id {
                    return Err(Rejection::NotAuthorized);
                }
                post.visibility = visibility;
                post.updated_at = Some(now);
                Ok(post.clone())
            })
            .await
    }

    pub async fn save_post(&self, post: &Post) -> Result<()> {
        self.store.save_post(post).await
    }

    pub async fn get_post_by_id(&self, post_id: &str) -> Option<Post> {
        self.store.get_post_by_id(post_id).await
    }

    pub async fn get_all_posts(&self) -> Vec<Post> {
        self.store.get_all_posts().await
    }

    pub async fn get_user_posts(&self, user_id: &str) -> Vec<Post> {
        self.store.get_user_posts(user_id).await
    }

    pub async fn has_posted_today(&self, user_id: &str) -> bool {
        let day = day_key(&self.clock.now());
        self.store.has_posted_on(user_id, &day).await
    }

    /// Posts created since local midnight of the current clock day.
    pub async fn todays_posts(&self) -> Vec<Post> {
        let (start, end) = day_window(&self.clock.now());
        self.store.posts_between(start, end).await
    }

    pub async fn user_stats(&self, user_id: &str) -> UserStats {
        self.stats.user_stats(user_id).await
    }

    pub async fn recompute_user_stats(&self, user_id: &str) -> Option<UserStats> {
        self.stats.refresh(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, FixedOffset, TimeZone};
    use snapday_shared::{ManualClock, NewUser, User};
    use std::sync::Mutex;
    use snapday_store::{FlakyKv, KeyLocks, MemoryKv};

    struct Fixture<S> {
        posts: Posts<S>,
        identity: IdentityStore<S>,
        clock: Arc<ManualClock>,
    }

    fn fixture_on<S: KvStore>(kv: Arc<S>, clock: ManualClock) -> Fixture<S> {
        let locks = KeyLocks::new();
        let clock = Arc::new(clock);
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let identity = IdentityStore::new(Arc::clone(&kv), locks.clone());
        let store = PostStore::new(kv, locks);
        let stats = Stats::new(identity.clone(), store.clone(), Arc::clone(&dyn_clock));
        Fixture {
            posts: Posts::new(identity.clone(), store, stats, dyn_clock),
            identity,
            clock,
        }
    }

    fn fixture() -> Fixture<MemoryKv> {
        fixture_on(Arc::new(MemoryKv::new()), ManualClock::at_utc(2026, 3, 9, 10, 0))
    }

    async fn user<S: KvStore>(identity: &IdentityStore<S>, name: &str) -> User {
        identity
            .register_user(
                NewUser {
                    username: name.into(),
                    email: format!("{name}@example.com"),
                    display_name: name.into(),
                    bio: None,
                },
                chrono::Utc::now(),
            )
            .await
            .unwrap()
            .unwrap()
    }

    fn photos() -> NewPost {
        NewPost {
            front_image: "file:///front.jpg".into(),
            back_image: "file:///back.jpg".into(),
            ..NewPost::default()
        }
    }

    #[tokio::test]
    async fn second_post_same_day_is_rejected() {
        let Fixture { posts, identity, clock } = fixture();
        let alice = user(&identity, "alice").await;

        let first = posts.create_post(&alice.id, photos()).await.unwrap().unwrap();
        assert_eq!(first.visibility, Visibility::Friends);
        assert!(first.likes.is_empty() && first.comments.is_empty());
        assert!(posts.has_posted_today(&alice.id).await);

        clock.advance(Duration::hours(4));
        assert_eq!(
            posts.create_post(&alice.id, photos()).await.unwrap(),
            Err(Rejection::AlreadyPostedToday)
        );
        assert_eq!(posts.get_user_posts(&alice.id).await.len(), 1);

        let stored = identity.get_user_by_id(&alice.id).await.unwrap();
        assert_eq!((stored.posts_count, stored.streak), (1, 1));

        clock.advance(Duration::days(1));
        assert!(!posts.has_posted_today(&alice.id).await);
        posts.create_post(&alice.id, photos()).await.unwrap().unwrap();
        assert_eq!(posts.user_stats(&alice.id).await.streak, 2);
    }

    #[tokio::test]
    async fn concurrent_creates_yield_one_post() {
        let Fixture { posts, identity, .. } = fixture();
        let alice = user(&identity, "alice").await;

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let posts = posts.clone();
            let id = alice.id.clone();
            tasks.push(tokio::spawn(async move {
                posts.create_post(&id, photos()).await.unwrap().is_ok()
            }));
        }
        let mut created = 0;
        for task in tasks {
            if task.await.unwrap() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(posts.get_all_posts().await.len(), 1);
    }

    #[tokio::test]
    async fn day_boundary_follows_clock_offset() {
        let offset = FixedOffset::east_opt(-5 * 3600).unwrap();
        let late_evening = offset.with_ymd_and_hms(2026, 3, 9, 23, 30, 0).unwrap();
        let Fixture { posts, identity, clock } =
            fixture_on(Arc::new(MemoryKv::new()), ManualClock::new(late_evening));
        let alice = user(&identity, "alice").await;

        posts.create_post(&alice.id, photos()).await.unwrap().unwrap();
        assert_eq!(posts.todays_posts().await.len(), 1);

        // 00:30 local opens a new ledger day.
        clock.advance(Duration::hours(1));
        assert!(posts.todays_posts().await.is_empty());
        posts.create_post(&alice.id, photos()).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn unknown_user_and_missing_images() {
        let Fixture { posts, identity, .. } = fixture();
        assert_eq!(
            posts.create_post("ghost", photos()).await.unwrap(),
            Err(Rejection::UserNotFound)
        );

        let alice = user(&identity, "alice").await;
        let blank = NewPost {
            back_image: " ".into(),
            ..photos()
        };
        assert!(matches!(
            posts.create_post(&alice.id, blank).await.unwrap(),
            Err(Rejection::InvalidInput(_))
        ));
        assert!(!posts.has_posted_today(&alice.id).await);
    }

    #[tokio::test]
    async fn delete_is_author_only_and_updates_count() {
        let Fixture { posts, identity, .. } = fixture();
        let alice = user(&identity, "alice").await;
        let bob = user(&identity, "bob").await;
        let post = posts.create_post(&alice.id, photos()).await.unwrap().unwrap();

        assert!(!posts.delete_post(&post.id, &bob.id).await.unwrap());
        assert!(!posts.delete_post("missing", &alice.id).await.unwrap());
        assert!(posts.delete_post(&post.id, &alice.id).await.unwrap());

        assert!(posts.get_post_by_id(&post.id).await.is_none());
        assert!(posts.get_user_posts(&alice.id).await.is_empty());
        assert_eq!(identity.get_user_by_id(&alice.id).await.unwrap().posts_count, 0);
        // The ledger entry outlives the post.
        assert!(posts.has_posted_today(&alice.id).await);
    }

    #[tokio::test]
    async fn visibility_edit_is_author_only() {
        let Fixture { posts, identity, clock } = fixture();
        let alice = user(&identity, "alice").await;
        let post = posts.create_post(&alice.id, photos()).await.unwrap().unwrap();

        assert_eq!(
            posts
                .update_visibility(&post.id, "someone", Visibility::Public)
                .await
                .unwrap(),
            Err(Rejection::NotAuthorized)
        );

        clock.advance(Duration::minutes(5));
        let updated = posts
            .update_visibility(&post.id, &alice.id, Visibility::Private)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.visibility, Visibility::Private);
        assert_eq!(updated.updated_at, Some(clock.now_utc()));
        assert_eq!(posts.get_post_by_id(&post.id).await, Some(updated));
    }

    #[tokio::test]
    async fn storage_failures_never_create_posts() {
        let kv = Arc::new(FlakyKv::new(MemoryKv::new()));
        let Fixture { posts, identity, .. } =
            fixture_on(Arc::clone(&kv), ManualClock::at_utc(2026, 3, 9, 10, 0));
        let alice = user(&identity, "alice").await;

        kv.fail_writes(true);
        assert!(posts.create_post(&alice.id, photos()).await.is_err());

        kv.fail_writes(false);
        kv.fail_reads(true);
        assert!(posts.create_post(&alice.id, photos()).await.is_err());

        kv.fail_reads(false);
        assert!(posts.get_all_posts().await.is_empty());
        assert!(!posts.has_posted_today(&alice.id).await);
    }

    /// Moves forward an hour every time it is read.
    struct TickingClock(Mutex<DateTime<FixedOffset>>);

    impl Clock for TickingClock {
        fn now(&self) -> DateTime<FixedOffset> {
            let mut now = self.0.lock().unwrap();
            let current = *now;
            *now += Duration::hours(1);
            current
        }
    }

    #[tokio::test]
    async fn timestamp_and_ledger_day_come_from_one_reading() {
        let offset = FixedOffset::east_opt(0).unwrap();
        let before_midnight = offset.with_ymd_and_hms(2026, 3, 9, 23, 30, 0).unwrap();
        let kv = Arc::new(MemoryKv::new());
        let locks = KeyLocks::new();
        let clock: Arc<dyn Clock> = Arc::new(TickingClock(Mutex::new(before_midnight)));
        let identity = IdentityStore::new(Arc::clone(&kv), locks.clone());
        let store = PostStore::new(kv, locks);
        let stats = Stats::new(identity.clone(), store.clone(), Arc::clone(&clock));
        let posts = Posts::new(identity.clone(), store.clone(), stats, clock);
        let alice = user(&identity, "alice").await;

        let post = posts.create_post(&alice.id, photos()).await.unwrap().unwrap();
        assert_eq!(post.timestamp, before_midnight.with_timezone(&Utc));
        assert_eq!(
            store.daily_entry(&alice.id, "2026-03-09").await.unwrap(),
            Some(post.id)
        );
    }
}
