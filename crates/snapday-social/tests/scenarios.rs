//! End-to-end behaviour of the social services over a real backend.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Duration;
use snapday_shared::{Clock, ManualClock, NewPost, NewUser, Post, RelationshipStatus, User, Visibility};
use snapday_social::{Snapday, SocialSettings};
use snapday_store::{KvStore, MemoryKv, SqliteKv};

struct World<S> {
    app: Snapday<S>,
    clock: Arc<ManualClock>,
}

fn world_on<S: KvStore>(kv: S) -> World<S> {
    let clock = Arc::new(ManualClock::at_utc(2026, 3, 9, 10, 0));
    let dyn_clock: Arc<dyn Clock> = clock.clone();
    World {
        app: Snapday::new(Arc::new(kv), dyn_clock, SocialSettings::default()),
        clock,
    }
}

fn world() -> World<MemoryKv> {
    world_on(MemoryKv::new())
}

async fn register<S: KvStore>(app: &Snapday<S>, name: &str) -> User {
    app.identity
        .register_user(
            NewUser {
                username: name.into(),
                email: format!("{name}@example.com"),
                display_name: name.to_uppercase(),
                bio: None,
            },
            chrono::Utc::now(),
        )
        .await
        .unwrap()
        .unwrap()
}

async fn befriend<S: KvStore>(app: &Snapday<S>, a: &User, b: &User) {
    let request = app
        .friends
        .send_friend_request(&a.id, &b.id)
        .await
        .unwrap()
        .unwrap();
    app.friends
        .accept_friend_request(&request.id, &b.id)
        .await
        .unwrap()
        .unwrap();
}

async fn post<S: KvStore>(app: &Snapday<S>, author: &User, visibility: Visibility) -> Post {
    app.posts
        .create_post(
            &author.id,
            NewPost {
                front_image: "file:///front.jpg".into(),
                back_image: "file:///back.jpg".into(),
                visibility: Some(visibility),
                ..NewPost::default()
            },
        )
        .await
        .unwrap()
        .unwrap()
}

fn ids(posts: Vec<Post>) -> HashSet<String> {
    posts.into_iter().map(|p| p.id).collect()
}

#[tokio::test]
async fn one_post_per_local_day() {
    let World { app, clock } = world();
    let alice = register(&app, "alice").await;

    post(&app, &alice, Visibility::Friends).await;
    clock.advance(Duration::hours(4));
    let again = app
        .posts
        .create_post(
            &alice.id,
            NewPost {
                front_image: "f".into(),
                back_image: "b".into(),
                ..NewPost::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(again, Err(snapday_shared::Rejection::AlreadyPostedToday));
    assert_eq!(app.posts.get_user_posts(&alice.id).await.len(), 1);
    assert_eq!(app.posts.todays_posts().await.len(), 1);
}

#[tokio::test]
async fn friendship_is_symmetric() {
    let World { app, .. } = world();
    let a = register(&app, "a").await;
    let b = register(&app, "b").await;
    befriend(&app, &a, &b).await;

    assert_eq!(
        app.friends.are_friends(&a.id, &b.id).await,
        app.friends.are_friends(&b.id, &a.id).await
    );
    assert_eq!(app.friends.user_friends(&a.id).await[0].id, b.id);
    assert_eq!(app.friends.user_friends(&b.id).await[0].id, a.id);
    assert_eq!(
        app.friends.friendship_status(&b.id, &a.id).await,
        RelationshipStatus::Friends
    );
}

#[tokio::test]
async fn feed_matches_visibility_predicate() {
    let World { app, clock } = world();
    let x = register(&app, "x").await;
    let f = register(&app, "f").await;
    let s = register(&app, "s").await;
    befriend(&app, &x, &f).await;

    let friends_only = post(&app, &x, Visibility::Friends).await;
    post(&app, &s, Visibility::Public).await;
    clock.advance(Duration::days(1));
    let private = post(&app, &x, Visibility::Private).await;

    assert!(app.feed.can_see(&friends_only, &f.id).await);
    assert!(!app.feed.can_see(&friends_only, &s.id).await);
    assert!(!app.feed.can_see(&private, &f.id).await);

    for viewer in [&x, &f, &s] {
        let feed = ids(app.feed.feed_posts(&viewer.id).await);
        for p in app.posts.get_all_posts().await {
            assert_eq!(app.feed.can_see(&p, &viewer.id).await, feed.contains(&p.id));
        }
    }
    assert!(ids(app.feed.feed_posts(&f.id).await).contains(&friends_only.id));
    assert!(!ids(app.feed.feed_posts(&s.id).await).contains(&friends_only.id));
}

#[tokio::test]
async fn discovery_shows_strangers_only() {
    let World { app, .. } = world();
    let v = register(&app, "v").await;
    let f = register(&app, "f").await;
    let s = register(&app, "s").await;
    befriend(&app, &v, &f).await;

    let own = post(&app, &v, Visibility::Public).await;
    let friend = post(&app, &f, Visibility::Public).await;
    let stranger = post(&app, &s, Visibility::Public).await;

    let discovery = ids(app.feed.discovery_posts(&v.id).await);
    assert!(discovery.contains(&stranger.id));
    assert!(!discovery.contains(&friend.id));
    assert!(!discovery.contains(&own.id));
}

#[tokio::test]
async fn likes_and_comment_deletion() {
    let World { app, .. } = world();
    let author = register(&app, "author").await;
    let commenter = register(&app, "commenter").await;
    let random = register(&app, "random").await;
    let p = post(&app, &author, Visibility::Public).await;

    assert!(app.engagement.like_post(&p.id, &commenter.id).await.unwrap());
    assert!(!app.engagement.like_post(&p.id, &commenter.id).await.unwrap());
    let likes = app.posts.get_post_by_id(&p.id).await.unwrap().likes;
    assert_eq!(likes.iter().filter(|l| l.user_id == commenter.id).count(), 1);

    let comment = app
        .engagement
        .add_comment(&p.id, &commenter.id, "hello")
        .await
        .unwrap()
        .unwrap();
    assert!(!app
        .engagement
        .delete_comment(&p.id, &comment.id, &random.id)
        .await
        .unwrap());
    assert_eq!(app.posts.get_post_by_id(&p.id).await.unwrap().comments.len(), 1);
    assert!(app
        .engagement
        .delete_comment(&p.id, &comment.id, &author.id)
        .await
        .unwrap());
}

#[tokio::test]
async fn streak_tracks_consecutive_days() {
    let World { app, clock } = world();
    let alice = register(&app, "alice").await;

    for _ in 0..3 {
        post(&app, &alice, Visibility::Friends).await;
        clock.advance(Duration::days(1));
    }
    clock.advance(Duration::days(-1));
    let stored = app.identity.get_user_by_id(&alice.id).await.unwrap();
    assert_eq!((stored.posts_count, stored.streak), (3, 3));

    clock.advance(Duration::days(2));
    assert_eq!(app.posts.user_stats(&alice.id).await.streak, 0);
}

#[tokio::test]
async fn sqlite_backend_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapday.db");

    let (alice_id, post_id) = {
        let World { app, .. } = world_on(SqliteKv::open_at(&path).unwrap());
        let alice = register(&app, "alice").await;
        let p = post(&app, &alice, Visibility::Public).await;
        assert!(app.engagement.like_post(&p.id, &alice.id).await.unwrap());
        (alice.id, p.id)
    };

    let World { app, .. } = world_on(SqliteKv::open_at(&path).unwrap());
    let stored = app.posts.get_post_by_id(&post_id).await.unwrap();
    assert_eq!(stored.likes.len(), 1);
    assert!(app.posts.has_posted_today(&alice_id).await);
    assert_eq!(app.posts.get_user_posts(&alice_id).await, vec![stored]);
}

#[tokio::test]
async fn stored_json_uses_camel_case() {
    let World { app, .. } = world();
    let alice = register(&app, "alice").await;
    let p = post(&app, &alice, Visibility::Public).await;

    let json = serde_json::to_value(&p).unwrap();
    assert_eq!(json["userId"], alice.id.as_str());
    assert_eq!(json["visibility"], "public");
    assert_eq!(json["lateMinutes"], 0);
}
