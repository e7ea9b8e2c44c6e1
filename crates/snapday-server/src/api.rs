use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, Method, StatusCode},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use snapday_shared::{
    Clock, Comment, FriendRequest, Friendship, NewPost, NewUser, Post, ProfileUpdate, Rejection,
    RelationshipStatus, User, UserStats, Visibility,
};
use snapday_social::{IncomingRequest, OutgoingRequest, Snapday};
use snapday_store::KvStore;

use crate::error::ServerError;

/// Header carrying the already-authenticated caller id.
pub const USER_HEADER: &str = "x-user-id";

pub struct AppState<S> {
    pub app: Snapday<S>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            app: self.app.clone(),
        }
    }
}

/// The caller, as identified by the [`USER_HEADER`] header.
pub struct CurrentUser(pub String);

impl<St: Send + Sync> FromRequestParts<St> for CurrentUser {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| CurrentUser(id.to_string()))
            .ok_or(ServerError::Unauthenticated)
    }
}

type ApiResult<T> = Result<T, ServerError>;

pub fn build_router<S: KvStore>(state: AppState<S>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        // users
        .route("/users", post(register_user::<S>))
        .route("/users/search", get(search_users::<S>))
        .route("/users/by-username/{username}", get(user_by_username::<S>))
        .route("/users/{id}", get(user_by_id::<S>))
        .route("/users/{id}/stats", get(user_stats::<S>).post(recompute_stats::<S>))
        .route("/users/{id}/friends", get(user_friends::<S>))
        .route("/users/{id}/mutual-friends", get(mutual_friends::<S>))
        .route("/users/{id}/relationship", get(relationship::<S>))
        .route("/users/{id}/posts", get(user_posts::<S>))
        .route("/me", patch(update_profile::<S>))
        .route("/me/touch", post(touch_last_active::<S>))
        // friend graph
        .route("/friends/suggestions", get(friend_suggestions::<S>))
        .route("/friends/requests", post(send_request::<S>))
        .route("/friends/requests/pending", get(pending_requests::<S>))
        .route("/friends/requests/sent", get(sent_requests::<S>))
        .route("/friends/requests/{id}/accept", post(accept_request::<S>))
        .route("/friends/requests/{id}/decline", post(decline_request::<S>))
        .route("/friends/requests/{id}/cancel", post(cancel_request::<S>))
        .route("/friends/{id}", delete(remove_friend::<S>))
        .route("/blocks/{id}", post(block_user::<S>).delete(unblock_user::<S>))
        // posts
        .route("/posts", post(create_post::<S>))
        .route("/posts/today", get(todays_posts::<S>))
        .route("/posts/today/status", get(posted_today::<S>))
        .route("/posts/{id}", get(get_post::<S>).delete(delete_post::<S>))
        .route("/posts/{id}/visibility", patch(update_visibility::<S>))
        .route("/posts/{id}/like", post(like_post::<S>).delete(unlike_post::<S>))
        .route("/posts/{id}/comments", post(add_comment::<S>))
        .route("/posts/{id}/comments/{comment_id}", delete(delete_comment::<S>))
        // feeds
        .route("/feed", get(feed::<S>))
        .route("/discover", get(discover::<S>))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct Done {
    ok: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PostedToday {
    posted_today: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Relationship {
    status: RelationshipStatus,
}

#[derive(Deserialize)]
struct SearchQuery {
    q: String,
}

#[derive(Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendRequestBody {
    to_user_id: String,
}

#[derive(Deserialize)]
struct VisibilityBody {
    visibility: Visibility,
}

#[derive(Deserialize)]
struct CommentBody {
    content: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

async fn register_user<S: KvStore>(
    State(state): State<AppState<S>>,
    Json(new_user): Json<NewUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let now = state.app.clock.now_utc();
    let user = state.app.identity.register_user(new_user, now).await??;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn search_users<S: KvStore>(
    State(state): State<AppState<S>>,
    CurrentUser(me): CurrentUser,
    Query(query): Query<SearchQuery>,
) -> Json<Vec<User>> {
    Json(state.app.identity.search_users(&query.q, Some(&me)).await)
}

async fn user_by_id<S: KvStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> ApiResult<Json<User>> {
    let user = state.app.identity.get_user_by_id(&id).await;
    Ok(Json(user.ok_or(Rejection::UserNotFound)?))
}

async fn user_by_username<S: KvStore>(
    State(state): State<AppState<S>>,
    Path(username): Path<String>,
) -> ApiResult<Json<User>> {
    let user = state.app.identity.get_user_by_username(&username).await;
    Ok(Json(user.ok_or(Rejection::UserNotFound)?))
}

async fn update_profile<S: KvStore>(
    State(state): State<AppState<S>>,
    CurrentUser(me): CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<Json<User>> {
    let now = state.app.clock.now_utc();
    Ok(Json(state.app.identity.update_profile(&me, update, now).await??))
}

async fn touch_last_active<S: KvStore>(
    State(state): State<AppState<S>>,
    CurrentUser(me): CurrentUser,
) -> ApiResult<Json<User>> {
    let now = state.app.clock.now_utc();
    Ok(Json(state.app.identity.touch_last_active(&me, now).await??))
}

async fn user_stats<S: KvStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> ApiResult<Json<UserStats>> {
    if state.app.identity.get_user_by_id(&id).await.is_none() {
        return Err(Rejection::UserNotFound.into());
    }
    Ok(Json(state.app.posts.user_stats(&id).await))
}

async fn recompute_stats<S: KvStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> ApiResult<Json<UserStats>> {
    let stats = state.app.posts.recompute_user_stats(&id).await;
    Ok(Json(stats.ok_or(Rejection::UserNotFound)?))
}

async fn user_friends<S: KvStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Json<Vec<User>> {
    Json(state.app.friends.user_friends(&id).await)
}

async fn mutual_friends<S: KvStore>(
    State(state): State<AppState<S>>,
    CurrentUser(me): CurrentUser,
    Path(id): Path<String>,
) -> Json<Vec<User>> {
    Json(state.app.friends.mutual_friends(&me, &id).await)
}

async fn relationship<S: KvStore>(
    State(state): State<AppState<S>>,
    CurrentUser(me): CurrentUser,
    Path(id): Path<String>,
) -> Json<Relationship> {
    let status = state.app.friends.friendship_status(&me, &id).await;
    Json(Relationship { status })
}

async fn user_posts<S: KvStore>(
    State(state): State<AppState<S>>,
    CurrentUser(me): CurrentUser,
    Path(id): Path<String>,
) -> Json<Vec<Post>> {
    Json(state.app.feed.visible_user_posts(&me, &id).await)
}

// ---------------------------------------------------------------------------
// Friend graph
// ---------------------------------------------------------------------------

async fn friend_suggestions<S: KvStore>(
    State(state): State<AppState<S>>,
    CurrentUser(me): CurrentUser,
    Query(query): Query<LimitQuery>,
) -> Json<Vec<User>> {
    let limit = query.limit.unwrap_or(state.app.settings.suggestion_limit);
    Json(state.app.friends.friend_suggestions(&me, limit).await)
}

async fn send_request<S: KvStore>(
    State(state): State<AppState<S>>,
    CurrentUser(me): CurrentUser,
    Json(body): Json<SendRequestBody>,
) -> ApiResult<(StatusCode, Json<FriendRequest>)> {
    let request = state
        .app
        .friends
        .send_friend_request(&me, &body.to_user_id)
        .await??;
    Ok((StatusCode::CREATED, Json(request)))
}

async fn pending_requests<S: KvStore>(
    State(state): State<AppState<S>>,
    CurrentUser(me): CurrentUser,
) -> Json<Vec<IncomingRequest>> {
    Json(state.app.friends.pending_requests(&me).await)
}

async fn sent_requests<S: KvStore>(
    State(state): State<AppState<S>>,
    CurrentUser(me): CurrentUser,
) -> Json<Vec<OutgoingRequest>> {
    Json(state.app.friends.sent_requests(&me).await)
}

async fn accept_request<S: KvStore>(
    State(state): State<AppState<S>>,
    CurrentUser(me): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Friendship>> {
    Ok(Json(state.app.friends.accept_friend_request(&id, &me).await??))
}

async fn decline_request<S: KvStore>(
    State(state): State<AppState<S>>,
    CurrentUser(me): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Done>> {
    state.app.friends.decline_friend_request(&id, &me).await??;
    Ok(Json(Done { ok: true }))
}

async fn cancel_request<S: KvStore>(
    State(state): State<AppState<S>>,
    CurrentUser(me): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Done>> {
    state.app.friends.cancel_friend_request(&id, &me).await??;
    Ok(Json(Done { ok: true }))
}

async fn remove_friend<S: KvStore>(
    State(state): State<AppState<S>>,
    CurrentUser(me): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Done>> {
    state.app.friends.remove_friend(&me, &id).await??;
    Ok(Json(Done { ok: true }))
}

async fn block_user<S: KvStore>(
    State(state): State<AppState<S>>,
    CurrentUser(me): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Done>> {
    state.app.friends.block_user(&me, &id).await??;
    Ok(Json(Done { ok: true }))
}

async fn unblock_user<S: KvStore>(
    State(state): State<AppState<S>>,
    CurrentUser(me): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Done>> {
    state.app.friends.unblock_user(&me, &id).await??;
    Ok(Json(Done { ok: true }))
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

async fn create_post<S: KvStore>(
    State(state): State<AppState<S>>,
    CurrentUser(me): CurrentUser,
    Json(data): Json<NewPost>,
) -> ApiResult<(StatusCode, Json<Post>)> {
    let post = state.app.posts.create_post(&me, data).await??;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn todays_posts<S: KvStore>(
    State(state): State<AppState<S>>,
    CurrentUser(me): CurrentUser,
) -> Json<Vec<Post>> {
    let mut visible = Vec::new();
    for post in state.app.posts.todays_posts().await {
        if state.app.feed.can_see(&post, &me).await {
            visible.push(post);
        }
    }
    Json(visible)
}

async fn posted_today<S: KvStore>(
    State(state): State<AppState<S>>,
    CurrentUser(me): CurrentUser,
) -> Json<PostedToday> {
    Json(PostedToday {
        posted_today: state.app.posts.has_posted_today(&me).await,
    })
}

/// Posts the caller may not see are reported as missing.
async fn get_post<S: KvStore>(
    State(state): State<AppState<S>>,
    CurrentUser(me): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Post>> {
    let Some(post) = state.app.posts.get_post_by_id(&id).await else {
        return Err(ServerError::NotFound(format!("post {id}")));
    };
    if !state.app.feed.can_see(&post, &me).await {
        return Err(ServerError::NotFound(format!("post {id}")));
    }
    Ok(Json(post))
}

async fn delete_post<S: KvStore>(
    State(state): State<AppState<S>>,
    CurrentUser(me): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Done>> {
    state.app.posts.remove_post(&id, &me).await??;
    Ok(Json(Done { ok: true }))
}

async fn update_visibility<S: KvStore>(
    State(state): State<AppState<S>>,
    CurrentUser(me): CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<VisibilityBody>,
) -> ApiResult<Json<Post>> {
    let post = state
        .app
        .posts
        .update_visibility(&id, &me, body.visibility)
        .await??;
    Ok(Json(post))
}

async fn like_post<S: KvStore>(
    State(state): State<AppState<S>>,
    CurrentUser(me): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Done>> {
    let ok = state.app.engagement.like_post(&id, &me).await?;
    Ok(Json(Done { ok }))
}

async fn unlike_post<S: KvStore>(
    State(state): State<AppState<S>>,
    CurrentUser(me): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Done>> {
    let ok = state.app.engagement.unlike_post(&id, &me).await?;
    Ok(Json(Done { ok }))
}

async fn add_comment<S: KvStore>(
    State(state): State<AppState<S>>,
    CurrentUser(me): CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<CommentBody>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    match state.app.engagement.add_comment(&id, &me, &body.content).await? {
        Some(comment) => Ok((StatusCode::CREATED, Json(comment))),
        None => Err(ServerError::NotFound(format!("post {id}"))),
    }
}

async fn delete_comment<S: KvStore>(
    State(state): State<AppState<S>>,
    CurrentUser(me): CurrentUser,
    Path((id, comment_id)): Path<(String, String)>,
) -> ApiResult<Json<Done>> {
    let ok = state
        .app
        .engagement
        .delete_comment(&id, &comment_id, &me)
        .await?;
    Ok(Json(Done { ok }))
}

// ---------------------------------------------------------------------------
// Feeds
// ---------------------------------------------------------------------------

async fn feed<S: KvStore>(
    State(state): State<AppState<S>>,
    CurrentUser(me): CurrentUser,
) -> Json<Vec<Post>> {
    Json(state.app.feed.feed_posts(&me).await)
}

async fn discover<S: KvStore>(
    State(state): State<AppState<S>>,
    CurrentUser(me): CurrentUser,
) -> Json<Vec<Post>> {
    Json(state.app.feed.discovery_posts(&me).await)
}

pub async fn serve<S: KvStore>(state: AppState<S>, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
