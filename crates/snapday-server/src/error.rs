use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use snapday_shared::Rejection;
use snapday_store::StoreError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Missing or invalid x-user-id header")]
    Unauthenticated,
}

fn rejection_status(rejection: &Rejection) -> StatusCode {
    match rejection {
        Rejection::AlreadyPostedToday
        | Rejection::AlreadyFriends
        | Rejection::AlreadyLiked
        | Rejection::RequestAlreadyPending
        | Rejection::RequestNotPending
        | Rejection::EmailTaken
        | Rejection::UsernameTaken => StatusCode::CONFLICT,
        Rejection::UserNotFound
        | Rejection::PostNotFound
        | Rejection::CommentNotFound
        | Rejection::RequestNotFound
        | Rejection::FriendshipNotFound
        | Rejection::NotBlocked => StatusCode::NOT_FOUND,
        Rejection::SelfRequest | Rejection::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Rejection::RequestsDisabled | Rejection::Blocked | Rejection::NotAuthorized => {
            StatusCode::FORBIDDEN
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::Rejected(rejection) => (rejection_status(rejection), self.to_string()),
            ServerError::Store(e) => {
                tracing::error!(error = %e, "storage failure while handling request");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()),
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}
