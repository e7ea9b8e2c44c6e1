use thiserror::Error;

/// A business rule turned the request down.
///
/// Rejections are ordinary outcomes, not failures: the caller decides what to
/// show the user. Storage failures travel on a separate channel (the store
/// crate's `StoreError`), so an `Outcome` is always nested inside it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("User has already posted today")]
    AlreadyPostedToday,

    #[error("User not found")]
    UserNotFound,

    #[error("Post not found")]
    PostNotFound,

    #[error("Post already liked")]
    AlreadyLiked,

    #[error("Comment not found")]
    CommentNotFound,

    #[error("Cannot send a friend request to yourself")]
    SelfRequest,

    #[error("Users are already friends")]
    AlreadyFriends,

    #[error("User is not accepting friend requests")]
    RequestsDisabled,

    #[error("Friend request already sent")]
    RequestAlreadyPending,

    #[error("Friend request not found")]
    RequestNotFound,

    #[error("Friend request already processed")]
    RequestNotPending,

    #[error("Friendship not found")]
    FriendshipNotFound,

    #[error("One of the users has blocked the other")]
    Blocked,

    #[error("User is not blocked")]
    NotBlocked,

    #[error("Not authorized")]
    NotAuthorized,

    #[error("Email already exists")]
    EmailTaken,

    #[error("Username already taken")]
    UsernameTaken,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result of an operation that may be turned down by a business rule.
pub type Outcome<T> = std::result::Result<T, Rejection>;
