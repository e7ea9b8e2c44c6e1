/// Application name
pub const APP_NAME: &str = "snapday";

/// Maximum number of posts returned by the discovery surface.
pub const DISCOVERY_LIMIT: usize = 50;

/// Default number of friend suggestions.
pub const DEFAULT_SUGGESTION_LIMIT: usize = 10;

/// Milliseconds in one calendar day, used by the streak arithmetic.
pub const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Record id prefixes
pub const USER_ID_PREFIX: &str = "user";
pub const POST_ID_PREFIX: &str = "post";
pub const LIKE_ID_PREFIX: &str = "like";
pub const COMMENT_ID_PREFIX: &str = "comment";
pub const FRIEND_REQUEST_ID_PREFIX: &str = "friendRequest";
pub const FRIENDSHIP_ID_PREFIX: &str = "friendship";
