//! Logical key namespace.
//!
//! Global collections live under fixed keys, per-user indices under
//! `user_posts:<user>`, and the daily ledger under
//! `daily_posts:<user>:<YYYY-MM-DD>`.

pub const USERS: &str = "users";
pub const FRIEND_REQUESTS: &str = "friend_requests";
pub const FRIENDSHIPS: &str = "friendships";
pub const BLOCKS: &str = "blocks";
pub const POSTS: &str = "posts";

const USER_POSTS_PREFIX: &str = "user_posts";
const DAILY_POSTS_PREFIX: &str = "daily_posts";

pub fn user_posts(user_id: &str) -> String {
    format!("{USER_POSTS_PREFIX}:{user_id}")
}

pub fn daily_post(user_id: &str, day: &str) -> String {
    format!("{DAILY_POSTS_PREFIX}:{user_id}:{day}")
}

/// Lock name guarding the post-creation gate of one user.
pub fn post_gate(user_id: &str) -> String {
    format!("gate:{user_id}")
}

/// Lock name guarding read-modify-write of one post.
pub fn post_record(post_id: &str) -> String {
    format!("post:{post_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespaced_keys() {
        assert_eq!(user_posts("user_1"), "user_posts:user_1");
        assert_eq!(daily_post("user_1", "2026-03-09"), "daily_posts:user_1:2026-03-09");
    }
}
