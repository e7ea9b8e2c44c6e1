use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generate a record id of the form `<prefix>_<uuid>`.
pub fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

/// Who may see a post (or a profile) besides its owner.
///
/// The three variants are a closed contract: `Private` hides a post even
/// from friends, `Friends` requires an active friendship, `Public` is
/// visible to everyone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Friends,
    Private,
}

impl Visibility {
    /// Whether a non-owner viewer sees content with this visibility.
    ///
    /// `is_friend` is only consulted for [`Visibility::Friends`].
    pub fn admits(self, is_friend: bool) -> bool {
        match self {
            Self::Public => true,
            Self::Friends => is_friend,
            Self::Private => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendRequestStatus {
    Pending,
    Accepted,
    Declined,
}

/// Lifecycle of a friendship record.
///
/// `Removed` is a plain unfriend, `Blocked` is the tombstone left by a block.
/// Neither counts as a friendship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendshipStatus {
    Active,
    Removed,
    Blocked,
}

/// Relationship between a viewer and another user, as shown in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipStatus {
    None,
    PendingSent,
    PendingReceived,
    Friends,
}

/// Which side of a friend request a listing is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestDirection {
    Sent,
    Received,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_id_has_prefix_and_is_unique() {
        let a = new_id("post");
        let b = new_id("post");
        assert!(a.starts_with("post_"));
        assert_ne!(a, b);
    }

    #[test]
    fn visibility_precedence() {
        assert!(Visibility::Public.admits(false));
        assert!(Visibility::Friends.admits(true));
        assert!(!Visibility::Friends.admits(false));
        assert!(!Visibility::Private.admits(true));
    }

    #[test]
    fn visibility_wire_format() {
        let json = serde_json::to_string(&Visibility::Friends).unwrap();
        assert_eq!(json, "\"friends\"");
        assert_eq!(Visibility::default(), Visibility::Friends);

        let status = serde_json::to_string(&RelationshipStatus::PendingSent).unwrap();
        assert_eq!(status, "\"pending_sent\"");
    }
}
