//! Friend Graph: requests, friendships and blocks between users.
//!
//! A request moves `pending -> accepted | declined`, or is withdrawn by its
//! sender while still pending. Accepting creates an active friendship;
//! unfriending and blocking leave a `removed` or `blocked` record behind.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use snapday_shared::constants::{FRIENDSHIP_ID_PREFIX, FRIEND_REQUEST_ID_PREFIX};
use snapday_shared::{
    new_id, Clock, FriendRequest, FriendRequestStatus, Friendship, FriendshipStatus, Outcome,
    Rejection, RelationshipStatus, RequestDirection, User,
};
use snapday_store::{IdentityStore, KvStore, Result};

use crate::stats::Stats;

/// A pending request addressed to the viewer, with its sender.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingRequest {
    #[serde(flatten)]
    pub request: FriendRequest,
    pub from_user: User,
}

/// A pending request sent by the viewer, with its recipient.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingRequest {
    #[serde(flatten)]
    pub request: FriendRequest,
    pub to_user: User,
}

pub struct FriendGraph<S> {
    identity: IdentityStore<S>,
    stats: Stats<S>,
    clock: Arc<dyn Clock>,
}

impl<S> Clone for FriendGraph<S> {
    fn clone(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            stats: self.stats.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S: KvStore> FriendGraph<S> {
    pub fn new(identity: IdentityStore<S>, stats: Stats<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            identity,
            stats,
            clock,
        }
    }

    // ------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------

    pub async fn send_friend_request(&self, from: &str, to: &str) -> Result<Outcome<FriendRequest>> {
        if from == to {
            return Ok(Err(Rejection::SelfRequest));
        }
        let Some(target) = self.identity.find_user(to).await? else {
            return Ok(Err(Rejection::UserNotFound));
        };
        if self.identity.find_user(from).await?.is_none() {
            return Ok(Err(Rejection::UserNotFound));
        }
        if self.identity.check_friends(from, to).await? {
            return Ok(Err(Rejection::AlreadyFriends));
        }
        if !target.settings.allow_friend_requests {
            return Ok(Err(Rejection::RequestsDisabled));
        }
        if self.identity.check_blocked_between(from, to).await? {
            return Ok(Err(Rejection::Blocked));
        }

        let now = self.clock.now_utc();
        let outcome = self
            .identity
            .update_friend_requests(|requests| {
                if requests.iter().any(|r| r.is_pending_between(from, to)) {
                    return Err(Rejection::RequestAlreadyPending);
                }
                let request = FriendRequest {
                    id: new_id(FRIEND_REQUEST_ID_PREFIX),
                    from_user_id: from.to_string(),
                    to_user_id: to.to_string(),
                    status: FriendRequestStatus::Pending,
                    timestamp: now,
                };
                requests.push(request.clone());
                Ok(request)
            })
            .await?;

        match &outcome {
            Ok(request) => info!(request = %request.id, from, to, "friend request sent"),
            Err(rejection) => debug!(from, to, %rejection, "friend request rejected"),
        }
        Ok(outcome)
    }

    /// Accept a pending request addressed to `by`.
    pub async fn accept_friend_request(&self, request_id: &str, by: &str) -> Result<Outcome<Friendship>> {
        let accepted = self
            .identity
            .update_friend_requests(|requests| {
                let request = requests
                    .iter_mut()
                    .find(|r| r.id == request_id)
                    .ok_or(Rejection::RequestNotFound)?;
                if request.to_user_id != by {
                    return Err(Rejection::NotAuthorized);
                }
                if !request.is_pending() {
                    return Err(Rejection::RequestNotPending);
                }
                request.status = FriendRequestStatus::Accepted;
                Ok(request.clone())
            })
            .await?;
        let request = match accepted {
            Ok(request) => request,
            Err(rejection) => {
                debug!(request = %request_id, by, %rejection, "accept rejected");
                return Ok(Err(rejection));
            }
        };

        let (a, b) = (request.from_user_id.as_str(), request.to_user_id.as_str());
        let now = self.clock.now_utc();
        let friendship = self
            .identity
            .update_friendships(|friendships| {
                if let Some(existing) = friendships.iter().find(|f| f.is_active() && f.connects(a, b)) {
                    return Ok(existing.clone());
                }
                let friendship = Friendship {
                    id: new_id(FRIENDSHIP_ID_PREFIX),
                    user1_id: a.to_string(),
                    user2_id: b.to_string(),
                    created_at: now,
                    status: FriendshipStatus::Active,
                };
                friendships.push(friendship.clone());
                Ok(friendship)
            })
            .await?;

        self.stats.refresh(a).await;
        self.stats.refresh(b).await;
        if let Ok(friendship) = &friendship {
            info!(friendship = %friendship.id, user1 = a, user2 = b, "friend request accepted");
        }
        Ok(friendship)
    }

    pub async fn decline_friend_request(&self, request_id: &str, by: &str) -> Result<Outcome<()>> {
        let outcome = self
            .identity
            .update_friend_requests(|requests| {
                let request = requests
                    .iter_mut()
                    .find(|r| r.id == request_id)
                    .ok_or(Rejection::RequestNotFound)?;
                if request.to_user_id != by {
                    return Err(Rejection::NotAuthorized);
                }
                if !request.is_pending() {
                    return Err(Rejection::RequestNotPending);
                }
                request.status = FriendRequestStatus::Declined;
                Ok(())
            })
            .await?;
        debug!(request = %request_id, by, ok = outcome.is_ok(), "decline friend request");
        Ok(outcome)
    }

    /// Withdraw a pending request. Only its sender may do this.
    pub async fn cancel_friend_request(&self, request_id: &str, by: &str) -> Result<Outcome<()>> {
        let outcome = self
            .identity
            .update_friend_requests(|requests| {
                let index = requests
                    .iter()
                    .position(|r| r.id == request_id)
                    .ok_or(Rejection::RequestNotFound)?;
                if requests[index].from_user_id != by {
                    return Err(Rejection::NotAuthorized);
                }
                if !requests[index].is_pending() {
                    return Err(Rejection::RequestNotPending);
                }
                requests.remove(index);
                Ok(())
            })
            .await?;
        debug!(request = %request_id, by, ok = outcome.is_ok(), "cancel friend request");
        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Friendships
    // ------------------------------------------------------------------

    pub async fn remove_friend(&self, user_id: &str, friend_id: &str) -> Result<Outcome<()>> {
        let outcome = self
            .end_friendship(user_id, friend_id, FriendshipStatus::Removed)
            .await?;
        if outcome.is_ok() {
            self.stats.refresh(user_id).await;
            self.stats.refresh(friend_id).await;
            info!(user = %user_id, friend = %friend_id, "friend removed");
        }
        Ok(outcome)
    }

    async fn end_friendship(&self, a: &str, b: &str, status: FriendshipStatus) -> Result<Outcome<()>> {
        self.identity
            .update_friendships(|friendships| {
                let friendship = friendships
                    .iter_mut()
                    .find(|f| f.is_active() && f.connects(a, b))
                    .ok_or(Rejection::FriendshipNotFound)?;
                friendship.status = status;
                Ok(())
            })
            .await
    }

    /// Cut every tie with `target` and keep them from reconnecting.
    ///
    /// An active friendship becomes `blocked`, requests from `target` are
    /// declined, requests to `target` are withdrawn, and a block record
    /// stops new requests in either direction until [`unblock_user`](Self::unblock_user).
    pub async fn block_user(&self, user_id: &str, target: &str) -> Result<Outcome<()>> {
        if user_id == target {
            return Ok(Err(Rejection::InvalidInput("cannot block yourself".into())));
        }
        for id in [user_id, target] {
            if self.identity.find_user(id).await?.is_none() {
                return Ok(Err(Rejection::UserNotFound));
            }
        }

        let was_friend = self
            .end_friendship(user_id, target, FriendshipStatus::Blocked)
            .await?
            .is_ok();

        let _: Outcome<()> = self
            .identity
            .update_friend_requests(|requests| {
                requests.retain(|r| !r.is_pending_between(user_id, target));
                for request in requests.iter_mut() {
                    if request.is_pending_between(target, user_id) {
                        request.status = FriendRequestStatus::Declined;
                    }
                }
                Ok(())
            })
            .await?;

        self.identity
            .add_block(user_id, target, self.clock.now_utc())
            .await?;

        if was_friend {
            self.stats.refresh(user_id).await;
            self.stats.refresh(target).await;
        }
        info!(user = %user_id, target, was_friend, "user blocked");
        Ok(Ok(()))
    }

    pub async fn unblock_user(&self, user_id: &str, target: &str) -> Result<Outcome<()>> {
        if self.identity.remove_block(user_id, target).await? {
            info!(user = %user_id, target, "user unblocked");
            Ok(Ok(()))
        } else {
            Ok(Err(Rejection::NotBlocked))
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub async fn are_friends(&self, a: &str, b: &str) -> bool {
        self.identity.are_friends(a, b).await
    }

    pub async fn friend_ids(&self, user_id: &str) -> HashSet<String> {
        self.identity.friend_ids(user_id).await
    }

    pub async fn user_friends(&self, user_id: &str) -> Vec<User> {
        self.identity.get_user_friends(user_id).await
    }

    /// How `other` relates to `viewer`. An active friendship wins over any
    /// pending request.
    pub async fn friendship_status(&self, viewer: &str, other: &str) -> RelationshipStatus {
        if self.identity.are_friends(viewer, other).await {
            return RelationshipStatus::Friends;
        }
        let requests = self.identity.get_friend_requests().await;
        if requests.iter().any(|r| r.is_pending_between(viewer, other)) {
            RelationshipStatus::PendingSent
        } else if requests.iter().any(|r| r.is_pending_between(other, viewer)) {
            RelationshipStatus::PendingReceived
        } else {
            RelationshipStatus::None
        }
    }

    /// Users the viewer might know: not themselves, not already friends,
    /// not private and not blocked, most recently active first.
    pub async fn friend_suggestions(&self, user_id: &str, limit: usize) -> Vec<User> {
        let friends = self.identity.friend_ids(user_id).await;
        let blocked: HashSet<String> = self
            .identity
            .get_blocks()
            .await
            .into_iter()
            .filter_map(|b| {
                if b.blocker_id == user_id {
                    Some(b.blocked_id)
                } else if b.blocked_id == user_id {
                    Some(b.blocker_id)
                } else {
                    None
                }
            })
            .collect();

        let mut candidates: Vec<User> = self
            .identity
            .get_all_users()
            .await
            .into_iter()
            .filter(|u| u.id != user_id)
            .filter(|u| !friends.contains(&u.id) && !blocked.contains(&u.id))
            .filter(|u| !u.has_private_profile())
            .collect();
        candidates.sort_by(|a, b| b.last_active.cmp(&a.last_active));
        candidates.truncate(limit);
        candidates
    }

    /// Pending requests addressed to `user_id`, with their senders.
    pub async fn pending_requests(&self, user_id: &str) -> Vec<IncomingRequest> {
        let requests = self
            .identity
            .user_friend_requests(user_id, RequestDirection::Received)
            .await;
        self.attach_users(requests, |r| &r.from_user_id)
            .await
            .into_iter()
            .map(|(request, from_user)| IncomingRequest { request, from_user })
            .collect()
    }

    /// Pending requests sent by `user_id`, with their recipients.
    pub async fn sent_requests(&self, user_id: &str) -> Vec<OutgoingRequest> {
        let requests = self
            .identity
            .user_friend_requests(user_id, RequestDirection::Sent)
            .await
            .into_iter()
            .filter(FriendRequest::is_pending)
            .collect();
        self.attach_users(requests, |r| &r.to_user_id)
            .await
            .into_iter()
            .map(|(request, to_user)| OutgoingRequest { request, to_user })
            .collect()
    }

    /// Pair each request with the user `counterpart` names, dropping requests
    /// whose user no longer exists.
    async fn attach_users(
        &self,
        requests: Vec<FriendRequest>,
        counterpart: impl Fn(&FriendRequest) -> &String,
    ) -> Vec<(FriendRequest, User)> {
        if requests.is_empty() {
            return Vec::new();
        }
        let users = self.identity.get_all_users().await;
        requests
            .into_iter()
            .filter_map(|request| {
                let user = users.iter().find(|u| &u.id == counterpart(&request))?.clone();
                Some((request, user))
            })
            .collect()
    }

    /// Users who are friends with both `a` and `b`.
    pub async fn mutual_friends(&self, a: &str, b: &str) -> Vec<User> {
        let mine = self.identity.friend_ids(a).await;
        let theirs = self.identity.friend_ids(b).await;
        let mutual: HashSet<&String> = mine.intersection(&theirs).collect();
        if mutual.is_empty() {
            return Vec::new();
        }
        self.identity
            .get_all_users()
            .await
            .into_iter()
            .filter(|u| mutual.contains(&u.id))
            .collect()
    }
}
