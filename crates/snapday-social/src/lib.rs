//! # snapday-social
//!
//! The social rules of snapday on top of `snapday-store`:
//!
//! - [`Posts`]: one post per user per local day, deletion, visibility edits
//! - [`FriendGraph`]: friend requests, friendships and blocks
//! - [`FeedResolver`]: who sees which post, in the feed and on discovery
//! - [`Engagement`]: likes and comments
//!
//! [`Snapday`] wires them together over one backend and one clock.

pub mod app;
pub mod engagement;
pub mod feed;
pub mod friends;
pub mod posts;
pub mod stats;

pub use app::{Snapday, SocialSettings};
pub use engagement::Engagement;
pub use feed::FeedResolver;
pub use friends::{FriendGraph, IncomingRequest, OutgoingRequest};
pub use posts::Posts;
pub use stats::{compute_streak, Stats};
