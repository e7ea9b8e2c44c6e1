//! # snapday-shared
//!
//! Domain types shared by every snapday crate: user, friend-graph and post
//! records, the business-rule [`Rejection`] taxonomy, and the injectable
//! [`Clock`] that defines what "today" means.

pub mod clock;
pub mod constants;
pub mod error;
pub mod models;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Outcome, Rejection};
pub use models::*;
pub use types::*;
