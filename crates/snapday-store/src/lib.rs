//! # snapday-store
//!
//! Durable state for snapday, laid out over an asynchronous key-value store.
//!
//! Records are kept as JSON collections under fixed logical keys: global
//! collections (users, friend requests, friendships, blocks, posts), one
//! post index per user, and one daily-ledger entry per user and calendar day.
//! [`SqliteKv`] persists those keys in a single SQLite table; [`MemoryKv`]
//! keeps them in process memory.
//!
//! Reads degrade to empty defaults when storage fails. Writes never do:
//! every read-modify-write reloads strictly and propagates the failure.

pub mod collection;
pub mod database;
pub mod identity;
pub mod keys;
pub mod kv;
pub mod locks;
pub mod migrations;
pub mod posts;

mod error;

pub use collection::Collection;
pub use database::SqliteKv;
pub use error::{Degrade, Result, StoreError};
pub use identity::IdentityStore;
pub use kv::{FlakyKv, KvStore, MemoryKv};
pub use locks::KeyLocks;
pub use posts::PostStore;
