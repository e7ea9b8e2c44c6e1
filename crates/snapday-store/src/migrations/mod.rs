//! Schema migrations for the key-value database.
//!
//! Applied in order by [`SqliteKv::open_at`]. The `user_version` pragma
//! records the last applied step, so reopening a database is a no-op.
//!
//! [`SqliteKv::open_at`]: crate::database::SqliteKv::open_at

pub mod v001_initial;

use rusqlite::Connection;

use crate::error::{Result, StoreError};

type Step = fn(&Connection) -> std::result::Result<(), rusqlite::Error>;

/// Every migration, indexed by the version it upgrades to minus one.
const STEPS: &[(&str, Step)] = &[("v001_initial", v001_initial::up)];

/// Apply every step newer than the database's `user_version`.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let applied: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    let target = STEPS.len() as u32;
    tracing::debug!(applied, target, "checking schema version");

    for (version, (name, up)) in (1u32..).zip(STEPS) {
        if version <= applied {
            continue;
        }
        tracing::info!(migration = name, "applying schema migration");
        up(conn).map_err(|e| StoreError::Migration(format!("{name}: {e}")))?;
        conn.pragma_update(None, "user_version", version)?;
    }

    Ok(())
}
