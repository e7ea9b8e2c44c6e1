//! v001 -- Initial schema creation.
//!
//! A single `kv` table holds every logical key. Values are JSON documents
//! (collections) or plain strings (daily ledger entries).

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
    key        TEXT PRIMARY KEY NOT NULL,   -- logical key, e.g. "posts", "user_posts:<id>"
    value      TEXT NOT NULL,               -- serialized JSON or plain string
    updated_at TEXT NOT NULL                -- RFC-3339
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
