//! v001 -- Initial schema creation.
//!
//! Creates the single `session_kv` table.  Every durable session value
//! lives here under a `gara_`-prefixed key; the primary key doubles as the
//! index that makes the known-room prefix scan a range scan rather than a
//! full-table walk.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS session_kv (
    key   TEXT PRIMARY KEY NOT NULL,   -- namespaced, e.g. gara_token_<room>
    value TEXT NOT NULL
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
