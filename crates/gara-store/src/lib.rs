//! # gara-store
//!
//! The durable local session store: a namespaced key-value table in SQLite
//! holding per-room auth tokens and the global preferred nickname across
//! page loads.  The crate exposes a synchronous [`Database`] handle that
//! wraps a `rusqlite::Connection` and provides typed accessors for every
//! session value, plus the derived listing of previously visited rooms.

pub mod database;
pub mod migrations;
pub mod session;

mod error;

pub use database::Database;
pub use error::StoreError;
