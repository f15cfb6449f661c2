//! Typed accessors for the durable session values.
//!
//! All keys live under the `gara_` namespace prefix so unrelated data
//! sharing the same database cannot collide with session state.  Room
//! extraction from token keys is anchored at the start of the key; a key
//! that merely contains the token prefix somewhere inside never matches.

use rusqlite::{params, OptionalExtension};

use gara_shared::constants::{PREFERRED_NICK_KEY, STORAGE_PREFIX, TOKEN_KEY_PREFIX};
use gara_shared::RoomId;

use crate::database::Database;
use crate::error::Result;

impl Database {
    // ------------------------------------------------------------------
    // Generic namespaced values
    // ------------------------------------------------------------------

    /// Read a value by its un-namespaced key suffix.
    pub fn get_value(&self, key: &str) -> Result<Option<String>> {
        self.get_raw(&format!("{STORAGE_PREFIX}{key}"))
    }

    /// Write or clear a value by its un-namespaced key suffix.  An absent
    /// value removes the entry.
    pub fn set_value(&self, key: &str, value: Option<&str>) -> Result<()> {
        self.set_raw(&format!("{STORAGE_PREFIX}{key}"), value)
    }

    // ------------------------------------------------------------------
    // Room tokens
    // ------------------------------------------------------------------

    /// Fetch the auth token stored for a room, if any.
    pub fn get_token(&self, room: &RoomId) -> Result<Option<String>> {
        self.get_raw(&room.storage_key())
    }

    /// Persist or clear a room's auth token.  An absent token removes the
    /// entry, so the room also disappears from [`Database::list_known_rooms`].
    pub fn set_token(&self, room: &RoomId, token: Option<&str>) -> Result<()> {
        self.set_raw(&room.storage_key(), token)
    }

    /// List every room that currently has a stored token.
    ///
    /// Derived by scanning the token key namespace; order is unspecified,
    /// duplicates are impossible since the key is the room identifier.
    pub fn list_known_rooms(&self) -> Result<Vec<RoomId>> {
        // GLOB rather than LIKE: `_` in the prefix must match literally.
        let mut stmt = self
            .conn()
            .prepare("SELECT key FROM session_kv WHERE key GLOB ?1")?;

        let pattern = format!("{TOKEN_KEY_PREFIX}*");
        let rows = stmt.query_map(params![pattern], |row| row.get::<_, String>(0))?;

        let mut rooms = Vec::new();
        for row in rows {
            if let Some(room) = RoomId::from_storage_key(&row?) {
                rooms.push(room);
            }
        }
        Ok(rooms)
    }

    // ------------------------------------------------------------------
    // Preferred nickname
    // ------------------------------------------------------------------

    /// Fetch the global preferred nickname, if any.
    pub fn get_preferred_nick(&self) -> Result<Option<String>> {
        self.get_raw(PREFERRED_NICK_KEY)
    }

    /// Persist the global preferred nickname.
    pub fn set_preferred_nick(&self, nick: &str) -> Result<()> {
        self.set_raw(PREFERRED_NICK_KEY, Some(nick))
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn()
            .query_row(
                "SELECT value FROM session_kv WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_raw(&self, key: &str, value: Option<&str>) -> Result<()> {
        match value {
            Some(value) => {
                self.conn().execute(
                    "INSERT INTO session_kv (key, value) VALUES (?1, ?2)
                     ON CONFLICT (key) DO UPDATE SET value = excluded.value",
                    params![key, value],
                )?;
            }
            None => {
                self.conn()
                    .execute("DELETE FROM session_kv WHERE key = ?1", params![key])?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_test_db(dir: &tempfile::TempDir) -> Database {
        Database::open_at(&dir.path().join("test.db")).expect("should open")
    }

    #[test]
    fn token_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(&dir);
        let room = RoomId::new("kitchen");

        assert_eq!(db.get_token(&room).unwrap(), None);

        db.set_token(&room, Some("secret")).unwrap();
        assert_eq!(db.get_token(&room).unwrap(), Some("secret".into()));

        db.set_token(&room, Some("rotated")).unwrap();
        assert_eq!(db.get_token(&room).unwrap(), Some("rotated".into()));

        db.set_token(&room, None).unwrap();
        assert_eq!(db.get_token(&room).unwrap(), None);
    }

    #[test]
    fn cleared_room_disappears_from_listing() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(&dir);

        let kitchen = RoomId::new("kitchen");
        let lounge = RoomId::new("lounge");
        db.set_token(&kitchen, Some("a")).unwrap();
        db.set_token(&lounge, Some("b")).unwrap();

        let mut rooms = db.list_known_rooms().unwrap();
        rooms.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        assert_eq!(rooms, vec![kitchen.clone(), lounge.clone()]);

        db.set_token(&kitchen, None).unwrap();
        assert_eq!(db.list_known_rooms().unwrap(), vec![lounge]);
    }

    #[test]
    fn listing_ignores_unrelated_keys() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(&dir);

        db.set_token(&RoomId::new("kitchen"), Some("a")).unwrap();
        db.set_preferred_nick("ada").unwrap();
        // Keys that contain the token prefix without starting with it.
        db.conn()
            .execute(
                "INSERT INTO session_kv (key, value) VALUES (?1, ?2)",
                params!["xgara_token_evil", "nope"],
            )
            .unwrap();

        assert_eq!(db.list_known_rooms().unwrap(), vec![RoomId::new("kitchen")]);
    }

    #[test]
    fn nickname_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(&dir);

        assert_eq!(db.get_preferred_nick().unwrap(), None);
        db.set_preferred_nick("ada").unwrap();
        assert_eq!(db.get_preferred_nick().unwrap(), Some("ada".into()));
    }

    #[test]
    fn generic_values_are_namespaced() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(&dir);

        db.set_value("preferred_nick", Some("ada")).unwrap();
        assert_eq!(db.get_preferred_nick().unwrap(), Some("ada".into()));

        db.set_value("preferred_nick", None).unwrap();
        assert_eq!(db.get_preferred_nick().unwrap(), None);
    }

    #[test]
    fn values_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let room = RoomId::new("kitchen");

        {
            let db = Database::open_at(&path).unwrap();
            db.set_token(&room, Some("secret")).unwrap();
        }

        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.get_token(&room).unwrap(), Some("secret".into()));
    }
}
