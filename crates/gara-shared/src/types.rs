use serde::{Deserialize, Serialize};

use crate::constants::TOKEN_KEY_PREFIX;

/// A room identifier, the string id embedded in a `/room/<id>` navigation
/// path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The durable storage key holding this room's auth token.
    pub fn storage_key(&self) -> String {
        format!("{TOKEN_KEY_PREFIX}{}", self.0)
    }

    /// Extract the room id from a navigation path such as `/room/kitchen`.
    pub fn from_path(path: &str) -> Option<Self> {
        path.strip_prefix("/room/")
            .filter(|id| !id.is_empty())
            .map(Self::new)
    }

    /// Recover a room id from a token storage key.
    ///
    /// The prefix match is anchored at the start of the key; keys that merely
    /// contain the token prefix somewhere inside do not match.
    pub fn from_storage_key(key: &str) -> Option<Self> {
        key.strip_prefix(TOKEN_KEY_PREFIX)
            .filter(|id| !id.is_empty())
            .map(Self::new)
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
