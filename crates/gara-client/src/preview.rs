//! Client-local preview handles, the object-URL analog.
//!
//! A captured attachment gets a `blob:gara/<uuid>` URL that the rendering
//! layer can resolve back to bytes for local display.  Handles must be
//! revoked when the attachment is cleared, replaced, or the session
//! disconnects; an unrevoked handle keeps the whole buffer alive.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use uuid::Uuid;

/// Shared registry of live preview handles.
///
/// Cheap to clone; all clones observe the same set of handles.
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    entries: Arc<Mutex<HashMap<String, Bytes>>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `data` under a fresh preview URL.
    pub fn create(&self, data: Bytes) -> String {
        let url = format!("blob:gara/{}", Uuid::new_v4());
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.insert(url.clone(), data);
        url
    }

    /// Resolve a preview URL back to its bytes, if still live.
    pub fn resolve(&self, url: &str) -> Option<Bytes> {
        let entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.get(url).cloned()
    }

    /// Release a preview handle.  Returns `true` if it was live.
    pub fn revoke(&self, url: &str) -> bool {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.remove(url).is_some()
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        let entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
