/// In-process profile cache
use crate::{identity::normalize_handle, uri::is_did};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Profiles fetched during this run, keyed by both DID and handle.
///
/// Not persisted.
#[derive(Debug, Default)]
pub struct ProfileCache {
    profiles: RwLock<HashMap<String, Value>>,
}

fn cache_key(actor: &str) -> String {
    if is_did(actor) {
        actor.to_string()
    } else {
        normalize_handle(actor)
    }
}

impl ProfileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up by DID or handle
    pub async fn get(&self, actor: &str) -> Option<Value> {
        self.profiles.read().await.get(&cache_key(actor)).cloned()
    }

    /// Store under the profile's DID and handle, and under `requested_as`
    /// in case the caller asked by an identifier the profile doesn't echo
    pub async fn insert(&self, requested_as: &str, profile: &Value) {
        let mut profiles = self.profiles.write().await;

        for field in ["did", "handle"] {
            if let Some(id) = profile.get(field).and_then(Value::as_str) {
                profiles.insert(cache_key(id), profile.clone());
            }
        }
        profiles.insert(cache_key(requested_as), profile.clone());
    }

    pub async fn len(&self) -> usize {
        self.profiles.read().await.len()
    }
}
