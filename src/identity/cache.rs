/// Handle cache - persistent handle -> DID map
///
/// The whole map lives under one store key as a JSON object. It is read
/// lazily on first access and written back in full after every change.
use crate::{
    error::ClientResult,
    identity::normalize_handle,
    store::KvStore,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// Store key holding the serialized handle map
pub const HANDLE_CACHE_KEY: &str = "handleCache";

type HandleMap = BTreeMap<String, String>;

/// Handle cache manager
pub struct HandleCache {
    store: Arc<dyn KvStore>,
    entries: Mutex<Option<HandleMap>>,
}

impl HandleCache {
    /// Create a cache over `store`; nothing is read until first use
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            entries: Mutex::new(None),
        }
    }

    /// Lock the map, loading it from the store on first access
    async fn entries(&self) -> ClientResult<MutexGuard<'_, Option<HandleMap>>> {
        let mut guard = self.entries.lock().await;

        if guard.is_none() {
            let map = match self.store.get(HANDLE_CACHE_KEY).await? {
                Some(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                    warn!("Discarding unreadable handle cache: {}", e);
                    HandleMap::new()
                }),
                None => HandleMap::new(),
            };
            debug!("Loaded {} cached handles", map.len());
            *guard = Some(map);
        }

        Ok(guard)
    }

    /// Cached DID for a handle
    pub async fn get(&self, handle: &str) -> ClientResult<Option<String>> {
        let guard = self.entries().await?;
        Ok(guard
            .as_ref()
            .and_then(|map| map.get(&normalize_handle(handle)).cloned()))
    }

    /// Cache handle mapping, replacing any previous DID for it.
    ///
    /// The in-memory map only changes once the store has accepted the write.
    pub async fn set(&self, handle: &str, did: &str) -> ClientResult<()> {
        let mut guard = self.entries().await?;

        let mut updated = guard.clone().unwrap_or_default();
        updated.insert(normalize_handle(handle), did.to_string());

        let json = serde_json::to_string(&updated)?;
        self.store.set(HANDLE_CACHE_KEY, &json).await?;

        *guard = Some(updated);
        Ok(())
    }

    /// Get handle for a DID (reverse lookup)
    ///
    /// Best effort: scans entries in handle order and returns the first
    /// match. A DID may well have no cached handle.
    pub async fn find_handle(&self, did: &str) -> ClientResult<Option<String>> {
        let guard = self.entries().await?;
        Ok(guard.as_ref().and_then(|map| {
            map.iter()
                .find(|(_, cached)| cached.as_str() == did)
                .map(|(handle, _)| handle.clone())
        }))
    }

    /// Pre-warm from a fetched profile (`handle` + `did` fields)
    pub async fn record_profile(&self, profile: &Value) -> ClientResult<()> {
        let handle = profile.get("handle").and_then(Value::as_str);
        let did = profile.get("did").and_then(Value::as_str);

        match (handle, did) {
            (Some(handle), Some(did)) => self.set(handle, did).await,
            _ => {
                debug!("Profile without handle/did, not cached");
                Ok(())
            }
        }
    }

    pub async fn len(&self) -> ClientResult<usize> {
        let guard = self.entries().await?;
        Ok(guard.as_ref().map(HandleMap::len).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FailingKvStore, MemoryKvStore};
    use serde_json::json;

    fn create_test_cache() -> (Arc<MemoryKvStore>, HandleCache) {
        let store = Arc::new(MemoryKvStore::new());
        let cache = HandleCache::new(store.clone());
        (store, cache)
    }

    #[tokio::test]
    async fn test_cache_and_get_handle() {
        let (_, cache) = create_test_cache();

        cache.set("alice.test", "did:plc:alice123").await.unwrap();

        assert_eq!(
            cache.get("alice.test").await.unwrap(),
            Some("did:plc:alice123".to_string())
        );
        // Case-insensitive lookup
        assert_eq!(
            cache.get("ALICE.TEST").await.unwrap(),
            Some("did:plc:alice123".to_string())
        );
        assert_eq!(cache.get("bob.test").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_overwrite_keeps_latest() {
        let (_, cache) = create_test_cache();

        cache.set("alice.test", "did:plc:old").await.unwrap();
        cache.set("alice.test", "did:plc:new").await.unwrap();

        assert_eq!(
            cache.get("alice.test").await.unwrap(),
            Some("did:plc:new".to_string())
        );
        assert_eq!(cache.len().await.unwrap(), 1);
        assert_eq!(cache.find_handle("did:plc:old").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_write_through_whole_blob() {
        let (store, cache) = create_test_cache();

        cache.set("alice.test", "did:plc:alice").await.unwrap();
        cache.set("bob.test", "did:plc:bob").await.unwrap();

        let blob = store.get(HANDLE_CACHE_KEY).await.unwrap().unwrap();
        let parsed: Value = serde_json::from_str(&blob).unwrap();
        assert_eq!(
            parsed,
            json!({"alice.test": "did:plc:alice", "bob.test": "did:plc:bob"})
        );
    }

    #[tokio::test]
    async fn test_lazy_load_from_existing_store() {
        let store = Arc::new(MemoryKvStore::new());
        store
            .set(HANDLE_CACHE_KEY, r#"{"carol.test":"did:plc:carol"}"#)
            .await
            .unwrap();

        let cache = HandleCache::new(store);
        assert_eq!(
            cache.get("carol.test").await.unwrap(),
            Some("did:plc:carol".to_string())
        );
    }

    #[tokio::test]
    async fn test_corrupt_blob_starts_empty() {
        let store = Arc::new(MemoryKvStore::new());
        store.set(HANDLE_CACHE_KEY, "not json").await.unwrap();

        let cache = HandleCache::new(store);
        assert_eq!(cache.len().await.unwrap(), 0);
        cache.set("dave.test", "did:plc:dave").await.unwrap();
        assert_eq!(cache.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_reverse_handle_lookup() {
        let (_, cache) = create_test_cache();

        cache.set("bob.test", "did:plc:bob").await.unwrap();

        assert_eq!(
            cache.find_handle("did:plc:bob").await.unwrap(),
            Some("bob.test".to_string())
        );
        assert_eq!(cache.find_handle("did:plc:nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_cache_unchanged() {
        let cache = HandleCache::new(Arc::new(FailingKvStore));

        assert!(cache.set("alice.test", "did:plc:alice").await.is_err());

        assert_eq!(cache.get("alice.test").await.unwrap(), None);
        assert_eq!(cache.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reverse_lookup_prefers_first_handle_in_order() {
        let (_, cache) = create_test_cache();

        cache.set("zed.test", "did:plc:shared").await.unwrap();
        cache.set("amy.test", "did:plc:shared").await.unwrap();

        assert_eq!(
            cache.find_handle("did:plc:shared").await.unwrap(),
            Some("amy.test".to_string())
        );
    }

    #[tokio::test]
    async fn test_record_profile_prewarms() {
        let (_, cache) = create_test_cache();

        cache
            .record_profile(&json!({"did": "did:plc:erin", "handle": "Erin.Test", "displayName": "Erin"}))
            .await
            .unwrap();
        cache.record_profile(&json!({"displayName": "nobody"})).await.unwrap();

        assert_eq!(
            cache.get("erin.test").await.unwrap(),
            Some("did:plc:erin".to_string())
        );
        assert_eq!(cache.len().await.unwrap(), 1);
    }
}
