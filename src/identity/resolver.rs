/// Identity Resolver - handle resolution with caching
use crate::{
    api::{methods, Params, Xrpc},
    error::{ClientError, ClientResult},
    identity::{normalize_handle, HandleCache, HandleResolutionResult},
    uri::is_did,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Resolves handles through the cache, falling back to the API
#[derive(Clone)]
pub struct IdentityResolver {
    api: Arc<dyn Xrpc>,
    cache: Arc<HandleCache>,
}

impl IdentityResolver {
    pub fn new(api: Arc<dyn Xrpc>, cache: Arc<HandleCache>) -> Self {
        Self { api, cache }
    }

    pub fn cache(&self) -> &Arc<HandleCache> {
        &self.cache
    }

    /// Resolve handle to DID with caching
    ///
    /// A cache hit makes no network call. Concurrent misses for the same
    /// handle are not coalesced; each one resolves independently.
    pub async fn resolve_handle(&self, handle: &str) -> ClientResult<String> {
        let normalized = normalize_handle(handle);

        if let Some(did) = self.cache.get(&normalized).await? {
            debug!("Handle cache hit for {}", normalized);
            return Ok(did);
        }

        debug!("Handle cache miss for {}, resolving", normalized);
        let params = Params::new().with("handle", normalized.as_str());
        let body = self
            .api
            .get(methods::RESOLVE_HANDLE, &params)
            .await?
            .ok_or(ClientError::MissingField("did"))?;

        let result: HandleResolutionResult =
            serde_json::from_value(body).map_err(|_| ClientError::MissingField("did"))?;

        self.cache.set(&normalized, &result.did).await?;

        Ok(result.did)
    }

    /// Resolve an author token: DIDs pass through, handles are resolved
    pub async fn resolve_actor(&self, actor: &str) -> ClientResult<String> {
        if is_did(actor) {
            return Ok(actor.to_string());
        }
        self.resolve_handle(actor).await
    }

    /// Cached handle for a DID, if any. Never touches the network.
    pub async fn handle_for_did(&self, did: &str) -> ClientResult<Option<String>> {
        self.cache.find_handle(did).await
    }

    /// Record the handle/DID pair from a fetched profile
    pub async fn record_profile(&self, profile: &Value) -> ClientResult<()> {
        self.cache.record_profile(profile).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{api::PostOutput, error::ApiError, store::MemoryKvStore};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers resolveHandle from a fixed table and counts calls
    struct FakeResolveApi {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Xrpc for FakeResolveApi {
        async fn get(&self, method: &str, params: &Params) -> ClientResult<Option<Value>> {
            assert_eq!(method, methods::RESOLVE_HANDLE);
            self.calls.fetch_add(1, Ordering::SeqCst);

            match params.get("handle") {
                Some(crate::api::ParamValue::One(h)) if h == "alice.test" => {
                    Ok(Some(json!({"did": "did:plc:alice123"})))
                }
                Some(crate::api::ParamValue::One(h)) if h == "empty.test" => Ok(None),
                _ => Err(ApiError::new(
                    400,
                    Some(json!({"error": "InvalidRequest", "message": "Unable to resolve handle"})),
                )
                .into()),
            }
        }

        async fn post(&self, _method: &str, _data: Option<&Value>) -> ClientResult<PostOutput> {
            unreachable!("resolver never posts")
        }
    }

    fn create_test_resolver() -> (Arc<FakeResolveApi>, IdentityResolver) {
        let api = Arc::new(FakeResolveApi {
            calls: AtomicUsize::new(0),
        });
        let cache = Arc::new(HandleCache::new(Arc::new(MemoryKvStore::new())));
        (api.clone(), IdentityResolver::new(api, cache))
    }

    #[tokio::test]
    async fn test_resolve_twice_makes_one_call() {
        let (api, resolver) = create_test_resolver();

        let first = resolver.resolve_handle("alice.test").await.unwrap();
        let second = resolver.resolve_handle("Alice.Test").await.unwrap();

        assert_eq!(first, "did:plc:alice123");
        assert_eq!(second, first);
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resolve_with_prewarmed_cache() {
        let (api, resolver) = create_test_resolver();

        resolver
            .cache()
            .set("bob.test", "did:plc:bob456")
            .await
            .unwrap();

        let did = resolver.resolve_handle("bob.test").await.unwrap();
        assert_eq!(did, "did:plc:bob456");
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_did_passes_through() {
        let (api, resolver) = create_test_resolver();

        let did = resolver.resolve_actor("did:plc:xyz").await.unwrap();
        assert_eq!(did, "did:plc:xyz");
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_api_error_propagates_and_is_not_cached() {
        let (api, resolver) = create_test_resolver();

        let err = resolver.resolve_handle("ghost.test").await.unwrap_err();
        assert_eq!(err.as_api().map(|e| e.status), Some(400));
        assert_eq!(resolver.cache().get("ghost.test").await.unwrap(), None);

        resolver.resolve_handle("ghost.test").await.unwrap_err();
        assert_eq!(api.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_body_is_missing_did() {
        let (_, resolver) = create_test_resolver();

        let err = resolver.resolve_handle("empty.test").await.unwrap_err();
        assert!(matches!(err, ClientError::MissingField("did")));
    }

    #[tokio::test]
    async fn test_handle_for_did_is_offline() {
        let (api, resolver) = create_test_resolver();

        resolver.resolve_handle("alice.test").await.unwrap();
        assert_eq!(
            resolver.handle_for_did("did:plc:alice123").await.unwrap(),
            Some("alice.test".to_string())
        );
        assert_eq!(resolver.handle_for_did("did:plc:other").await.unwrap(), None);
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }
}
