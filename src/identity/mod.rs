/// Identity Resolution
///
/// Handle-to-DID resolution backed by a persistent handle cache, plus the
/// offline reverse lookup used when only a DID is at hand.

pub mod cache;
pub mod resolver;

pub use cache::{HandleCache, HANDLE_CACHE_KEY};
pub use resolver::IdentityResolver;

/// Handle resolution result (`com.atproto.identity.resolveHandle`)
#[derive(Debug, Clone, serde::Deserialize)]
pub struct HandleResolutionResult {
    pub did: String,
}

/// Handles are case-insensitive; the cache stores them lower-cased
pub fn normalize_handle(handle: &str) -> String {
    handle.trim().trim_start_matches('@').to_lowercase()
}
