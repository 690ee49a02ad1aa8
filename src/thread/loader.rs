/// Thread Loader - orchestrates addressing, identity and API calls
use crate::{
    api::{methods, Params, Xrpc},
    error::{ClientError, ClientResult, UrlError},
    identity::{HandleCache, IdentityResolver},
    thread::ProfileCache,
    uri::{parse_post_url, AtUri, AT_SCHEME},
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Reply depth requested for every thread fetch
pub const THREAD_DEPTH: u32 = 10;

/// What the caller wants a thread for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadRequest {
    /// Pasted web link, or an `at://` post URI
    Url(String),
    /// Author (handle or DID) and post record key
    Id { author: String, record_key: String },
}

/// A post record together with its author's profile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComposedPost {
    pub record: Value,
    pub author: Value,
}

/// Loads threads and composed posts
pub struct ThreadLoader {
    api: Arc<dyn Xrpc>,
    identity: IdentityResolver,
    profiles: ProfileCache,
}

impl ThreadLoader {
    pub fn new(api: Arc<dyn Xrpc>, handles: Arc<HandleCache>) -> Self {
        Self {
            identity: IdentityResolver::new(Arc::clone(&api), handles),
            api,
            profiles: ProfileCache::new(),
        }
    }

    pub fn identity(&self) -> &IdentityResolver {
        &self.identity
    }

    pub fn profiles(&self) -> &ProfileCache {
        &self.profiles
    }

    pub async fn load_thread(&self, request: &ThreadRequest) -> ClientResult<Value> {
        match request {
            ThreadRequest::Url(url) => self.load_thread_by_url(url).await,
            ThreadRequest::Id { author, record_key } => {
                self.load_thread_by_id(author, record_key).await
            }
        }
    }

    /// Load the thread behind a pasted post link or `at://` post URI.
    ///
    /// Web links are validated before anything goes over the network.
    pub async fn load_thread_by_url(&self, url: &str) -> ClientResult<Value> {
        let trimmed = url.trim();

        if trimmed.starts_with(AT_SCHEME) {
            let uri = AtUri::parse(trimmed)?;
            if !uri.is_post() {
                return Err(UrlError::new(format!("Not a post URI: {}", trimmed)).into());
            }
            return self.load_thread_by_id(&uri.authority, &uri.record_key).await;
        }

        let link = parse_post_url(trimmed)?;
        self.load_thread_by_id(&link.author, &link.record_key).await
    }

    /// Load a thread by author (handle or DID) and post record key
    pub async fn load_thread_by_id(&self, author: &str, record_key: &str) -> ClientResult<Value> {
        let did = self.identity.resolve_actor(author).await?;
        let uri = AtUri::post(&did, record_key)?;

        debug!("Loading thread {}", uri);

        let params = Params::new()
            .with("uri", uri.to_string())
            .with("depth", THREAD_DEPTH);

        self.api
            .get(methods::GET_POST_THREAD, &params)
            .await?
            .ok_or(ClientError::MissingField("thread"))
    }

    /// Fetch a post record and its author's profile side by side.
    ///
    /// Fails as soon as either fetch fails; the other one's result is
    /// dropped and no partial pair is ever returned.
    pub async fn load_raw_post_with_author(&self, post_uri: &str) -> ClientResult<ComposedPost> {
        let uri = AtUri::parse(post_uri)?;

        let (record, author) =
            futures::try_join!(self.fetch_record(&uri), self.fetch_profile(&uri.authority))?;

        Ok(ComposedPost { record, author })
    }

    /// Raw record via `com.atproto.repo.getRecord`
    pub async fn fetch_record(&self, uri: &AtUri) -> ClientResult<Value> {
        let params = Params::new()
            .with("repo", uri.authority.as_str())
            .with("collection", uri.collection.as_str())
            .with("rkey", uri.record_key.as_str());

        self.api
            .get(methods::GET_RECORD, &params)
            .await?
            .ok_or(ClientError::MissingField("value"))
    }

    /// Actor profile, fetched at most once per run per DID/handle
    pub async fn fetch_profile(&self, actor: &str) -> ClientResult<Value> {
        if let Some(profile) = self.profiles.get(actor).await {
            debug!("Profile cache hit for {}", actor);
            return Ok(profile);
        }

        let params = Params::new().with("actor", actor);
        let profile = self
            .api
            .get(methods::GET_PROFILE, &params)
            .await?
            .ok_or(ClientError::MissingField("did"))?;

        self.identity.record_profile(&profile).await?;
        self.profiles.insert(actor, &profile).await;

        Ok(profile)
    }
}
