/// XRPC API access
///
/// `ApiClient` talks to one base host over HTTPS. `AuthenticatedClient`
/// layers a refreshable session on top of it. Both implement [`Xrpc`],
/// the seam the identity and thread layers depend on.

pub mod client;
pub mod params;
pub mod session;

pub use client::ApiClient;
pub use params::{ParamValue, Params};
pub use session::{AuthenticatedClient, Session, SessionManager, SessionState};

use crate::error::ClientResult;
use async_trait::async_trait;
use serde_json::Value;

/// XRPC method names consumed by the client
pub mod methods {
    pub const RESOLVE_HANDLE: &str = "com.atproto.identity.resolveHandle";
    pub const GET_POST_THREAD: &str = "app.bsky.feed.getPostThread";
    pub const GET_RECORD: &str = "com.atproto.repo.getRecord";
    pub const GET_PROFILE: &str = "app.bsky.actor.getProfile";
    pub const CREATE_SESSION: &str = "com.atproto.server.createSession";
    pub const REFRESH_SESSION: &str = "com.atproto.server.refreshSession";
}

/// Result of a POST call
#[derive(Debug)]
pub enum PostOutput {
    /// Response declared a JSON content type and was parsed
    Json(Value),
    /// Anything else, handed back unread
    Raw(reqwest::Response),
}

impl PostOutput {
    pub fn into_json(self) -> Option<Value> {
        match self {
            PostOutput::Json(value) => Some(value),
            PostOutput::Raw(_) => None,
        }
    }
}

/// XRPC calls against a fixed remote endpoint
#[async_trait]
pub trait Xrpc: Send + Sync {
    /// GET a query method. `Ok(None)` means the server sent an empty body.
    async fn get(&self, method: &str, params: &Params) -> ClientResult<Option<Value>>;

    /// POST a procedure, with a JSON body when `data` is given
    async fn post(&self, method: &str, data: Option<&Value>) -> ClientResult<PostOutput>;
}
