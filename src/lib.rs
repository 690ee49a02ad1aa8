/// Skythread - Bluesky thread client
///
/// Resolves post links to threads over the public AppView, with a
/// persistent handle cache and concurrent post/author composition.

pub mod api;
pub mod config;
pub mod error;
pub mod identity;
pub mod store;
pub mod thread;
pub mod uri;

pub use api::{ApiClient, AuthenticatedClient, Params, PostOutput, SessionManager, Xrpc};
pub use config::ClientConfig;
pub use error::{ApiError, ClientError, ClientResult, UrlError};
pub use identity::{HandleCache, IdentityResolver};
pub use store::{KvStore, MemoryKvStore, SqliteKvStore};
pub use thread::{ComposedPost, ThreadLoader, ThreadRequest};
pub use uri::{build_post_url, parse_post_url, AtUri};
