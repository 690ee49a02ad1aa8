/// Post and record addressing
///
/// Two unrelated formats: the public web links people paste
/// (`https://bsky.app/profile/<author>/post/<rkey>`) and internal
/// `at://authority/collection/rkey` record URIs.

pub mod at_uri;
pub mod post_url;

pub use at_uri::{build_resource_uri, parse_resource_uri, AtUri, AT_SCHEME};
pub use post_url::{build_post_url, parse_post_url, PostLink};

/// Collection NSID of posts
pub const POST_COLLECTION: &str = "app.bsky.feed.post";

/// Literal prefix that marks an author token as a DID rather than a handle
pub const DID_PREFIX: &str = "did:";

pub fn is_did(value: &str) -> bool {
    value.starts_with(DID_PREFIX)
}
