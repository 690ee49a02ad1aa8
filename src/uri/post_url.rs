/// Public post URL parsing
use crate::error::UrlError;
use lazy_static::lazy_static;
use regex::Regex;

/// Canonical web host used when building links
pub const WEB_HOST: &str = "bsky.app";

lazy_static! {
    /// Production host, staging host, and the one mirror that serves the
    /// app under a `/#` path prefix.
    static ref POST_URL: Regex = Regex::new(
        r"^(?:https://)?(?:bsky\.app|staging\.bsky\.app|langit\.pages\.dev/#)/profile/([^/\s]+)/post/(\w+)/?$"
    )
    .expect("post URL pattern is valid");
}

/// Author token and record key taken from a post URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostLink {
    /// Handle or DID, exactly as it appeared in the URL
    pub author: String,
    pub record_key: String,
}

/// Parse a public post URL into (author, record key).
///
/// Surrounding whitespace is ignored. Anything else that does not match a
/// known host and the `/profile/<author>/post/<rkey>` shape is rejected.
pub fn parse_post_url(input: &str) -> Result<PostLink, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::new("Please enter a post URL"));
    }

    let captures = POST_URL.captures(trimmed).ok_or_else(|| {
        UrlError::new(format!(
            "Invalid post URL: {} (expected https://{}/profile/<author>/post/<id>)",
            trimmed, WEB_HOST
        ))
    })?;

    Ok(PostLink {
        author: captures[1].to_string(),
        record_key: captures[2].to_string(),
    })
}

/// Canonical web link for a post
pub fn build_post_url(author: &str, record_key: &str) -> String {
    format!("https://{}/profile/{}/post/{}", WEB_HOST, author, record_key)
}
