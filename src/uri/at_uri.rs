/// `at://` record URIs
use crate::{
    error::UrlError,
    uri::{build_post_url, is_did, POST_COLLECTION},
};
use std::fmt;
use std::str::FromStr;

pub const AT_SCHEME: &str = "at://";

/// Decomposed `at://authority/collection/rkey`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AtUri {
    /// DID, or a handle when parsed from a URI that carried one
    pub authority: String,
    pub collection: String,
    pub record_key: String,
}

impl AtUri {
    /// Build a URI addressed by DID. Handles are refused so that built
    /// URIs never depend on later handle resolution.
    pub fn build(did: &str, collection: &str, record_key: &str) -> Result<Self, UrlError> {
        if !is_did(did) {
            return Err(UrlError::new(format!(
                "Record URIs must be addressed by DID, got {}",
                did
            )));
        }

        Ok(Self {
            authority: did.to_string(),
            collection: collection.to_string(),
            record_key: record_key.to_string(),
        })
    }

    /// URI of a post record
    pub fn post(did: &str, record_key: &str) -> Result<Self, UrlError> {
        Self::build(did, POST_COLLECTION, record_key)
    }

    /// Split a record URI. Input is expected to come from the API or from
    /// [`AtUri::build`], so only the overall shape is checked.
    pub fn parse(uri: &str) -> Result<Self, UrlError> {
        let invalid = || UrlError::new(format!("Invalid record URI: {}", uri));

        let rest = uri.strip_prefix(AT_SCHEME).ok_or_else(invalid)?;
        let mut parts = rest.splitn(3, '/');

        let authority = parts.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;
        let collection = parts.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;
        let record_key = parts.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;

        Ok(Self {
            authority: authority.to_string(),
            collection: collection.to_string(),
            record_key: record_key.to_string(),
        })
    }

    pub fn is_post(&self) -> bool {
        self.collection == POST_COLLECTION
    }

    /// Public web link, for post records only
    pub fn to_post_url(&self) -> Option<String> {
        self.is_post()
            .then(|| build_post_url(&self.authority, &self.record_key))
    }
}

impl fmt::Display for AtUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}/{}/{}",
            AT_SCHEME, self.authority, self.collection, self.record_key
        )
    }
}

impl FromStr for AtUri {
    type Err = UrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Split a record URI into its three parts
pub fn parse_resource_uri(uri: &str) -> Result<AtUri, UrlError> {
    AtUri::parse(uri)
}

/// `at://<did>/<collection>/<rkey>`
pub fn build_resource_uri(did: &str, collection: &str, record_key: &str) -> Result<String, UrlError> {
    Ok(AtUri::build(did, collection, record_key)?.to_string())
}
