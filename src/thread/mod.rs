/// Thread loading
///
/// Turns a pasted URL or an (author, record key) pair into a post thread,
/// and pairs a post record with its author's profile.

pub mod loader;
pub mod profiles;

pub use loader::{ComposedPost, ThreadLoader, ThreadRequest, THREAD_DEPTH};
pub use profiles::ProfileCache;
