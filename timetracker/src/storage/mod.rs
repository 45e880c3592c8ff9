//! Storage module
//!
//! Provides crash-safe JSON files for sessions (one per day bucket) and tags.

pub mod atomic;
pub mod session_store;
pub mod tag_store;

pub use session_store::{bucket_key, local_bucket_key, SessionStore};
pub use tag_store::TagStore;
