//! Sync layer: pulls rule tables and crawled products from the dashboard REST API.

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::{ProductQuery, RuleQuery, SyncClient, SyncError};
