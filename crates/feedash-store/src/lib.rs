//! Storage layer: JSON rule books (always available) and a DuckDB rule store.

mod error;
pub use error::StoreError;

pub mod json;
pub use json::{load_products, load_rule_tables, save_rule_tables};

#[cfg(feature = "duckdb")]
mod duck;
#[cfg(feature = "duckdb")]
pub use duck::{DuckStore, ImportSummary, RuleFilter, Stored, StoredRule, Upsert};
