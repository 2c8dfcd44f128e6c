//! Plain JSON files: rule books exported from the dashboard and crawled
//! product dumps.

use std::path::Path;

use feedash_core::{Product, RuleTables};
use serde::Deserialize;
use tracing::{debug, info};

use crate::StoreError;

fn read(path: &Path) -> Result<String, StoreError> {
    if !path.exists() {
        return Err(StoreError::FileNotFound(path.to_path_buf()));
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Load and validate a rule book written as
/// `{"referralFeeRules": [...], "fbaFeeRules": [...], "sizeTierRules": [...]}`.
///
/// Missing tables load as empty.
pub fn load_rule_tables(path: &Path) -> Result<RuleTables, StoreError> {
    let tables: RuleTables = serde_json::from_str(&read(path)?)?;
    tables.validate()?;
    info!(
        path = %path.display(),
        referral = tables.referral_fee_rules.len(),
        fulfillment = tables.fba_fee_rules.len(),
        size_tiers = tables.size_tier_rules.len(),
        "loaded rule tables"
    );
    Ok(tables)
}

pub fn save_rule_tables(path: &Path, tables: &RuleTables) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(tables)?;
    std::fs::write(path, json)?;
    debug!(path = %path.display(), "wrote rule tables");
    Ok(())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProductFile {
    List(Vec<Product>),
    Wrapped { products: Vec<Product> },
}

/// Load crawled products from either a bare JSON array or an object with a
/// `products` array.
pub fn load_products(path: &Path) -> Result<Vec<Product>, StoreError> {
    let products = match serde_json::from_str::<ProductFile>(&read(path)?)? {
        ProductFile::List(p) | ProductFile::Wrapped { products: p } => p,
    };
    info!(path = %path.display(), count = products.len(), "loaded products");
    Ok(products)
}
