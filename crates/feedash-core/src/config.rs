//! Engine configuration.
//!
//! Every field has a default, so an empty JSON object (or no file at all)
//! yields the reference behaviour.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Fee returned when a size tier has no fulfillment row covering the weight.
pub const DEFAULT_FALLBACK_FULFILLMENT_FEE: f64 = 10.0;

/// Cubic inches per pound of dimensional weight.
pub const DEFAULT_DIM_DIVISOR: f64 = 139.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Sentinel fulfillment fee used when no weight band matches.
    /// `None` reports "no fee" instead.
    pub fallback_fulfillment_fee: Option<f64>,
    /// Charge overage steps on tiered (`baseUSD`) fulfillment rows.
    pub apply_overage: bool,
    pub dim_divisor: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fallback_fulfillment_fee: Some(DEFAULT_FALLBACK_FULFILLMENT_FEE),
            apply_overage: false,
            dim_divisor: DEFAULT_DIM_DIVISOR,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.sanitized())
    }

    pub fn from_json_file(path: &Path) -> Result<Self, CoreError> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        tracing::info!(path = %path.display(), ?config, "loaded engine config");
        Ok(config)
    }

    // A zero or negative divisor would make every package infinitely heavy.
    fn sanitized(mut self) -> Self {
        if !(self.dim_divisor.is_finite() && self.dim_divisor > 0.0) {
            tracing::warn!(
                dim_divisor = self.dim_divisor,
                "ignoring invalid dim divisor"
            );
            self.dim_divisor = DEFAULT_DIM_DIVISOR;
        }
        self
    }
}
