//! The rule book: an immutable snapshot of the three rule tables plus engine
//! configuration, and per-product fee estimation on top of it.
//!
//! A `RuleBook` is built once from whatever source the caller has (JSON
//! file, DuckDB store, the dashboard API) and handed to every estimate. To
//! pick up rule edits, build a new one. It holds no interior mutability, so
//! a shared reference can be used from any number of threads.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::config::EngineConfig;
use crate::dimensions::Dimensions;
use crate::fulfillment::fulfillment_fee;
use crate::product::{Channel, Product};
use crate::referral::referral_fee;
use crate::rules::{FbaFeeRule, ReferralFeeRule, RuleTables, SizeTierRule};
use crate::size_tier::{SizeTier, classify_tier, shipping_weight};

/// Fee breakdown for one product.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeEstimate {
    pub channel: Channel,
    pub referral_fee: Option<f64>,
    pub size_tier: Option<SizeTier>,
    pub shipping_weight_lb: Option<f64>,
    pub fulfillment_fee: Option<f64>,
    /// Channel-dependent total; see [`total_fee`].
    pub total: Option<f64>,
}

impl FeeEstimate {
    /// Total formatted as `$x.xx`.
    pub fn total_display(&self) -> Option<String> {
        self.total.map(format_usd)
    }

    pub fn referral_display(&self) -> Option<String> {
        self.referral_fee.map(format_usd)
    }
}

/// Combine component fees for a fulfillment channel.
///
/// FBA pays referral + fulfillment (a missing component counts as zero, but
/// at least one must be known). FBM pays the referral fee only.
pub fn total_fee(channel: Channel, referral: Option<f64>, fulfillment: Option<f64>) -> Option<f64> {
    match channel {
        Channel::Fba if referral.is_none() && fulfillment.is_none() => None,
        Channel::Fba => Some(referral.unwrap_or(0.0) + fulfillment.unwrap_or(0.0)),
        Channel::Fbm => referral,
    }
}

pub fn format_usd(amount: f64) -> String {
    format!("${amount:.2}")
}

#[derive(Debug, Clone)]
pub struct RuleBook {
    referral: Vec<ReferralFeeRule>,
    fulfillment: Vec<FbaFeeRule>,
    size_tiers: Vec<SizeTierRule>,
    config: EngineConfig,
    loaded_at: DateTime<Utc>,
}

impl Default for RuleBook {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new())
    }
}

impl RuleBook {
    /// Build a rule book. Rows are kept in the order given.
    pub fn new(
        referral: Vec<ReferralFeeRule>,
        fulfillment: Vec<FbaFeeRule>,
        size_tiers: Vec<SizeTierRule>,
    ) -> Self {
        info!(
            referral = referral.len(),
            fulfillment = fulfillment.len(),
            size_tiers = size_tiers.len(),
            "rule book loaded"
        );
        Self {
            referral,
            fulfillment,
            size_tiers,
            config: EngineConfig::default(),
            loaded_at: Utc::now(),
        }
    }

    pub fn from_tables(tables: RuleTables) -> Self {
        Self::new(
            tables.referral_fee_rules,
            tables.fba_fee_rules,
            tables.size_tier_rules,
        )
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn referral_rules(&self) -> &[ReferralFeeRule] {
        &self.referral
    }

    pub fn fulfillment_rules(&self) -> &[FbaFeeRule] {
        &self.fulfillment
    }

    pub fn size_tier_rules(&self) -> &[SizeTierRule] {
        &self.size_tiers
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn referral_fee(&self, category: &str, price: f64) -> Option<f64> {
        referral_fee(&self.referral, category, price)
    }

    pub fn classify_tier(&self, weight_lb: Option<f64>, dims: Option<&Dimensions>) -> Option<SizeTier> {
        classify_tier(&self.size_tiers, weight_lb, dims, self.config.dim_divisor)
    }

    /// Fulfillment fee; `None` unless both tier and weight are known.
    pub fn fulfillment_fee(&self, tier: Option<SizeTier>, weight_lb: Option<f64>) -> Option<f64> {
        fulfillment_fee(&self.fulfillment, tier?, weight_lb?, &self.config)
    }

    pub fn estimate(&self, product: &Product) -> FeeEstimate {
        let channel = product.channel();

        let referral = match (product.fee_category(), product.fee_price()) {
            (Some(category), Some(price)) => self.referral_fee(category, price),
            _ => None,
        };

        let weight_lb = product.weight_lb();
        let dims = product.dimensions.as_ref();
        let size_tier = self.classify_tier(weight_lb, dims);
        let fulfillment = self.fulfillment_fee(size_tier, weight_lb);

        FeeEstimate {
            channel,
            referral_fee: referral,
            size_tier,
            shipping_weight_lb: shipping_weight(weight_lb, dims, self.config.dim_divisor),
            fulfillment_fee: fulfillment,
            total: total_fee(channel, referral, fulfillment),
        }
    }

    /// Formatted total for a product, e.g. `"$8.00"`.
    pub fn total_fee_display(&self, product: &Product) -> Option<String> {
        self.estimate(product).total_display()
    }

    /// Estimate every product in parallel. Output order matches input order.
    pub fn estimate_catalog(&self, products: &[Product]) -> Vec<FeeEstimate> {
        products.par_iter().map(|p| self.estimate(p)).collect()
    }
}
