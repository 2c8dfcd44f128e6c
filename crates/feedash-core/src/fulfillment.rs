//! Fulfillment fee lookup.

use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::rules::{FbaFeeRule, Pricing};
use crate::size_tier::SizeTier;

/// Look up the fulfillment fee for a size tier and weight.
///
/// Only rows for exactly this tier that carry pricing are candidates. The
/// first candidate, in stored order, whose weight band contains the weight
/// (compared in the row's own unit) prices the package: its flat fee, or
/// its tiered base plus any overage when
/// [`apply_overage`](EngineConfig::apply_overage) is on.
///
/// When no candidate covers the weight the configured
/// [`fallback_fulfillment_fee`](EngineConfig::fallback_fulfillment_fee) is
/// returned.
pub fn fulfillment_fee(
    rules: &[FbaFeeRule],
    tier: SizeTier,
    weight_lb: f64,
    config: &EngineConfig,
) -> Option<f64> {
    if !weight_lb.is_finite() {
        return None;
    }

    let matched = rules
        .iter()
        .filter(|r| r.tier == tier.as_str())
        .filter_map(|r| r.pricing().map(|p| (r, p)))
        .find(|(r, _)| r.covers_weight(weight_lb));

    match matched {
        Some((rule, Pricing::Flat(fee))) => {
            debug!(%tier, weight_lb, fee, unit = %rule.unit, "flat fulfillment fee");
            Some(fee)
        }
        Some((rule, Pricing::Tiered { base, overage })) => {
            let extra: f64 = if config.apply_overage {
                overage.iter().map(|o| o.charge(weight_lb)).sum()
            } else {
                0.0
            };
            debug!(%tier, weight_lb, base, extra, unit = %rule.unit, "tiered fulfillment fee");
            Some(base + extra)
        }
        None => {
            if let Some(fallback) = config.fallback_fulfillment_fee {
                warn!(%tier, weight_lb, fallback, "no fulfillment rule covers weight, using fallback fee");
            }
            config.fallback_fulfillment_fee
        }
    }
}
