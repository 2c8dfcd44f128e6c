//! Size-tier classification.
//!
//! Walks the size-tier ladder in stored order and returns the first rung the
//! package fits. The ladder's vocabulary ("Small standard-size", "Large
//! oversize", ...) is folded onto the three tiers the fulfillment table
//! prices: Small Standard, Large Standard and Oversize.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dimensions::{DimensionStats, Dimensions, length_girth};
use crate::rules::{SizeTierRule, TierLimits};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SizeTier {
    #[serde(rename = "Small Standard")]
    SmallStandard,
    #[serde(rename = "Large Standard")]
    LargeStandard,
    Oversize,
}

impl SizeTier {
    /// Fold a size-tier-table name onto a fulfillment-table tier.
    ///
    /// "small" + "standard" → Small Standard, "large" + "standard" →
    /// Large Standard, anything else → Oversize.
    pub fn normalize(name: &str) -> Self {
        let s = name.to_lowercase();
        if s.contains("small") && s.contains("standard") {
            Self::SmallStandard
        } else if s.contains("large") && s.contains("standard") {
            Self::LargeStandard
        } else {
            Self::Oversize
        }
    }

    /// Name as it appears in the fulfillment fee table.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SmallStandard => "Small Standard",
            Self::LargeStandard => "Large Standard",
            Self::Oversize => "Oversize",
        }
    }
}

impl fmt::Display for SizeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Volumetric weight in pounds: cubic inches over `divisor`.
///
/// `None` unless all three sides are known.
pub fn dimensional_weight(dims: Option<&Dimensions>, divisor: f64) -> Option<f64> {
    dims.and_then(Dimensions::cubic_inches).map(|v| v / divisor)
}

/// Billed weight: the larger of actual and dimensional weight.
///
/// Without a full set of sides the actual weight is used as is.
pub fn shipping_weight(weight_lb: Option<f64>, dims: Option<&Dimensions>, divisor: f64) -> Option<f64> {
    match (weight_lb, dimensional_weight(dims, divisor)) {
        (Some(actual), Some(dim)) => Some(actual.max(dim)),
        (Some(actual), None) => Some(actual),
        (None, dim) => dim,
    }
}

fn within(limit: Option<f64>, value: Option<f64>) -> bool {
    match (limit, value) {
        (None, _) => true,
        (Some(max), Some(v)) => v <= max,
        (Some(_), None) => false,
    }
}

fn fits(limits: &TierLimits, ship_lb: Option<f64>, stats: Option<&DimensionStats>) -> bool {
    let longest = stats.map(|s| s.longest);
    let shortest = stats.map(|s| s.shortest);
    let girth = stats.map(|s| s.length_plus_girth);
    // A package with only two known sides has no median to violate.
    let median_ok = match stats.and_then(|s| s.median) {
        None => true,
        median => within(limits.median_in, median),
    };
    median_ok
        && within(limits.shipping_weight_lb, ship_lb)
        && within(limits.longest_in, longest)
        && within(limits.shortest_in, shortest)
        && within(limits.length_girth_in, girth)
}

/// Classify a package against the size-tier ladder.
///
/// The first rule whose every set threshold is satisfied wins. If none fit,
/// the last rule (the top of the ladder) is used. Returns `None` only for an
/// empty ladder.
pub fn classify_tier(
    rules: &[SizeTierRule],
    weight_lb: Option<f64>,
    dims: Option<&Dimensions>,
    dim_divisor: f64,
) -> Option<SizeTier> {
    let last = rules.last()?;
    let ship_lb = shipping_weight(weight_lb, dims, dim_divisor);
    let stats = dims.and_then(length_girth);

    let rule = rules
        .iter()
        .find(|r| fits(&r.limits(), ship_lb, stats.as_ref()))
        .unwrap_or_else(|| {
            debug!(tier = %last.tier, "no size tier matched, using top of ladder");
            last
        });
    let tier = SizeTier::normalize(&rule.tier);
    debug!(rule = %rule.tier, %tier, ?ship_lb, "classified size tier");
    Some(tier)
}
