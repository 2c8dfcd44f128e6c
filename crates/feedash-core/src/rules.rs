//! Fee rule tables.
//!
//! Three data-defined tables drive the engine: referral fee rules keyed by
//! category and price band, fulfillment fee rules keyed by size tier and
//! weight band, and the size-tier ladder. Field names serialise in the
//! dashboard API's camelCase shape so rows can be read straight off
//! `/api/fee-rules`, `/api/fba-fee-rules` and `/api/size-tier-rules`.
//!
//! Row order is significant for the fulfillment and size-tier tables: the
//! engine takes the first matching row.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::CoreError;
use crate::units::{LengthUnit, WeightUnit};

// ── Referral fees ──

/// How a referral rule's percentage is applied.
///
/// A missing or blank `applyTo` reads as [`Total`](Self::Total). Any other
/// text (the dashboard's legacy `"item"` default among them) is kept as
/// [`Other`](Self::Other) and contributes nothing but the rule's minimum fee.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ApplyTo {
    /// Percentage of the whole price.
    #[default]
    Total,
    /// Percentage of the part of the price inside the rule's band.
    Portion,
    /// Unrecognised mode, stored as written.
    Other(String),
}

impl ApplyTo {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Total => "total",
            Self::Portion => "portion",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for ApplyTo {
    fn from(s: String) -> Self {
        let t = s.trim();
        if t.is_empty() || t.eq_ignore_ascii_case("total") {
            Self::Total
        } else if t.eq_ignore_ascii_case("portion") {
            Self::Portion
        } else {
            Self::Other(t.to_string())
        }
    }
}

impl From<ApplyTo> for String {
    fn from(a: ApplyTo) -> Self {
        match a {
            ApplyTo::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralFeeRule {
    pub category: String,
    #[serde(default)]
    pub price_min: Option<f64>,
    /// `None` (or zero) is open-ended.
    #[serde(default)]
    pub price_max: Option<f64>,
    #[serde(default)]
    pub apply_to: ApplyTo,
    /// Used as a direct multiplier: 0.15 means 15%.
    pub fee_percent: f64,
    #[serde(default, rename = "minFeeUSD")]
    pub min_fee_usd: f64,
    #[serde(default)]
    pub variant: String,
}

/// Upsert identity of a referral rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferralKey {
    pub category: String,
    pub variant: String,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
}

impl ReferralFeeRule {
    pub fn new(category: &str, price_min: Option<f64>, price_max: Option<f64>, fee_percent: f64) -> Self {
        Self {
            category: category.to_string(),
            price_min,
            price_max,
            apply_to: ApplyTo::Total,
            fee_percent,
            min_fee_usd: 0.0,
            variant: String::new(),
        }
    }

    pub fn floor(&self) -> f64 {
        self.price_min.unwrap_or(0.0)
    }

    /// Upper bound of the price band. Zero is treated as unset.
    pub fn ceiling(&self) -> f64 {
        match self.price_max {
            Some(max) if max != 0.0 => max,
            _ => f64::INFINITY,
        }
    }

    pub fn band_width(&self) -> f64 {
        self.ceiling() - self.floor()
    }

    pub fn covers_price(&self, price: f64) -> bool {
        price >= self.floor() && price <= self.ceiling()
    }

    /// Loose category match: either string contains the other, ignoring case.
    pub fn matches_category(&self, category: &str) -> bool {
        let rule = self.category.to_lowercase();
        let product = category.to_lowercase();
        rule.contains(&product) || product.contains(&rule)
    }

    pub fn key(&self) -> ReferralKey {
        ReferralKey {
            category: self.category.clone(),
            variant: self.variant.clone(),
            price_min: self.price_min,
            price_max: self.price_max,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        const TABLE: &str = "referral fee";
        if self.category.trim().is_empty() {
            return Err(CoreError::invalid(TABLE, "category is required"));
        }
        if !(0.0..=100.0).contains(&self.fee_percent) {
            return Err(CoreError::invalid(
                TABLE,
                format!("feePercent {} outside 0-100", self.fee_percent),
            ));
        }
        if !(self.min_fee_usd >= 0.0) {
            return Err(CoreError::invalid(TABLE, "minFeeUSD must be >= 0"));
        }
        if let (Some(min), Some(max)) = (self.price_min, self.price_max)
            && max != 0.0
            && min > max
        {
            return Err(CoreError::invalid(
                TABLE,
                format!("priceMin {min} > priceMax {max}"),
            ));
        }
        Ok(())
    }
}

// ── Fulfillment fees ──

/// Step pricing beyond a weight threshold, e.g. "+$0.16 per 4 oz above 3 lb".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverageRule {
    pub over_threshold_value: f64,
    pub over_threshold_unit: WeightUnit,
    pub step_value: f64,
    pub step_unit: WeightUnit,
    #[serde(rename = "stepFeeUSD")]
    pub step_fee_usd: f64,
}

impl OverageRule {
    /// Charge for `weight_lb` under this step rule. Partial steps round up.
    pub fn charge(&self, weight_lb: f64) -> f64 {
        if !(self.step_value > 0.0) {
            return 0.0;
        }
        let threshold_lb = self.over_threshold_unit.to_pounds(self.over_threshold_value);
        if weight_lb <= threshold_lb {
            return 0.0;
        }
        let excess = self.step_unit.from_pounds(weight_lb) - self.step_unit.from_pounds(threshold_lb);
        let steps = (excess / self.step_value).ceil();
        steps * self.step_fee_usd
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FbaFeeRule {
    /// Fulfillment-table tier name, e.g. "Small Standard".
    pub tier: String,
    #[serde(default)]
    pub weight_min: f64,
    #[serde(default)]
    pub weight_max: Option<f64>,
    #[serde(default = "default_fba_unit")]
    pub unit: WeightUnit,
    #[serde(default, rename = "feeUSD")]
    pub fee_usd: Option<f64>,
    #[serde(default, rename = "baseUSD")]
    pub base_usd: Option<f64>,
    #[serde(default)]
    pub overage_rules: Vec<OverageRule>,
    #[serde(default)]
    pub variant: String,
}

fn default_fba_unit() -> WeightUnit {
    WeightUnit::Ounce
}

/// How a fulfillment row prices a package.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pricing<'a> {
    Flat(f64),
    Tiered {
        base: f64,
        overage: &'a [OverageRule],
    },
}

/// Upsert identity of a fulfillment rule.
#[derive(Debug, Clone, PartialEq)]
pub struct FulfillmentKey {
    pub tier: String,
    pub variant: String,
    pub weight_min: f64,
    pub weight_max: Option<f64>,
}

impl FbaFeeRule {
    pub fn flat(tier: &str, weight_min: f64, weight_max: Option<f64>, unit: WeightUnit, fee: f64) -> Self {
        Self {
            tier: tier.to_string(),
            weight_min,
            weight_max,
            unit,
            fee_usd: Some(fee),
            base_usd: None,
            overage_rules: Vec::new(),
            variant: String::new(),
        }
    }

    pub fn tiered(
        tier: &str,
        weight_min: f64,
        weight_max: Option<f64>,
        unit: WeightUnit,
        base: f64,
        overage_rules: Vec<OverageRule>,
    ) -> Self {
        Self {
            tier: tier.to_string(),
            weight_min,
            weight_max,
            unit,
            fee_usd: None,
            base_usd: Some(base),
            overage_rules,
            variant: String::new(),
        }
    }

    /// Flat fee wins over a tiered base. `None` for a row with neither.
    pub fn pricing(&self) -> Option<Pricing<'_>> {
        match (self.fee_usd, self.base_usd) {
            (Some(fee), _) => Some(Pricing::Flat(fee)),
            (None, Some(base)) => Some(Pricing::Tiered {
                base,
                overage: &self.overage_rules,
            }),
            (None, None) => None,
        }
    }

    /// Whether the weight band contains `weight_lb`. Ounce rows compare
    /// `weight_lb * 16`; every other row compares pounds.
    pub fn covers_weight(&self, weight_lb: f64) -> bool {
        let w = match self.unit.resolved() {
            WeightUnit::Ounce => weight_lb * 16.0,
            _ => weight_lb,
        };
        let max = self.weight_max.unwrap_or(f64::INFINITY);
        w >= self.weight_min && w <= max
    }

    pub fn key(&self) -> FulfillmentKey {
        FulfillmentKey {
            tier: self.tier.clone(),
            variant: self.variant.clone(),
            weight_min: self.weight_min,
            weight_max: self.weight_max,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        const TABLE: &str = "fulfillment fee";
        if self.tier.trim().is_empty() {
            return Err(CoreError::invalid(TABLE, "tier is required"));
        }
        if !matches!(self.unit, WeightUnit::Ounce | WeightUnit::Pound) {
            return Err(CoreError::invalid(
                TABLE,
                format!("unit must be oz or lb, got {}", self.unit),
            ));
        }
        if !(self.weight_min >= 0.0) {
            return Err(CoreError::invalid(TABLE, "weightMin must be >= 0"));
        }
        if let Some(max) = self.weight_max
            && max < self.weight_min
        {
            return Err(CoreError::invalid(
                TABLE,
                format!("weightMin {} > weightMax {max}", self.weight_min),
            ));
        }
        let tiered = self.base_usd.is_some() || !self.overage_rules.is_empty();
        match (self.fee_usd.is_some(), tiered) {
            (true, true) => Err(CoreError::invalid(
                TABLE,
                "feeUSD and baseUSD/overageRules are mutually exclusive",
            )),
            (false, false) => Err(CoreError::invalid(
                TABLE,
                "one of feeUSD or baseUSD is required",
            )),
            (false, true) if self.base_usd.is_none() => Err(CoreError::invalid(
                TABLE,
                "overageRules require baseUSD",
            )),
            _ => Ok(()),
        }
    }
}

// ── Size tiers ──

/// One rung of the size-tier ladder. Thresholds are maxima in the row's
/// units; `None` leaves that dimension unconstrained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeTierRule {
    /// Size-tier-table name, e.g. "Small standard-size".
    pub tier: String,
    #[serde(default)]
    pub shipping_weight_max: Option<f64>,
    #[serde(default)]
    pub longest_max: Option<f64>,
    #[serde(default)]
    pub median_max: Option<f64>,
    #[serde(default)]
    pub shortest_max: Option<f64>,
    #[serde(default)]
    pub length_girth_max: Option<f64>,
    #[serde(default)]
    pub unit_length: LengthUnit,
    #[serde(default)]
    pub unit_weight: WeightUnit,
    #[serde(default)]
    pub variant: String,
}

/// A size-tier rule's thresholds normalised to inches and pounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierLimits {
    pub shipping_weight_lb: Option<f64>,
    pub longest_in: Option<f64>,
    pub median_in: Option<f64>,
    pub shortest_in: Option<f64>,
    pub length_girth_in: Option<f64>,
}

impl SizeTierRule {
    /// An unconstrained rule; set thresholds with struct update syntax.
    pub fn open(tier: &str) -> Self {
        Self {
            tier: tier.to_string(),
            shipping_weight_max: None,
            longest_max: None,
            median_max: None,
            shortest_max: None,
            length_girth_max: None,
            unit_length: LengthUnit::Inch,
            unit_weight: WeightUnit::Pound,
            variant: String::new(),
        }
    }

    pub fn limits(&self) -> TierLimits {
        let len = |v: Option<f64>| v.map(|v| self.unit_length.to_inches(v));
        TierLimits {
            shipping_weight_lb: self.shipping_weight_max.map(|v| self.unit_weight.to_pounds(v)),
            longest_in: len(self.longest_max),
            median_in: len(self.median_max),
            shortest_in: len(self.shortest_max),
            length_girth_in: len(self.length_girth_max),
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        const TABLE: &str = "size tier";
        if self.tier.trim().is_empty() {
            return Err(CoreError::invalid(TABLE, "tier is required"));
        }
        let thresholds = [
            ("shippingWeightMax", self.shipping_weight_max),
            ("longestMax", self.longest_max),
            ("medianMax", self.median_max),
            ("shortestMax", self.shortest_max),
            ("lengthGirthMax", self.length_girth_max),
        ];
        for (name, value) in thresholds {
            if let Some(v) = value
                && !(v >= 0.0)
            {
                return Err(CoreError::invalid(TABLE, format!("{name} must be >= 0")));
            }
        }
        Ok(())
    }
}

// ── Ladder ordering ──

/// Position of a tier name on the standard-to-oversize ladder.
///
/// Understands both vocabularies ("Small standard-size", "Small Standard").
/// Unknown names sort last.
pub fn tier_rank(tier: &str) -> u32 {
    let t = tier.to_lowercase();
    let has = |w: &str| t.contains(w);
    if has("standard") && has("small") {
        1
    } else if has("standard") && has("large") {
        2
    } else if has("oversize") && has("small") {
        3
    } else if has("oversize") && has("medium") {
        4
    } else if has("oversize") && has("large") {
        5
    } else if has("special") || has("extra large") {
        6
    } else {
        999
    }
}

fn unit_rank(unit: WeightUnit) -> u32 {
    match unit.resolved() {
        WeightUnit::Ounce => 1,
        WeightUnit::Pound => 2,
        _ => 999,
    }
}

/// Dashboard order for fulfillment rows: tier, then unit (oz before lb),
/// then `weightMin`.
pub fn fulfillment_order(a: &FbaFeeRule, b: &FbaFeeRule) -> Ordering {
    tier_rank(&a.tier)
        .cmp(&tier_rank(&b.tier))
        .then(unit_rank(a.unit).cmp(&unit_rank(b.unit)))
        .then(a.weight_min.total_cmp(&b.weight_min))
}

/// Dashboard order for size-tier rows: smallest to largest, unbounded
/// weights last within a tier.
pub fn size_tier_order(a: &SizeTierRule, b: &SizeTierRule) -> Ordering {
    let bound = |v: Option<f64>| v.unwrap_or(f64::INFINITY);
    tier_rank(&a.tier)
        .cmp(&tier_rank(&b.tier))
        .then(bound(a.shipping_weight_max).total_cmp(&bound(b.shipping_weight_max)))
        .then(bound(a.longest_max).total_cmp(&bound(b.longest_max)))
}

/// Referral rows by category, then price floor.
pub fn referral_order(a: &ReferralFeeRule, b: &ReferralFeeRule) -> Ordering {
    a.category
        .to_lowercase()
        .cmp(&b.category.to_lowercase())
        .then(a.floor().total_cmp(&b.floor()))
}

pub fn sort_fulfillment_rules(rules: &mut [FbaFeeRule]) {
    rules.sort_by(fulfillment_order);
}

pub fn sort_size_tier_rules(rules: &mut [SizeTierRule]) {
    rules.sort_by(size_tier_order);
}

/// All three rule tables, in stored order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuleTables {
    pub referral_fee_rules: Vec<ReferralFeeRule>,
    pub fba_fee_rules: Vec<FbaFeeRule>,
    pub size_tier_rules: Vec<SizeTierRule>,
}

impl RuleTables {
    /// Validate every row, reporting the first failure with its index.
    pub fn validate(&self) -> Result<(), CoreError> {
        let with_index = |i: usize, e: CoreError| match e {
            CoreError::InvalidRule { table, reason } => {
                CoreError::invalid(table, format!("row {i}: {reason}"))
            }
            other => other,
        };
        for (i, r) in self.referral_fee_rules.iter().enumerate() {
            r.validate().map_err(|e| with_index(i, e))?;
        }
        for (i, r) in self.fba_fee_rules.iter().enumerate() {
            r.validate().map_err(|e| with_index(i, e))?;
        }
        for (i, r) in self.size_tier_rules.iter().enumerate() {
            r.validate().map_err(|e| with_index(i, e))?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.referral_fee_rules.is_empty()
            && self.fba_fee_rules.is_empty()
            && self.size_tier_rules.is_empty()
    }
}
