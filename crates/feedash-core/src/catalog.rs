//! Catalog view: per-product fee estimates with filtering and sorting.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::CoreError;
use crate::product::{Channel, Product};
use crate::rulebook::{FeeEstimate, RuleBook};

/// An inclusive numeric range written `min-max` or `min+` (`min-+` also works).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeRange {
    pub min: f64,
    pub max: Option<f64>,
}

impl FeeRange {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && self.max.is_none_or(|max| value <= max)
    }
}

impl FromStr for FeeRange {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || CoreError::InvalidRange(s.to_string());
        let t = s.trim();
        let (min, max) = if let Some(min) = t.strip_suffix('+') {
            (min.trim_end_matches('-'), None)
        } else {
            let (min, max) = t.split_once('-').ok_or_else(bad)?;
            (min, Some(max))
        };
        let min: f64 = min.trim().parse().map_err(|_| bad())?;
        let max = match max {
            Some(m) => Some(m.trim().parse::<f64>().map_err(|_| bad())?),
            None => None,
        };
        if max.is_some_and(|m| m < min) {
            return Err(bad());
        }
        Ok(Self { min, max })
    }
}

impl fmt::Display for FeeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "{}-{}", self.min, max),
            None => write!(f, "{}+", self.min),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    PriceAsc,
    PriceDesc,
    FeeAsc,
    FeeDesc,
    ReferralAsc,
    ReferralDesc,
}

impl FromStr for SortKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "price_asc" => Ok(Self::PriceAsc),
            "price_desc" => Ok(Self::PriceDesc),
            "fee_asc" => Ok(Self::FeeAsc),
            "fee_desc" => Ok(Self::FeeDesc),
            "referral_asc" => Ok(Self::ReferralAsc),
            "referral_desc" => Ok(Self::ReferralDesc),
            other => Err(CoreError::UnknownSortKey(other.to_string())),
        }
    }
}

/// Catalog filter. Every set criterion must hold.
///
/// Fee ranges are compared against the cent-rounded value a reader sees, and
/// a product with no computable fee never passes a fee range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogFilter {
    /// Restrict to one channel. Products without a seller are excluded.
    pub channel: Option<Channel>,
    pub price: Option<FeeRange>,
    pub total_fee: Option<FeeRange>,
    pub referral_fee: Option<FeeRange>,
}

fn cents(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn in_range(range: Option<&FeeRange>, value: Option<f64>) -> bool {
    match range {
        None => true,
        Some(r) => value.is_some_and(|v| r.contains(cents(v))),
    }
}

impl CatalogFilter {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn accepts(&self, product: &Product, estimate: &FeeEstimate) -> bool {
        if let Some(channel) = self.channel
            && (product.sold_by.is_none() || estimate.channel != channel)
        {
            return false;
        }
        in_range(self.price.as_ref(), product.fee_price())
            && in_range(self.total_fee.as_ref(), estimate.total)
            && in_range(self.referral_fee.as_ref(), estimate.referral_fee)
    }
}

/// A product paired with its fee estimate.
#[derive(Debug, Clone)]
pub struct CatalogEntry<'a> {
    pub product: &'a Product,
    pub estimate: FeeEstimate,
}

// Unknown values sort after known ones in either direction.
fn cmp_optional(a: Option<f64>, b: Option<f64>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if descending => b.total_cmp(&a),
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn sort_entries(entries: &mut [CatalogEntry<'_>], key: SortKey) {
    entries.sort_by(|a, b| match key {
        SortKey::PriceAsc => cmp_optional(a.product.price, b.product.price, false),
        SortKey::PriceDesc => cmp_optional(a.product.price, b.product.price, true),
        SortKey::FeeAsc => cmp_optional(a.estimate.total, b.estimate.total, false),
        SortKey::FeeDesc => cmp_optional(a.estimate.total, b.estimate.total, true),
        SortKey::ReferralAsc => {
            cmp_optional(a.estimate.referral_fee, b.estimate.referral_fee, false)
        }
        SortKey::ReferralDesc => {
            cmp_optional(a.estimate.referral_fee, b.estimate.referral_fee, true)
        }
    });
}

/// Estimate, filter and optionally sort a catalog.
///
/// Without a sort key the input order is kept.
pub fn build_catalog<'a>(
    book: &RuleBook,
    products: &'a [Product],
    filter: &CatalogFilter,
    sort: Option<SortKey>,
) -> Vec<CatalogEntry<'a>> {
    let estimates = book.estimate_catalog(products);
    let mut entries: Vec<CatalogEntry<'a>> = products
        .iter()
        .zip(estimates)
        .filter(|(p, e)| filter.accepts(p, e))
        .map(|(product, estimate)| CatalogEntry { product, estimate })
        .collect();
    if let Some(key) = sort {
        sort_entries(&mut entries, key);
    }
    tracing::debug!(
        products = products.len(),
        shown = entries.len(),
        ?sort,
        "built catalog"
    );
    entries
}
