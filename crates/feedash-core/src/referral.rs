//! Referral fee calculation.

use tracing::debug;

use crate::rules::{ApplyTo, ReferralFeeRule};

/// Compute the marketplace referral fee for a category and price.
///
/// Every rule whose category loosely matches and whose price band contains
/// `price` contributes to the fee:
///
/// - [`ApplyTo::Total`]: `price * feePercent`
/// - [`ApplyTo::Portion`]: the length of `[0, price]` inside the rule's band,
///   times `feePercent`
/// - [`ApplyTo::Other`]: nothing; only the rule's `minFeeUSD` counts
///
/// Matches are visited narrowest band first. The largest `minFeeUSD` among
/// the matches acts as a floor. Returns `None` when nothing matches, when the
/// inputs are unusable, or when the resulting fee is not positive.
pub fn referral_fee(rules: &[ReferralFeeRule], category: &str, price: f64) -> Option<f64> {
    let category = category.trim();
    if category.is_empty() || !price.is_finite() || price <= 0.0 {
        return None;
    }

    let mut matches: Vec<&ReferralFeeRule> = rules
        .iter()
        .filter(|r| r.matches_category(category) && r.covers_price(price))
        .collect();
    if matches.is_empty() {
        debug!(category, price, "no referral rule matched");
        return None;
    }
    matches.sort_by(|a, b| a.band_width().total_cmp(&b.band_width()));

    let mut fee: f64 = matches
        .iter()
        .map(|r| match &r.apply_to {
            ApplyTo::Total => price * r.fee_percent,
            ApplyTo::Portion => {
                let start = r.floor().max(0.0);
                let end = price.min(r.ceiling());
                (end - start).max(0.0) * r.fee_percent
            }
            ApplyTo::Other(_) => 0.0,
        })
        .sum();

    let min_fee = matches
        .iter()
        .map(|r| r.min_fee_usd)
        .fold(0.0_f64, f64::max);
    if min_fee > 0.0 && fee < min_fee {
        debug!(fee, min_fee, "referral fee raised to minimum");
        fee = min_fee;
    }

    debug!(category, price, matched = matches.len(), fee, "referral fee");
    (fee > 0.0).then_some(fee)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kitchen() -> ReferralFeeRule {
        ReferralFeeRule {
            min_fee_usd: 0.30,
            ..ReferralFeeRule::new("Kitchen", Some(0.0), None, 0.15)
        }
    }

    fn close(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-9)
    }

    #[test]
    fn total_percentage() {
        assert!(close(referral_fee(&[kitchen()], "Kitchen", 50.0), 7.5));
    }

    #[test]
    fn minimum_fee_floor() {
        assert!(close(referral_fee(&[kitchen()], "Kitchen", 1.0), 0.30));
    }

    #[test]
    fn loose_category_match() {
        assert!(close(referral_fee(&[kitchen()], "Kitchen & Dining", 10.0), 1.5));
        assert!(close(referral_fee(&[kitchen()], "kit", 10.0), 1.5));
        assert_eq!(referral_fee(&[kitchen()], "Toys & Games", 10.0), None);
    }

    #[test]
    fn unusable_inputs() {
        assert_eq!(referral_fee(&[kitchen()], "", 10.0), None);
        assert_eq!(referral_fee(&[kitchen()], "Kitchen", 0.0), None);
        assert_eq!(referral_fee(&[kitchen()], "Kitchen", -5.0), None);
        assert_eq!(referral_fee(&[kitchen()], "Kitchen", f64::NAN), None);
        assert_eq!(referral_fee(&[], "Kitchen", 10.0), None);
    }

    #[test]
    fn price_band_is_inclusive() {
        let rule = ReferralFeeRule::new("Beauty", Some(10.0), Some(20.0), 0.08);
        assert!(close(referral_fee(&[rule.clone()], "Beauty", 10.0), 0.8));
        assert!(close(referral_fee(&[rule.clone()], "Beauty", 20.0), 1.6));
        assert_eq!(referral_fee(&[rule], "Beauty", 20.01), None);
    }

    #[test]
    fn portion_bands_split_the_price() {
        // 15% on the first $15, 20% on the part above.
        let low = ReferralFeeRule {
            apply_to: ApplyTo::Portion,
            ..ReferralFeeRule::new("Jewelry", None, Some(15.0), 0.15)
        };
        let high = ReferralFeeRule {
            apply_to: ApplyTo::Portion,
            ..ReferralFeeRule::new("Jewelry", Some(15.0), None, 0.20)
        };
        // At $10 only the low band covers the price.
        assert!(close(referral_fee(&[low.clone(), high.clone()], "Jewelry", 10.0), 1.5));
        // At $15 both bands cover it; the high band's slice is empty.
        assert!(close(referral_fee(&[low, high.clone()], "Jewelry", 15.0), 2.25));
        // At $40 only the high band covers the price and charges [15, 40].
        assert!(close(referral_fee(&[high], "Jewelry", 40.0), 5.0));
    }

    #[test]
    fn all_matches_accumulate() {
        let broad = ReferralFeeRule::new("Home", None, None, 0.10);
        let narrow = ReferralFeeRule::new("Home", Some(0.0), Some(100.0), 0.05);
        assert!(close(referral_fee(&[broad, narrow], "Home", 20.0), 3.0));
    }

    #[test]
    fn largest_minimum_wins() {
        let a = ReferralFeeRule {
            min_fee_usd: 0.30,
            ..ReferralFeeRule::new("Toys", None, None, 0.01)
        };
        let b = ReferralFeeRule {
            min_fee_usd: 1.00,
            ..ReferralFeeRule::new("Toys", None, None, 0.01)
        };
        assert!(close(referral_fee(&[a, b], "Toys", 5.0), 1.0));
    }

    #[test]
    fn unknown_mode_charges_only_the_minimum() {
        let json = r#"{"category": "Kitchen", "priceMin": 0, "applyTo": "item",
                       "feePercent": 0.15, "minFeeUSD": 0.3}"#;
        let item: ReferralFeeRule = serde_json::from_str(json).unwrap();
        assert!(close(referral_fee(&[item.clone()], "Kitchen", 50.0), 0.30));

        let no_minimum = ReferralFeeRule { min_fee_usd: 0.0, ..item };
        assert_eq!(referral_fee(&[no_minimum], "Kitchen", 50.0), None);
    }

    #[test]
    fn zero_rate_without_minimum_is_none() {
        let rule = ReferralFeeRule::new("Gift Cards", None, None, 0.0);
        assert_eq!(referral_fee(&[rule], "Gift Cards", 25.0), None);
    }
}
