use feedash_core::{Dimensions, LengthUnit, WeightUnit, length_girth, to_inches, to_pounds};
use proptest::prelude::*;

fn side() -> impl Strategy<Value = f64> {
    0.01f64..500.0
}

fn unit_text() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("in".to_string()),
        Just("Inches".to_string()),
        Just("cm".to_string()),
        Just("mm".to_string()),
        Just("".to_string()),
        "[a-z]{1,8}",
    ]
}

proptest! {
    #[test]
    fn pounds_identity_on_canonical_unit(x in -1e6f64..1e6) {
        prop_assert_eq!(to_pounds(to_pounds(Some(x), "lb"), "lb"), Some(x));
    }

    #[test]
    fn unknown_units_never_fail(x in 0.0f64..1e4, unit in "[a-z ]{0,12}") {
        prop_assert!(to_pounds(Some(x), &unit).is_some());
        prop_assert!(to_inches(Some(x), &unit).is_some());
        let parsed = WeightUnit::parse(&unit);
        if parsed == WeightUnit::Unknown {
            prop_assert_eq!(to_pounds(Some(x), &unit), Some(x));
        }
        if LengthUnit::parse(&unit) == LengthUnit::Unknown {
            prop_assert_eq!(to_inches(Some(x), &unit), Some(x));
        }
    }

    #[test]
    fn weight_unit_round_trip(x in 0.0f64..1e4) {
        for unit in [WeightUnit::Ounce, WeightUnit::Gram, WeightUnit::Kilogram, WeightUnit::Pound] {
            let back = unit.from_pounds(unit.to_pounds(x));
            prop_assert!((back - x).abs() <= 1e-9 * x.max(1.0));
        }
    }

    #[test]
    fn girth_stats_are_ordered(l in side(), w in side(), h in side(), unit in unit_text()) {
        let stats = length_girth(&Dimensions::new(l, w, h, &unit)).unwrap();
        let median = stats.median.unwrap();
        prop_assert!(stats.longest >= median);
        prop_assert!(median >= stats.shortest);
        let expected = stats.longest + 2.0 * (median + stats.shortest);
        prop_assert!((stats.length_plus_girth - expected).abs() < 1e-9 * expected.max(1.0));
    }

    #[test]
    fn length_plus_girth_is_invariant_to_side_order(l in side(), w in side(), h in side()) {
        let a = length_girth(&Dimensions::new(l, w, h, "in")).unwrap();
        let b = length_girth(&Dimensions::new(h, l, w, "in")).unwrap();
        prop_assert_eq!(a, b);
    }
}
