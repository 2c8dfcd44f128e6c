//! Package dimension statistics used by size-tier classification.

use serde::{Deserialize, Serialize};

use crate::units::LengthUnit;

/// Raw package dimensions as crawled from a listing.
///
/// Any side may be missing. `unit` is free text ("inches", "cm", ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub unit: String,
    /// Original listing text, e.g. "4.69 x 3.94 x 0.75 inches".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// Longest/median/shortest sides and length-plus-girth, all in inches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DimensionStats {
    pub longest: f64,
    /// `None` when only two sides are known.
    pub median: Option<f64>,
    pub shortest: f64,
    pub length_plus_girth: f64,
}

impl Dimensions {
    pub fn new(length: f64, width: f64, height: f64, unit: &str) -> Self {
        Self {
            length: Some(length),
            width: Some(width),
            height: Some(height),
            unit: unit.to_string(),
            display: None,
        }
    }

    /// The three sides converted to inches, in `[length, width, height]` order.
    pub fn sides_in_inches(&self) -> [Option<f64>; 3] {
        let unit = LengthUnit::parse(&self.unit);
        [self.length, self.width, self.height]
            .map(|side| side.filter(|v| v.is_finite()).map(|v| unit.to_inches(v)))
    }

    /// Volume in cubic inches; `None` unless all three sides are known.
    pub fn cubic_inches(&self) -> Option<f64> {
        let [l, w, h] = self.sides_in_inches();
        Some(l? * w? * h?)
    }

    pub fn is_complete(&self) -> bool {
        self.sides_in_inches().iter().all(Option::is_some)
    }
}

/// Derive side ordering and length-plus-girth from raw dimensions.
///
/// Girth wraps the two smaller sides: `2 * (median + shortest)`. With only
/// two known sides the girth is `2 * shortest` and there is no median.
/// Returns `None` when fewer than two sides are known.
pub fn length_girth(dims: &Dimensions) -> Option<DimensionStats> {
    let mut sides: Vec<f64> = dims.sides_in_inches().into_iter().flatten().collect();
    if sides.len() < 2 {
        return None;
    }
    sides.sort_by(|a, b| b.total_cmp(a));

    let longest = sides[0];
    let stats = match sides[..] {
        [_, shortest] => DimensionStats {
            longest,
            median: None,
            shortest,
            length_plus_girth: longest + 2.0 * shortest,
        },
        [_, median, shortest, ..] => DimensionStats {
            longest,
            median: Some(median),
            shortest,
            length_plus_girth: longest + 2.0 * (median + shortest),
        },
        _ => return None,
    };
    Some(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_sides() {
        let stats = length_girth(&Dimensions::new(10.0, 6.0, 4.0, "in")).unwrap();
        assert_eq!(stats.longest, 10.0);
        assert_eq!(stats.median, Some(6.0));
        assert_eq!(stats.shortest, 4.0);
        assert_eq!(stats.length_plus_girth, 30.0);
    }

    #[test]
    fn sides_are_sorted_regardless_of_input_order() {
        let stats = length_girth(&Dimensions::new(4.0, 10.0, 6.0, "inches")).unwrap();
        assert_eq!(stats.longest, 10.0);
        assert_eq!(stats.median, Some(6.0));
        assert_eq!(stats.shortest, 4.0);
    }

    #[test]
    fn two_sides_have_no_median() {
        let dims = Dimensions {
            length: None,
            width: Some(6.0),
            height: Some(4.0),
            unit: "in".into(),
            display: None,
        };
        let stats = length_girth(&dims).unwrap();
        assert_eq!(stats.longest, 6.0);
        assert_eq!(stats.median, None);
        assert_eq!(stats.shortest, 4.0);
        assert_eq!(stats.length_plus_girth, 14.0);
    }

    #[test]
    fn one_side_is_insufficient() {
        let dims = Dimensions {
            length: Some(12.0),
            ..Default::default()
        };
        assert!(length_girth(&dims).is_none());
        assert!(length_girth(&Dimensions::default()).is_none());
    }

    #[test]
    fn centimetres_are_converted() {
        let stats = length_girth(&Dimensions::new(25.4, 12.7, 2.54, "cm")).unwrap();
        assert!((stats.longest - 10.0).abs() < 1e-9);
        assert!((stats.median.unwrap() - 5.0).abs() < 1e-9);
        assert!((stats.shortest - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cubic_inches_needs_all_sides() {
        assert_eq!(Dimensions::new(2.0, 3.0, 4.0, "in").cubic_inches(), Some(24.0));
        let partial = Dimensions {
            width: Some(3.0),
            height: Some(4.0),
            ..Default::default()
        };
        assert_eq!(partial.cubic_inches(), None);
        assert!(!partial.is_complete());
    }

    #[test]
    fn deserializes_crawler_shape() {
        let json = r#"{"length": 4.69, "width": 3.94, "height": 0.75,
                       "unit": "inches", "display": "4.69 x 3.94 x 0.75 inches"}"#;
        let dims: Dimensions = serde_json::from_str(json).unwrap();
        assert_eq!(dims.length, Some(4.69));
        assert_eq!(dims.unit, "inches");
    }
}
