//! Unit normalisation for crawled product measurements.
//!
//! Crawled listings carry free-text units ("Inches", "centimeters", "Pounds",
//! "8.5 ounces"). Everything downstream works in inches and pounds, so each
//! raw unit string is parsed into a [`LengthUnit`] or [`WeightUnit`] first.
//!
//! Parsing is permissive: a string that matches nothing becomes `Unknown`,
//! and `Unknown` converts as the canonical unit (inches, pounds). A bad unit
//! never produces an error.

use std::fmt;

use serde::{Deserialize, Serialize};

const CM_PER_INCH: f64 = 2.54;
const MM_PER_INCH: f64 = 25.4;
const LB_PER_KG: f64 = 2.20462;
const G_PER_LB: f64 = 453.592;
const OZ_PER_LB: f64 = 16.0;

/// A length unit parsed from a listing or a rule row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LengthUnit {
    #[default]
    Inch,
    Centimeter,
    Millimeter,
    /// Unrecognised text; converts as inches.
    Unknown,
}

impl LengthUnit {
    /// Parse by case-insensitive substring: `cm`, then `mm`, then `in`.
    pub fn parse(raw: &str) -> Self {
        let u = raw.trim().to_ascii_lowercase();
        if u.contains("cm") || u.contains("centimet") {
            Self::Centimeter
        } else if u.contains("mm") || u.contains("millimet") {
            Self::Millimeter
        } else if u.contains("in") {
            Self::Inch
        } else {
            Self::Unknown
        }
    }

    /// The unit actually used for conversion (`Unknown` maps to inches).
    pub fn resolved(self) -> Self {
        match self {
            Self::Unknown => Self::Inch,
            other => other,
        }
    }

    pub fn to_inches(self, value: f64) -> f64 {
        match self.resolved() {
            Self::Centimeter => value / CM_PER_INCH,
            Self::Millimeter => value / MM_PER_INCH,
            _ => value,
        }
    }

    pub fn as_code(self) -> &'static str {
        match self.resolved() {
            Self::Centimeter => "cm",
            Self::Millimeter => "mm",
            _ => "in",
        }
    }
}

impl From<String> for LengthUnit {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<LengthUnit> for String {
    fn from(u: LengthUnit) -> Self {
        u.as_code().to_string()
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// A weight unit parsed from a listing or a rule row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WeightUnit {
    #[default]
    Pound,
    Ounce,
    Gram,
    Kilogram,
    /// Unrecognised text; converts as pounds.
    Unknown,
}

impl WeightUnit {
    /// Parse a weight unit.
    ///
    /// Short codes match exactly (`kg`, `g`, `oz`, `lb` and their plurals);
    /// spelled-out names match by substring. Kilograms are checked before
    /// grams so "kilograms" is not read as grams.
    pub fn parse(raw: &str) -> Self {
        let u = raw.trim().to_ascii_lowercase();
        match u.as_str() {
            "kg" | "kgs" => return Self::Kilogram,
            "g" | "gs" => return Self::Gram,
            "oz" | "ozs" => return Self::Ounce,
            "lb" | "lbs" => return Self::Pound,
            _ => {}
        }
        if u.contains("kilogram") {
            Self::Kilogram
        } else if u.contains("gram") {
            Self::Gram
        } else if u.contains("ounce") {
            Self::Ounce
        } else if u.contains("pound") {
            Self::Pound
        } else {
            Self::Unknown
        }
    }

    /// The unit actually used for conversion (`Unknown` maps to pounds).
    pub fn resolved(self) -> Self {
        match self {
            Self::Unknown => Self::Pound,
            other => other,
        }
    }

    pub fn to_pounds(self, value: f64) -> f64 {
        match self.resolved() {
            Self::Kilogram => value * LB_PER_KG,
            Self::Gram => value / G_PER_LB,
            Self::Ounce => value / OZ_PER_LB,
            _ => value,
        }
    }

    /// Inverse of [`to_pounds`](Self::to_pounds).
    pub fn from_pounds(self, pounds: f64) -> f64 {
        match self.resolved() {
            Self::Kilogram => pounds / LB_PER_KG,
            Self::Gram => pounds * G_PER_LB,
            Self::Ounce => pounds * OZ_PER_LB,
            _ => pounds,
        }
    }

    pub fn as_code(self) -> &'static str {
        match self.resolved() {
            Self::Kilogram => "kg",
            Self::Gram => "g",
            Self::Ounce => "oz",
            _ => "lb",
        }
    }
}

impl From<String> for WeightUnit {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<WeightUnit> for String {
    fn from(u: WeightUnit) -> Self {
        u.as_code().to_string()
    }
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// Convert a possibly-missing length to inches.
///
/// Missing or non-finite values stay `None`.
pub fn to_inches(value: Option<f64>, unit: &str) -> Option<f64> {
    let v = value.filter(|v| v.is_finite())?;
    Some(LengthUnit::parse(unit).to_inches(v))
}

/// Convert a possibly-missing weight to pounds.
pub fn to_pounds(value: Option<f64>, unit: &str) -> Option<f64> {
    let v = value.filter(|v| v.is_finite())?;
    Some(WeightUnit::parse(unit).to_pounds(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn length_units_by_substring() {
        assert_eq!(LengthUnit::parse("cm"), LengthUnit::Centimeter);
        assert_eq!(LengthUnit::parse("Centimeters"), LengthUnit::Centimeter);
        assert_eq!(LengthUnit::parse("MM"), LengthUnit::Millimeter);
        assert_eq!(LengthUnit::parse("millimetres"), LengthUnit::Millimeter);
        assert_eq!(LengthUnit::parse("Inches"), LengthUnit::Inch);
        assert_eq!(LengthUnit::parse("in"), LengthUnit::Inch);
        assert_eq!(LengthUnit::parse("furlongs"), LengthUnit::Unknown);
        assert_eq!(LengthUnit::parse(""), LengthUnit::Unknown);
    }

    #[test]
    fn unknown_length_converts_as_inches() {
        assert_eq!(LengthUnit::Unknown.resolved(), LengthUnit::Inch);
        assert_eq!(to_inches(Some(7.0), "parsecs"), Some(7.0));
    }

    #[test]
    fn length_conversions() {
        assert!(close(to_inches(Some(2.54), "cm").unwrap(), 1.0));
        assert!(close(to_inches(Some(25.4), "mm").unwrap(), 1.0));
        assert_eq!(to_inches(Some(4.69), "inches"), Some(4.69));
    }

    #[test]
    fn missing_values_propagate() {
        assert_eq!(to_inches(None, "cm"), None);
        assert_eq!(to_pounds(None, "kg"), None);
        assert_eq!(to_pounds(Some(f64::NAN), "kg"), None);
    }

    #[test]
    fn weight_units() {
        assert_eq!(WeightUnit::parse("kg"), WeightUnit::Kilogram);
        assert_eq!(WeightUnit::parse("Kilograms"), WeightUnit::Kilogram);
        assert_eq!(WeightUnit::parse("g"), WeightUnit::Gram);
        assert_eq!(WeightUnit::parse("Grams"), WeightUnit::Gram);
        assert_eq!(WeightUnit::parse("oz"), WeightUnit::Ounce);
        assert_eq!(WeightUnit::parse("Ounces"), WeightUnit::Ounce);
        assert_eq!(WeightUnit::parse("Pounds"), WeightUnit::Pound);
        assert_eq!(WeightUnit::parse("lbs"), WeightUnit::Pound);
        assert_eq!(WeightUnit::parse("stone"), WeightUnit::Unknown);
    }

    #[test]
    fn weight_conversions() {
        assert!(close(to_pounds(Some(2.20462), "kg").unwrap(), 4.8603493444));
        assert!(close(to_pounds(Some(1.0), "kg").unwrap(), 2.20462));
        assert!(close(to_pounds(Some(453.592), "grams").unwrap(), 1.0));
        assert!(close(to_pounds(Some(8.0), "ounces").unwrap(), 0.5));
        assert_eq!(to_pounds(Some(1.2), "Pounds"), Some(1.2));
        assert_eq!(to_pounds(Some(3.0), "bushels"), Some(3.0));
    }

    #[test]
    fn from_pounds_inverts_to_pounds() {
        for unit in [
            WeightUnit::Pound,
            WeightUnit::Ounce,
            WeightUnit::Gram,
            WeightUnit::Kilogram,
        ] {
            let lb = unit.to_pounds(12.5);
            assert!(close(unit.from_pounds(lb), 12.5), "{unit}");
        }
    }

    #[test]
    fn serde_uses_codes() {
        let u: WeightUnit = serde_json::from_str("\"OZ\"").unwrap();
        assert_eq!(u, WeightUnit::Ounce);
        assert_eq!(serde_json::to_string(&u).unwrap(), "\"oz\"");
        let l: LengthUnit = serde_json::from_str("\"cm\"").unwrap();
        assert_eq!(serde_json::to_string(&l).unwrap(), "\"cm\"");
    }
}
