//! Product listing attributes consumed by the fee engine.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dimensions::Dimensions;
use crate::units::WeightUnit;

/// Item weight as crawled: a number and a free-text unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Weight {
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub unit: String,
    /// Original listing text, e.g. "1.2 Pounds".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Weight {
    pub fn new(value: f64, unit: &str) -> Self {
        Self {
            value: Some(value),
            unit: unit.to_string(),
            display: None,
        }
    }

    pub fn pounds(&self) -> Option<f64> {
        let v = self.value.filter(|v| v.is_finite())?;
        Some(WeightUnit::parse(&self.unit).to_pounds(v))
    }
}

/// A crawled product record. Only the fields the fee engine reads are typed;
/// the rest of the crawler payload is ignored on deserialisation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default, rename = "productName", alias = "name")]
    pub name: Option<String>,
    #[serde(default)]
    pub asin: Option<String>,
    /// Listing price in USD.
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub weight: Option<Weight>,
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
    #[serde(default)]
    pub sold_by: Option<String>,
}

/// Who physically fulfils the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Fulfilled by the marketplace (FBA): referral + fulfillment fee.
    Fba,
    /// Fulfilled by the merchant (FBM): referral fee only.
    Fbm,
}

impl Channel {
    /// A seller string containing "amazon" (any case) means FBA.
    pub fn from_sold_by(sold_by: Option<&str>) -> Self {
        match sold_by {
            Some(s) if s.to_lowercase().contains("amazon") => Self::Fba,
            _ => Self::Fbm,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fba => "FBA",
            Self::Fbm => "FBM",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Product {
    pub fn channel(&self) -> Channel {
        Channel::from_sold_by(self.sold_by.as_deref())
    }

    /// Weight in pounds, if the listing has a usable weight.
    pub fn weight_lb(&self) -> Option<f64> {
        self.weight.as_ref().and_then(Weight::pounds)
    }

    /// Price usable for fee computation: present, finite and positive.
    pub fn fee_price(&self) -> Option<f64> {
        self.price.filter(|p| p.is_finite() && *p > 0.0)
    }

    /// Non-blank category text.
    pub fn fee_category(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_from_sold_by() {
        assert_eq!(Channel::from_sold_by(Some("Amazon.com")), Channel::Fba);
        assert_eq!(Channel::from_sold_by(Some("Ships from AMAZON")), Channel::Fba);
        assert_eq!(Channel::from_sold_by(Some("ThirdPartySeller")), Channel::Fbm);
        assert_eq!(Channel::from_sold_by(None), Channel::Fbm);
    }

    #[test]
    fn deserializes_crawler_record() {
        let json = r#"{
            "productName": "Insulated Tumbler 30oz",
            "asin": "B0TEST1234",
            "price": 24.99,
            "category": "Kitchen & Dining",
            "soldBy": "Amazon.com",
            "rating": "4.7 out of 5 stars",
            "weight": {"value": 1.2, "unit": "Pounds", "display": "1.2 Pounds"},
            "dimensions": {"length": 4.69, "width": 3.94, "height": 9.75, "unit": "inches"}
        }"#;
        let p: Product = serde_json::from_str(json).unwrap();
        assert_eq!(p.name.as_deref(), Some("Insulated Tumbler 30oz"));
        assert_eq!(p.channel(), Channel::Fba);
        assert_eq!(p.weight_lb(), Some(1.2));
        assert_eq!(p.fee_category(), Some("Kitchen & Dining"));
    }

    #[test]
    fn unusable_price_and_category() {
        let p = Product {
            price: Some(0.0),
            category: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(p.fee_price(), None);
        assert_eq!(p.fee_category(), None);
    }

    #[test]
    fn ounce_weight_in_pounds() {
        let p = Product {
            weight: Some(Weight::new(8.0, "ounces")),
            ..Default::default()
        };
        assert_eq!(p.weight_lb(), Some(0.5));
    }
}
