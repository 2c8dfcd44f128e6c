pub mod catalog;
pub mod config;
pub mod dimensions;
pub mod error;
pub mod fulfillment;
pub mod product;
pub mod referral;
pub mod rulebook;
pub mod rules;
pub mod schema;
pub mod size_tier;
pub mod units;

pub use catalog::{CatalogEntry, CatalogFilter, FeeRange, SortKey, build_catalog};
pub use config::EngineConfig;
pub use dimensions::{DimensionStats, Dimensions, length_girth};
pub use error::CoreError;
pub use product::{Channel, Product, Weight};
pub use rulebook::{FeeEstimate, RuleBook, format_usd, total_fee};
pub use rules::{
    ApplyTo, FbaFeeRule, OverageRule, Pricing, ReferralFeeRule, RuleTables, SizeTierRule,
    tier_rank,
};
pub use schema::fees;
pub use size_tier::SizeTier;
pub use units::{LengthUnit, WeightUnit, to_inches, to_pounds};
