//! HTTP client for the dashboard's rule and product endpoints.

use feedash_core::{FbaFeeRule, Product, ReferralFeeRule, RuleTables, SizeTierRule};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Server-side filter for a rule listing. `name` is the category for
/// referral rules and the tier for fulfillment and size-tier rules.
#[derive(Debug, Clone, Default)]
pub struct RuleQuery {
    pub name: Option<String>,
    pub variant: Option<String>,
}

impl RuleQuery {
    fn pairs(&self, name_param: &'static str) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(name) = &self.name {
            pairs.push((name_param, name.clone()));
        }
        if let Some(variant) = &self.variant {
            pairs.push(("variant", variant.clone()));
        }
        pairs
    }
}

/// Server-side filter for `/api/products`.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub source: Option<String>,
}

impl ProductQuery {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(s) = &self.search {
            pairs.push(("search", s.clone()));
        }
        if let Some(c) = &self.category {
            pairs.push(("category", c.clone()));
        }
        if let Some(p) = self.min_price {
            pairs.push(("minPrice", p.to_string()));
        }
        if let Some(p) = self.max_price {
            pairs.push(("maxPrice", p.to_string()));
        }
        if let Some(s) = &self.source {
            pairs.push(("source", s.clone()));
        }
        pairs
    }
}

/// Read-only client for the dashboard REST API.
pub struct SyncClient {
    client: reqwest::Client,
    base_url: String,
}

impl SyncClient {
    /// Create a client for the given dashboard base URL, e.g.
    /// `http://localhost:3000`. A trailing slash is ignored.
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{path}", self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<T, SyncError> {
        let url = self.url(path);
        debug!(url = %url, ?query, "GET");
        let resp = self.client.get(&url).query(query).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::Server {
                status: status.as_u16(),
                body,
            });
        }
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn fetch_referral_rules(
        &self,
        query: &RuleQuery,
    ) -> Result<Vec<ReferralFeeRule>, SyncError> {
        let rules: Vec<ReferralFeeRule> =
            self.get_json("fee-rules", &query.pairs("category")).await?;
        info!(count = rules.len(), "pulled referral fee rules");
        Ok(rules)
    }

    pub async fn fetch_fulfillment_rules(
        &self,
        query: &RuleQuery,
    ) -> Result<Vec<FbaFeeRule>, SyncError> {
        let rules: Vec<FbaFeeRule> = self.get_json("fba-fee-rules", &query.pairs("tier")).await?;
        info!(count = rules.len(), "pulled fulfillment fee rules");
        Ok(rules)
    }

    pub async fn fetch_size_tier_rules(
        &self,
        query: &RuleQuery,
    ) -> Result<Vec<SizeTierRule>, SyncError> {
        let rules: Vec<SizeTierRule> =
            self.get_json("size-tier-rules", &query.pairs("tier")).await?;
        info!(count = rules.len(), "pulled size tier rules");
        Ok(rules)
    }

    /// Pull all three rule tables concurrently, in the server's list order.
    pub async fn fetch_rule_tables(&self) -> Result<RuleTables, SyncError> {
        let all = RuleQuery::default();
        let (referral_fee_rules, fba_fee_rules, size_tier_rules) = tokio::try_join!(
            self.fetch_referral_rules(&all),
            self.fetch_fulfillment_rules(&all),
            self.fetch_size_tier_rules(&all),
        )?;
        Ok(RuleTables {
            referral_fee_rules,
            fba_fee_rules,
            size_tier_rules,
        })
    }

    pub async fn fetch_products(&self, query: &ProductQuery) -> Result<Vec<Product>, SyncError> {
        let products: Vec<Product> = self.get_json("products", &query.pairs()).await?;
        info!(count = products.len(), "pulled products");
        Ok(products)
    }
}
