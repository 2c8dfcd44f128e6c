//! DuckDB rule store: the three fee rule tables with stable ids and an
//! explicit row order.

use std::cmp::Ordering;
use std::path::Path;

use duckdb::types::Value;
use duckdb::{Connection, Row, params, params_from_iter};
use feedash_core::rules::{fulfillment_order, referral_order, size_tier_order};
use feedash_core::{
    ApplyTo, CoreError, EngineConfig, FbaFeeRule, LengthUnit, ReferralFeeRule, RuleBook,
    RuleTables, SizeTierRule, WeightUnit,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::StoreError;

/// A persisted rule with its row id and list position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stored<T> {
    pub id: i64,
    pub position: i64,
    #[serde(flatten)]
    pub rule: T,
}

/// Narrow a listing by tier/category name (case-insensitive) and variant.
#[derive(Debug, Clone, Default)]
pub struct RuleFilter {
    pub name: Option<String>,
    pub variant: Option<String>,
}

/// Outcome of an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Created(i64),
    Updated(i64),
}

impl Upsert {
    pub fn id(self) -> i64 {
        match self {
            Self::Created(id) | Self::Updated(id) => id,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
}

impl ImportSummary {
    fn record(&mut self, outcome: Upsert) {
        match outcome {
            Upsert::Created(_) => self.created += 1,
            Upsert::Updated(_) => self.updated += 1,
        }
    }
}

fn into_rules<T>(rows: Vec<Stored<T>>) -> Vec<T> {
    rows.into_iter().map(|s| s.rule).collect()
}

fn opt(v: Option<f64>) -> Value {
    v.map_or(Value::Null, Value::Double)
}

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

/// A rule type with a table of its own.
///
/// Columns are listed in bind order; `from_row` reads them back starting at
/// `at`, after the `id` and `position` columns.
pub trait StoredRule: Sized {
    const TABLE: &'static str;
    /// Column matched by [`RuleFilter::name`].
    const NAME_COLUMN: &'static str;
    const COLUMNS: &'static [(&'static str, &'static str)];
    /// Columns forming the upsert identity.
    const KEY: &'static [&'static str];

    fn values(&self) -> Result<Vec<Value>, StoreError>;
    fn key_values(&self) -> Vec<Value>;
    fn from_row(row: &Row<'_>, at: usize) -> Result<Self, StoreError>;
    fn check(&self) -> Result<(), CoreError>;
    fn dashboard_order(a: &Self, b: &Self) -> Ordering;

    fn column_list() -> String {
        Self::COLUMNS
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn key_clause() -> String {
        Self::KEY
            .iter()
            .map(|c| format!("{c} IS NOT DISTINCT FROM ?"))
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

impl StoredRule for ReferralFeeRule {
    const TABLE: &'static str = "referral_fee_rules";
    const NAME_COLUMN: &'static str = "category";
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("category", "VARCHAR NOT NULL"),
        ("price_min", "DOUBLE"),
        ("price_max", "DOUBLE"),
        ("apply_to", "VARCHAR NOT NULL"),
        ("fee_percent", "DOUBLE NOT NULL"),
        ("min_fee_usd", "DOUBLE NOT NULL"),
        ("variant", "VARCHAR NOT NULL"),
    ];
    const KEY: &'static [&'static str] = &["category", "variant", "price_min", "price_max"];

    fn values(&self) -> Result<Vec<Value>, StoreError> {
        Ok(vec![
            text(&self.category),
            opt(self.price_min),
            opt(self.price_max),
            text(self.apply_to.as_str()),
            Value::Double(self.fee_percent),
            Value::Double(self.min_fee_usd),
            text(&self.variant),
        ])
    }

    fn key_values(&self) -> Vec<Value> {
        let key = self.key();
        vec![
            Value::Text(key.category),
            Value::Text(key.variant),
            opt(key.price_min),
            opt(key.price_max),
        ]
    }

    fn from_row(row: &Row<'_>, at: usize) -> Result<Self, StoreError> {
        Ok(Self {
            category: row.get(at)?,
            price_min: row.get(at + 1)?,
            price_max: row.get(at + 2)?,
            apply_to: ApplyTo::from(row.get::<_, String>(at + 3)?),
            fee_percent: row.get(at + 4)?,
            min_fee_usd: row.get(at + 5)?,
            variant: row.get(at + 6)?,
        })
    }

    fn check(&self) -> Result<(), CoreError> {
        self.validate()
    }

    fn dashboard_order(a: &Self, b: &Self) -> Ordering {
        referral_order(a, b)
    }
}

impl StoredRule for FbaFeeRule {
    const TABLE: &'static str = "fba_fee_rules";
    const NAME_COLUMN: &'static str = "tier";
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("tier", "VARCHAR NOT NULL"),
        ("weight_min", "DOUBLE NOT NULL"),
        ("weight_max", "DOUBLE"),
        ("unit", "VARCHAR NOT NULL"),
        ("fee_usd", "DOUBLE"),
        ("base_usd", "DOUBLE"),
        // JSON array of overage steps.
        ("overage_rules", "VARCHAR NOT NULL"),
        ("variant", "VARCHAR NOT NULL"),
    ];
    const KEY: &'static [&'static str] = &["tier", "variant", "weight_min", "weight_max"];

    fn values(&self) -> Result<Vec<Value>, StoreError> {
        Ok(vec![
            text(&self.tier),
            Value::Double(self.weight_min),
            opt(self.weight_max),
            text(self.unit.as_code()),
            opt(self.fee_usd),
            opt(self.base_usd),
            Value::Text(serde_json::to_string(&self.overage_rules)?),
            text(&self.variant),
        ])
    }

    fn key_values(&self) -> Vec<Value> {
        let key = self.key();
        vec![
            Value::Text(key.tier),
            Value::Text(key.variant),
            Value::Double(key.weight_min),
            opt(key.weight_max),
        ]
    }

    fn from_row(row: &Row<'_>, at: usize) -> Result<Self, StoreError> {
        let overage: String = row.get(at + 6)?;
        Ok(Self {
            tier: row.get(at)?,
            weight_min: row.get(at + 1)?,
            weight_max: row.get(at + 2)?,
            unit: WeightUnit::from(row.get::<_, String>(at + 3)?),
            fee_usd: row.get(at + 4)?,
            base_usd: row.get(at + 5)?,
            overage_rules: serde_json::from_str(&overage)?,
            variant: row.get(at + 7)?,
        })
    }

    fn check(&self) -> Result<(), CoreError> {
        self.validate()
    }

    fn dashboard_order(a: &Self, b: &Self) -> Ordering {
        fulfillment_order(a, b)
    }
}

impl StoredRule for SizeTierRule {
    const TABLE: &'static str = "size_tier_rules";
    const NAME_COLUMN: &'static str = "tier";
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("tier", "VARCHAR NOT NULL"),
        ("shipping_weight_max", "DOUBLE"),
        ("longest_max", "DOUBLE"),
        ("median_max", "DOUBLE"),
        ("shortest_max", "DOUBLE"),
        ("length_girth_max", "DOUBLE"),
        ("unit_length", "VARCHAR NOT NULL"),
        ("unit_weight", "VARCHAR NOT NULL"),
        ("variant", "VARCHAR NOT NULL"),
    ];
    const KEY: &'static [&'static str] = &["tier"];

    fn values(&self) -> Result<Vec<Value>, StoreError> {
        Ok(vec![
            text(&self.tier),
            opt(self.shipping_weight_max),
            opt(self.longest_max),
            opt(self.median_max),
            opt(self.shortest_max),
            opt(self.length_girth_max),
            text(self.unit_length.as_code()),
            text(self.unit_weight.as_code()),
            text(&self.variant),
        ])
    }

    fn key_values(&self) -> Vec<Value> {
        vec![text(&self.tier)]
    }

    fn from_row(row: &Row<'_>, at: usize) -> Result<Self, StoreError> {
        Ok(Self {
            tier: row.get(at)?,
            shipping_weight_max: row.get(at + 1)?,
            longest_max: row.get(at + 2)?,
            median_max: row.get(at + 3)?,
            shortest_max: row.get(at + 4)?,
            length_girth_max: row.get(at + 5)?,
            unit_length: LengthUnit::from(row.get::<_, String>(at + 6)?),
            unit_weight: WeightUnit::from(row.get::<_, String>(at + 7)?),
            variant: row.get(at + 8)?,
        })
    }

    fn check(&self) -> Result<(), CoreError> {
        self.validate()
    }

    fn dashboard_order(a: &Self, b: &Self) -> Ordering {
        size_tier_order(a, b)
    }
}

/// DuckDB store for the referral, fulfillment and size-tier rule tables.
///
/// Every row carries an `id` from a shared sequence and a `position`; lists
/// come back in `position` order, which is also the order the fee engine
/// scans rows in. New rows are appended at the end.
///
/// Supports both in-memory (ephemeral) and persistent (file-backed) modes.
/// Use [`open`](Self::open) for in-memory and [`open_persistent`](Self::open_persistent)
/// for file-backed storage that survives across process restarts.
pub struct DuckStore {
    conn: Connection,
}

impl DuckStore {
    /// Open an in-memory DuckDB database.
    pub fn open() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    /// Open or create a persistent DuckDB database at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "opened rule store");
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        let store = Self { conn };
        store
            .conn
            .execute_batch("CREATE SEQUENCE IF NOT EXISTS rule_id_seq START 1;")?;
        store.create_table::<ReferralFeeRule>()?;
        store.create_table::<FbaFeeRule>()?;
        store.create_table::<SizeTierRule>()?;
        Ok(store)
    }

    fn create_table<T: StoredRule>(&self) -> Result<(), StoreError> {
        let columns = T::COLUMNS
            .iter()
            .map(|(name, ty)| format!("{name} {ty}"))
            .collect::<Vec<_>>()
            .join(",\n    ");
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
    id BIGINT NOT NULL DEFAULT nextval('rule_id_seq'),
    position BIGINT NOT NULL,
    {columns}
);",
            T::TABLE
        );
        self.conn.execute_batch(&sql)?;
        Ok(())
    }

    // ── Reads ──

    pub fn list<T: StoredRule>(&self, filter: &RuleFilter) -> Result<Vec<Stored<T>>, StoreError> {
        let mut sql = format!("SELECT id, position, {} FROM {}", T::column_list(), T::TABLE);
        let mut clauses = Vec::new();
        let mut values = Vec::new();
        if let Some(name) = &filter.name {
            clauses.push(format!("lower({}) = lower(?)", T::NAME_COLUMN));
            values.push(text(name));
        }
        if let Some(variant) = &filter.variant {
            clauses.push("variant = ?".to_string());
            values.push(text(variant));
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY position, id");
        self.query_rules(&sql, &values)
    }

    pub fn get<T: StoredRule>(&self, id: i64) -> Result<Stored<T>, StoreError> {
        let sql = format!(
            "SELECT id, position, {} FROM {} WHERE id = ?",
            T::column_list(),
            T::TABLE
        );
        self.query_rules(&sql, &[Value::BigInt(id)])?
            .into_iter()
            .next()
            .ok_or(StoreError::NotFound { table: T::TABLE, id })
    }

    pub fn count<T: StoredRule>(&self) -> Result<usize, StoreError> {
        let sql = format!("SELECT count(*)::BIGINT FROM {}", T::TABLE);
        let n: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// All three tables in stored order.
    pub fn rule_tables(&self) -> Result<RuleTables, StoreError> {
        let all = RuleFilter::default();
        Ok(RuleTables {
            referral_fee_rules: into_rules(self.list(&all)?),
            fba_fee_rules: into_rules(self.list(&all)?),
            size_tier_rules: into_rules(self.list(&all)?),
        })
    }

    /// Snapshot the store into a rule book.
    pub fn rule_book(&self, config: EngineConfig) -> Result<RuleBook, StoreError> {
        Ok(RuleBook::from_tables(self.rule_tables()?).with_config(config))
    }

    fn query_rules<T: StoredRule>(
        &self,
        sql: &str,
        values: &[Value],
    ) -> Result<Vec<Stored<T>>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(values.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(Stored {
                id: row.get(0)?,
                position: row.get(1)?,
                rule: T::from_row(row, 2)?,
            });
        }
        Ok(out)
    }

    fn find_key<T: StoredRule>(&self, rule: &T) -> Result<Option<i64>, StoreError> {
        let sql = format!(
            "SELECT id FROM {} WHERE {} ORDER BY position, id LIMIT 1",
            T::TABLE,
            T::key_clause()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(rule.key_values().iter()))?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    // ── Writes ──

    /// Validate and append a rule. Returns the new row id.
    pub fn create<T: StoredRule>(&self, rule: &T) -> Result<i64, StoreError> {
        rule.check()?;
        let position: i64 = self.conn.query_row(
            &format!("SELECT coalesce(max(position) + 1, 0)::BIGINT FROM {}", T::TABLE),
            [],
            |row| row.get(0),
        )?;
        let placeholders = vec!["?"; T::COLUMNS.len() + 1].join(", ");
        let sql = format!(
            "INSERT INTO {} (position, {}) VALUES ({placeholders}) RETURNING id",
            T::TABLE,
            T::column_list()
        );
        let mut values = vec![Value::BigInt(position)];
        values.extend(rule.values()?);
        let id: i64 = self
            .conn
            .query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
        debug!(table = T::TABLE, id, position, "created rule");
        Ok(id)
    }

    /// Validate and overwrite the rule stored under `id`. Position is kept.
    pub fn update<T: StoredRule>(&self, id: i64, rule: &T) -> Result<(), StoreError> {
        rule.check()?;
        let assignments = T::COLUMNS
            .iter()
            .map(|(name, _)| format!("{name} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE {} SET {assignments} WHERE id = ?", T::TABLE);
        let mut values = rule.values()?;
        values.push(Value::BigInt(id));
        let n = self.conn.execute(&sql, params_from_iter(values.iter()))?;
        if n == 0 {
            return Err(StoreError::NotFound { table: T::TABLE, id });
        }
        debug!(table = T::TABLE, id, "updated rule");
        Ok(())
    }

    pub fn delete<T: StoredRule>(&self, id: i64) -> Result<(), StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = ?", T::TABLE);
        let n = self.conn.execute(&sql, params![id])?;
        if n == 0 {
            return Err(StoreError::NotFound { table: T::TABLE, id });
        }
        debug!(table = T::TABLE, id, "deleted rule");
        Ok(())
    }

    /// Remove every row of one table. Returns the number removed.
    pub fn delete_all<T: StoredRule>(&self) -> Result<usize, StoreError> {
        let n = self.conn.execute(&format!("DELETE FROM {}", T::TABLE), [])?;
        info!(table = T::TABLE, removed = n, "cleared rule table");
        Ok(n)
    }

    /// Update the row sharing this rule's identity, or append a new one.
    ///
    /// Identity is (category, variant, priceMin, priceMax) for referral rules,
    /// (tier, variant, weightMin, weightMax) for fulfillment rules and the tier
    /// name for size-tier rules. Null key fields match null.
    pub fn upsert<T: StoredRule>(&self, rule: &T) -> Result<Upsert, StoreError> {
        match self.find_key(rule)? {
            Some(id) => {
                self.update(id, rule)?;
                Ok(Upsert::Updated(id))
            }
            None => Ok(Upsert::Created(self.create(rule)?)),
        }
    }

    pub fn set_position<T: StoredRule>(&self, id: i64, position: i64) -> Result<(), StoreError> {
        let sql = format!("UPDATE {} SET position = ? WHERE id = ?", T::TABLE);
        let n = self.conn.execute(&sql, params![position, id])?;
        if n == 0 {
            return Err(StoreError::NotFound { table: T::TABLE, id });
        }
        Ok(())
    }

    /// Renumber a table into dashboard order (tier ladder, then unit, then
    /// lower bound). Ties keep their current relative order.
    pub fn reorder<T: StoredRule>(&self) -> Result<(), StoreError> {
        let mut rows = self.list::<T>(&RuleFilter::default())?;
        rows.sort_by(|a, b| T::dashboard_order(&a.rule, &b.rule));
        self.in_transaction(|store| {
            for (position, row) in rows.iter().enumerate() {
                store.set_position::<T>(row.id, position as i64)?;
            }
            Ok(())
        })?;
        info!(table = T::TABLE, rows = rows.len(), "reordered rule table");
        Ok(())
    }

    /// Upsert every row of `tables` in one transaction. With `replace`, the
    /// existing tables are cleared first.
    ///
    /// The whole batch is validated before anything is written.
    pub fn import(&self, tables: &RuleTables, replace: bool) -> Result<ImportSummary, StoreError> {
        tables.validate()?;
        let summary = self.in_transaction(|store| {
            if replace {
                store.delete_all::<ReferralFeeRule>()?;
                store.delete_all::<FbaFeeRule>()?;
                store.delete_all::<SizeTierRule>()?;
            }
            let mut summary = ImportSummary::default();
            for rule in &tables.referral_fee_rules {
                summary.record(store.upsert(rule)?);
            }
            for rule in &tables.fba_fee_rules {
                summary.record(store.upsert(rule)?);
            }
            for rule in &tables.size_tier_rules {
                summary.record(store.upsert(rule)?);
            }
            Ok(summary)
        })?;
        info!(
            created = summary.created,
            updated = summary.updated,
            replace,
            "imported rule tables"
        );
        Ok(summary)
    }

    fn in_transaction<R>(
        &self,
        f: impl FnOnce(&Self) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        self.conn.execute_batch("BEGIN TRANSACTION")?;
        match f(self) {
            Ok(out) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(out)
            }
            Err(e) => {
                if let Err(rollback) = self.conn.execute_batch("ROLLBACK") {
                    warn!(error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedash_core::{Dimensions, OverageRule, Product, SizeTier, Weight};

    fn kitchen(min: f64, max: Option<f64>, pct: f64) -> ReferralFeeRule {
        ReferralFeeRule {
            min_fee_usd: 0.30,
            ..ReferralFeeRule::new("Kitchen", Some(min), max, pct)
        }
    }

    fn ladder() -> Vec<SizeTierRule> {
        vec![
            SizeTierRule {
                shipping_weight_max: Some(1.0),
                longest_max: Some(15.0),
                median_max: Some(12.0),
                shortest_max: Some(0.75),
                ..SizeTierRule::open("Small standard-size")
            },
            SizeTierRule {
                shipping_weight_max: Some(20.0),
                longest_max: Some(18.0),
                median_max: Some(14.0),
                shortest_max: Some(8.0),
                ..SizeTierRule::open("Large standard-size")
            },
            SizeTierRule::open("Large oversize"),
        ]
    }

    fn tables() -> RuleTables {
        RuleTables {
            referral_fee_rules: vec![kitchen(0.0, None, 0.15)],
            fba_fee_rules: vec![
                FbaFeeRule::flat("Large Standard", 0.0, Some(1.0), WeightUnit::Pound, 4.75),
                FbaFeeRule::flat("Large Standard", 1.0, Some(1.5), WeightUnit::Pound, 5.40),
                FbaFeeRule::flat("Small Standard", 0.0, Some(16.0), WeightUnit::Ounce, 3.22),
            ],
            size_tier_rules: ladder(),
        }
    }

    #[test]
    fn open_creates_empty_tables() {
        let store = DuckStore::open().unwrap();
        assert_eq!(store.count::<ReferralFeeRule>().unwrap(), 0);
        assert_eq!(store.count::<FbaFeeRule>().unwrap(), 0);
        assert_eq!(store.count::<SizeTierRule>().unwrap(), 0);
        assert!(store.rule_tables().unwrap().is_empty());
    }

    #[test]
    fn create_get_roundtrip() {
        let store = DuckStore::open().unwrap();
        let mut rule = FbaFeeRule::tiered(
            "Large Standard",
            3.0,
            Some(20.0),
            WeightUnit::Pound,
            6.92,
            vec![OverageRule {
                over_threshold_value: 3.0,
                over_threshold_unit: WeightUnit::Pound,
                step_value: 4.0,
                step_unit: WeightUnit::Ounce,
                step_fee_usd: 0.16,
            }],
        );
        rule.variant = "2025".into();
        let id = store.create(&rule).unwrap();
        let stored = store.get::<FbaFeeRule>(id).unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.position, 0);
        assert_eq!(stored.rule, rule);
    }

    #[test]
    fn unknown_apply_to_survives_storage() {
        let store = DuckStore::open().unwrap();
        let rule = ReferralFeeRule {
            apply_to: ApplyTo::Other("item".into()),
            min_fee_usd: 0.30,
            ..ReferralFeeRule::new("Kitchen", Some(0.0), None, 0.15)
        };
        let id = store.create(&rule).unwrap();
        assert_eq!(store.get::<ReferralFeeRule>(id).unwrap().rule.apply_to, ApplyTo::Other("item".into()));
    }

    #[test]
    fn create_rejects_invalid_rule() {
        let store = DuckStore::open().unwrap();
        let bad = ReferralFeeRule::new("Kitchen", Some(50.0), Some(10.0), 0.15);
        let result = store.create(&bad);
        assert!(matches!(result, Err(StoreError::Rule(_))));
        assert_eq!(store.count::<ReferralFeeRule>().unwrap(), 0);
    }

    #[test]
    fn rows_append_in_order() {
        let store = DuckStore::open().unwrap();
        let a = store.create(&kitchen(0.0, Some(10.0), 0.08)).unwrap();
        let b = store.create(&kitchen(10.0, None, 0.15)).unwrap();
        let listed = store.list::<ReferralFeeRule>(&RuleFilter::default()).unwrap();
        let ids: Vec<i64> = listed.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![a, b]);
        assert_eq!(listed[1].position, 1);
    }

    #[test]
    fn update_and_delete_missing_id() {
        let store = DuckStore::open().unwrap();
        let rule = SizeTierRule::open("Large oversize");
        assert!(matches!(
            store.update(999, &rule),
            Err(StoreError::NotFound { id: 999, .. })
        ));
        assert!(matches!(
            store.delete::<SizeTierRule>(999),
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.get::<SizeTierRule>(999),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn update_keeps_position() {
        let store = DuckStore::open().unwrap();
        store.create(&kitchen(0.0, Some(10.0), 0.08)).unwrap();
        let id = store.create(&kitchen(10.0, None, 0.15)).unwrap();
        store.update(id, &kitchen(10.0, None, 0.17)).unwrap();
        let stored = store.get::<ReferralFeeRule>(id).unwrap();
        assert_eq!(stored.position, 1);
        assert_eq!(stored.rule.fee_percent, 0.17);
    }

    #[test]
    fn upsert_matches_on_identity_with_nulls() {
        let store = DuckStore::open().unwrap();
        let first = store.upsert(&kitchen(0.0, None, 0.15)).unwrap();
        assert!(matches!(first, Upsert::Created(_)));

        // Same (category, variant, priceMin, null priceMax): updated in place.
        let again = store.upsert(&kitchen(0.0, None, 0.12)).unwrap();
        assert_eq!(again, Upsert::Updated(first.id()));
        assert_eq!(store.count::<ReferralFeeRule>().unwrap(), 1);

        // A different variant is a different rule.
        let mut seasonal = kitchen(0.0, None, 0.10);
        seasonal.variant = "holiday".into();
        assert!(matches!(store.upsert(&seasonal).unwrap(), Upsert::Created(_)));
        assert_eq!(store.count::<ReferralFeeRule>().unwrap(), 2);
    }

    #[test]
    fn size_tier_upsert_by_name() {
        let store = DuckStore::open().unwrap();
        store.upsert(&SizeTierRule::open("Small standard-size")).unwrap();
        let tighter = SizeTierRule {
            shipping_weight_max: Some(1.0),
            ..SizeTierRule::open("Small standard-size")
        };
        assert!(matches!(store.upsert(&tighter).unwrap(), Upsert::Updated(_)));
        let listed = store.list::<SizeTierRule>(&RuleFilter::default()).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].rule.shipping_weight_max, Some(1.0));
    }

    #[test]
    fn filter_by_name_and_variant() {
        let store = DuckStore::open().unwrap();
        store.import(&tables(), false).unwrap();
        let mut beauty = ReferralFeeRule::new("Beauty", Some(0.0), Some(10.0), 0.08);
        beauty.variant = "2025".into();
        store.create(&beauty).unwrap();

        let by_tier = store
            .list::<FbaFeeRule>(&RuleFilter {
                name: Some("large standard".into()),
                variant: None,
            })
            .unwrap();
        assert_eq!(by_tier.len(), 2);

        let by_variant = store
            .list::<ReferralFeeRule>(&RuleFilter {
                name: None,
                variant: Some("2025".into()),
            })
            .unwrap();
        assert_eq!(by_variant.len(), 1);
        assert_eq!(by_variant[0].rule.category, "Beauty");
    }

    #[test]
    fn import_twice_updates_instead_of_duplicating() {
        let store = DuckStore::open().unwrap();
        let first = store.import(&tables(), false).unwrap();
        assert_eq!(first, ImportSummary { created: 7, updated: 0 });
        let second = store.import(&tables(), false).unwrap();
        assert_eq!(second, ImportSummary { created: 0, updated: 7 });
        assert_eq!(store.rule_tables().unwrap(), tables());
    }

    #[test]
    fn import_with_replace_clears_first() {
        let store = DuckStore::open().unwrap();
        store.create(&ReferralFeeRule::new("Books", None, None, 0.15)).unwrap();
        store.import(&tables(), true).unwrap();
        let stored = store.rule_tables().unwrap();
        assert_eq!(stored.referral_fee_rules.len(), 1);
        assert_eq!(stored.referral_fee_rules[0].category, "Kitchen");
    }

    #[test]
    fn invalid_import_writes_nothing() {
        let store = DuckStore::open().unwrap();
        let mut bad = tables();
        bad.fba_fee_rules.push(FbaFeeRule {
            fee_usd: None,
            ..FbaFeeRule::flat("Small Standard", 16.0, Some(32.0), WeightUnit::Ounce, 0.0)
        });
        assert!(store.import(&bad, true).is_err());
        assert!(store.rule_tables().unwrap().is_empty());
    }

    #[test]
    fn reorder_follows_tier_ladder() {
        let store = DuckStore::open().unwrap();
        store.import(&tables(), false).unwrap();
        store.reorder::<FbaFeeRule>().unwrap();
        let tiers: Vec<(String, f64)> = store
            .list::<FbaFeeRule>(&RuleFilter::default())
            .unwrap()
            .into_iter()
            .map(|s| (s.rule.tier, s.rule.weight_min))
            .collect();
        assert_eq!(
            tiers,
            vec![
                ("Small Standard".to_string(), 0.0),
                ("Large Standard".to_string(), 0.0),
                ("Large Standard".to_string(), 1.0),
            ]
        );
    }

    #[test]
    fn rule_book_estimates_from_stored_rules() {
        let store = DuckStore::open().unwrap();
        store.import(&tables(), false).unwrap();
        let book = store.rule_book(EngineConfig::default()).unwrap();

        let tumbler = Product {
            name: Some("Tumbler".into()),
            price: Some(24.0),
            category: Some("Home & Kitchen".into()),
            weight: Some(Weight::new(0.75, "pounds")),
            dimensions: Some(Dimensions::new(10.0, 4.0, 4.0, "inches")),
            sold_by: Some("Amazon.com".into()),
            ..Product::default()
        };
        let estimate = book.estimate(&tumbler);
        assert_eq!(estimate.size_tier, Some(SizeTier::LargeStandard));
        assert_eq!(estimate.total_display().as_deref(), Some("$8.35"));
    }

    #[test]
    fn persistent_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.duckdb");
        {
            let store = DuckStore::open_persistent(&path).unwrap();
            store.import(&tables(), false).unwrap();
        }
        let store = DuckStore::open_persistent(&path).unwrap();
        assert_eq!(store.count::<FbaFeeRule>().unwrap(), 3);
        // The id sequence carries on past existing rows.
        let id = store.create(&SizeTierRule::open("Extra large")).unwrap();
        assert!(id > 7, "id {id} collides with imported rows");
    }
}
