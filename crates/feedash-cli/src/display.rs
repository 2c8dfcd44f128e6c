//! Terminal output: a vertical fee card for one product and compact rule
//! listings.

use arrow::array::{Array, Float64Array, StringArray};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use feedash_core::{FbaFeeRule, ReferralFeeRule, SizeTierRule, format_usd};
use feedash_store::Stored;

// ── Fee summary groupings ──

const PRODUCT: &[&str] = &["asin", "name", "category", "price", "channel"];

const SIZE: &[&str] = &["size_tier", "shipping_weight_lb"];

const FEES: &[&str] = &["referral_fee", "fulfillment_fee", "total_fee", "total_display"];

const MONEY: &[&str] = &["price", "referral_fee", "fulfillment_fee", "total_fee"];

// ── Fee card ──

/// Print one row of a fee summary batch as a vertical card.
pub fn print_fee_card(batch: &RecordBatch, row: usize) -> anyhow::Result<()> {
    anyhow::ensure!(row < batch.num_rows(), "row {row} out of range");

    let name = get_utf8(batch, "name", row).unwrap_or_default();
    let asin = get_utf8(batch, "asin", row).unwrap_or_default();
    println!("=== {} ===", if name.is_empty() { &asin } else { &name });
    println!();

    print_section(batch, row, "Product", PRODUCT);
    print_section(batch, row, "Size", SIZE);
    print_section(batch, row, "Fees", FEES);
    Ok(())
}

fn print_section(batch: &RecordBatch, row: usize, header: &str, cols: &[&str]) {
    let schema = batch.schema();
    let present: Vec<(usize, &str)> = cols
        .iter()
        .filter_map(|&col| schema.index_of(col).ok().map(|i| (i, col)))
        .filter(|&(i, _)| !batch.column(i).is_null(row))
        .collect();
    if present.is_empty() {
        return;
    }

    println!("{header}");
    for (idx, col_name) in present {
        let col = batch.column(idx);
        match schema.field(idx).data_type() {
            DataType::Utf8 => {
                if let Some(arr) = col.as_any().downcast_ref::<StringArray>() {
                    println!("  {:<20} {}", col_name, arr.value(row));
                }
            }
            DataType::Float64 => {
                if let Some(arr) = col.as_any().downcast_ref::<Float64Array>() {
                    let v = arr.value(row);
                    if MONEY.contains(&col_name) {
                        println!("  {:<20} {}", col_name, format_usd(v));
                    } else {
                        println!("  {:<20} {:.3}", col_name, v);
                    }
                }
            }
            other => println!("  {:<20} ({other})", col_name),
        }
    }
    println!();
}

fn get_utf8(batch: &RecordBatch, col_name: &str, row: usize) -> Option<String> {
    let idx = batch.schema().index_of(col_name).ok()?;
    let col = batch.column(idx);
    if col.is_null(row) {
        return None;
    }
    col.as_any()
        .downcast_ref::<StringArray>()
        .map(|arr| arr.value(row).to_string())
}

// ── Rule listings ──

fn bound(v: Option<f64>) -> String {
    v.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn variant(v: &str) -> &str {
    if v.is_empty() { "-" } else { v }
}

pub fn print_referral_rules(rules: &[Stored<ReferralFeeRule>]) {
    println!(
        "{:>6}  {:<28} {:>9} {:>9} {:<8} {:>8} {:>8}  variant",
        "id", "category", "min", "max", "apply", "pct", "min fee"
    );
    for s in rules {
        let r = &s.rule;
        println!(
            "{:>6}  {:<28} {:>9} {:>9} {:<8} {:>8} {:>8}  {}",
            s.id,
            r.category,
            bound(r.price_min),
            bound(r.price_max),
            r.apply_to.as_str(),
            r.fee_percent,
            format_usd(r.min_fee_usd),
            variant(&r.variant)
        );
    }
}

pub fn print_fulfillment_rules(rules: &[Stored<FbaFeeRule>]) {
    println!(
        "{:>6}  {:<20} {:>8} {:>8} {:<4} {:>9}  variant",
        "id", "tier", "min", "max", "unit", "fee"
    );
    for s in rules {
        let r = &s.rule;
        let fee = match (r.fee_usd, r.base_usd) {
            (Some(fee), _) => format_usd(fee),
            (None, Some(base)) if r.overage_rules.is_empty() => format_usd(base),
            (None, Some(base)) => format!("{}+", format_usd(base)),
            (None, None) => "-".to_string(),
        };
        println!(
            "{:>6}  {:<20} {:>8} {:>8} {:<4} {:>9}  {}",
            s.id,
            r.tier,
            r.weight_min,
            bound(r.weight_max),
            r.unit,
            fee,
            variant(&r.variant)
        );
    }
}

pub fn print_size_tier_rules(rules: &[Stored<SizeTierRule>]) {
    println!(
        "{:>6}  {:<24} {:>8} {:>8} {:>8} {:>8} {:>8}  units",
        "id", "tier", "weight", "longest", "median", "short", "l+girth"
    );
    for s in rules {
        let r = &s.rule;
        println!(
            "{:>6}  {:<24} {:>8} {:>8} {:>8} {:>8} {:>8}  {}/{}",
            s.id,
            r.tier,
            bound(r.shipping_weight_max),
            bound(r.longest_max),
            bound(r.median_max),
            bound(r.shortest_max),
            bound(r.length_girth_max),
            r.unit_length,
            r.unit_weight
        );
    }
}
