/// Arrow schema for per-product fee estimates.
pub mod fees {
    use std::sync::Arc;

    use arrow::array::{ArrayRef, Float64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;

    use crate::CoreError;
    use crate::catalog::CatalogEntry;

    /// Schema for fee estimate rows.
    pub fn fee_summary_schema() -> Schema {
        Schema::new(vec![
            Field::new("asin", DataType::Utf8, true),
            Field::new("name", DataType::Utf8, true),
            Field::new("category", DataType::Utf8, true),
            Field::new("price", DataType::Float64, true),
            Field::new("channel", DataType::Utf8, false),
            Field::new("size_tier", DataType::Utf8, true),
            Field::new("shipping_weight_lb", DataType::Float64, true),
            Field::new("referral_fee", DataType::Float64, true),
            Field::new("fulfillment_fee", DataType::Float64, true),
            Field::new("total_fee", DataType::Float64, true),
            Field::new("total_display", DataType::Utf8, true),
        ])
    }

    fn utf8_column<'a, F>(entries: &[CatalogEntry<'a>], f: F) -> ArrayRef
    where
        F: Fn(&CatalogEntry<'a>) -> Option<String>,
    {
        Arc::new(entries.iter().map(f).collect::<StringArray>())
    }

    fn f64_column<'a, F>(entries: &[CatalogEntry<'a>], f: F) -> ArrayRef
    where
        F: Fn(&CatalogEntry<'a>) -> Option<f64>,
    {
        Arc::new(entries.iter().map(f).collect::<Float64Array>())
    }

    /// Build one RecordBatch from catalog entries, in entry order.
    pub fn estimates_to_batch(entries: &[CatalogEntry<'_>]) -> Result<RecordBatch, CoreError> {
        let columns: Vec<ArrayRef> = vec![
            utf8_column(entries, |e| e.product.asin.clone()),
            utf8_column(entries, |e| e.product.name.clone()),
            utf8_column(entries, |e| e.product.category.clone()),
            f64_column(entries, |e| e.product.price),
            utf8_column(entries, |e| Some(e.estimate.channel.as_str().to_string())),
            utf8_column(entries, |e| e.estimate.size_tier.map(|t| t.as_str().to_string())),
            f64_column(entries, |e| e.estimate.shipping_weight_lb),
            f64_column(entries, |e| e.estimate.referral_fee),
            f64_column(entries, |e| e.estimate.fulfillment_fee),
            f64_column(entries, |e| e.estimate.total),
            utf8_column(entries, |e| e.estimate.total_display()),
        ];
        Ok(RecordBatch::try_new(Arc::new(fee_summary_schema()), columns)?)
    }
}
