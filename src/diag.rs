//! Per-SKU check that the catalog's prices still resolve in Stripe.
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::model::{CatalogRow, StripeMode};
use crate::stripe::{
    price_lookup_key, unit_amount, with_rate_limit_retry, RetryPolicy, StripeApi, StripeError,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkDiagnosis {
    pub sku: String,
    pub ok: bool,
    pub mode: StripeMode,
    pub lookup_key: String,
    pub price_id: Option<String>,
    pub product_id: Option<String>,
    pub amount: Option<i64>,
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Look up one row's price by the key the sync assigns to it.
pub async fn diagnose(
    api: &dyn StripeApi,
    retry: &RetryPolicy,
    mode: StripeMode,
    row: &CatalogRow,
) -> LinkDiagnosis {
    let lookup_key = price_lookup_key(&row.sku, &row.currency, unit_amount(row.price));
    let mut out = LinkDiagnosis {
        sku: row.sku.clone(),
        ok: false,
        mode,
        lookup_key,
        price_id: None,
        product_id: None,
        amount: None,
        currency: None,
        error: None,
    };

    let key = out.lookup_key.as_str();
    let found: Result<_, StripeError> =
        with_rate_limit_retry(retry, || api.find_price_by_lookup_key(key)).await;
    match found {
        Ok(Some(price)) => {
            out.ok = true;
            out.product_id = Some(price.product.id().to_string());
            out.amount = price.unit_amount;
            out.currency = Some(price.currency);
            out.price_id = Some(price.id);
        }
        Ok(None) => debug!(sku = %row.sku, "no price for lookup key"),
        Err(err) => out.error = Some(err.to_string()),
    }
    out
}

/// Diagnose every row with a SKU, in order, `spacing` apart.
#[instrument(skip_all, fields(rows = rows.len()))]
pub async fn diagnose_all(
    api: &dyn StripeApi,
    retry: &RetryPolicy,
    mode: StripeMode,
    rows: &[CatalogRow],
    spacing: Duration,
) -> Vec<LinkDiagnosis> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows.iter().filter(|r| !r.sku.trim().is_empty()) {
        out.push(diagnose(api, retry, mode, row).await);
        if !spacing.is_zero() {
            tokio::time::sleep(spacing).await;
        }
    }
    out
}
