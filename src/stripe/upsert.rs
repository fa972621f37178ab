//! Find-or-create of the Product → Price → Payment Link chain for one SKU.
//!
//! Stripe's own object graph is the idempotency ledger. The price lookup key
//! `price_{sku}_{currency}_{unit_amount}` is authoritative: a hit there
//! resolves both price and product without any search. Only on a miss do we
//! fall back to product search by `metadata.sku`, then to a scan of active
//! products. A changed amount yields a new key and therefore a new price;
//! existing prices are never mutated or deactivated.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::stripe::model::HasId;
use crate::stripe::{
    with_rate_limit_retry, List, NewPaymentLink, NewPrice, NewProduct, PaymentLink, Price,
    Product, RetryPolicy, StripeApi, StripeError,
};

/// What to do about payment links when a price already has one.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LinkPolicy {
    /// Reuse an active link whose only line item is the resolved price.
    #[default]
    ReuseByPrice,
    /// Create a fresh link on every run. Links accumulate.
    AlwaysCreate,
}

/// Input for one upsert.
#[derive(Debug, Clone, Copy)]
pub struct ProductSpec<'a> {
    pub name: &'a str,
    pub sku: &'a str,
    pub price: f64,
    pub currency: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsuredLink {
    pub product_id: String,
    pub price_id: String,
    pub link_id: String,
    pub url: String,
    pub created_product: bool,
    pub created_price: bool,
    pub created_link: bool,
}

#[derive(Debug, Error)]
#[error("stripe upsert failed for {sku}: {source}")]
pub struct UpsertError {
    pub sku: String,
    #[source]
    pub source: StripeError,
}

/// Minor units for a major-unit price (`750.00` → `75000`).
pub fn unit_amount(price: f64) -> i64 {
    (price * 100.0).round() as i64
}

pub fn price_lookup_key(sku: &str, currency: &str, unit_amount: i64) -> String {
    format!("price_{}_{}_{}", sku, currency, unit_amount)
}

/// Stripe search query for active products tagged with `sku`.
pub fn product_search_query(sku: &str) -> String {
    let escaped = sku.replace('\\', "\\\\").replace('\'', "\\'");
    format!("active:'true' AND metadata['sku']:'{}'", escaped)
}

pub struct Upserter<'a> {
    api: &'a dyn StripeApi,
    policy: LinkPolicy,
    retry: RetryPolicy,
    call_delay: Duration,
}

impl<'a> Upserter<'a> {
    pub fn new(
        api: &'a dyn StripeApi,
        policy: LinkPolicy,
        retry: RetryPolicy,
        call_delay: Duration,
    ) -> Self {
        Self {
            api,
            policy,
            retry,
            call_delay,
        }
    }

    /// Resolve (or create) the product, price and payment link for `spec`.
    #[instrument(skip_all, fields(sku = %spec.sku))]
    pub async fn ensure_link(&self, spec: &ProductSpec<'_>) -> Result<EnsuredLink, UpsertError> {
        self.ensure(spec).await.map_err(|source| UpsertError {
            sku: spec.sku.to_string(),
            source,
        })
    }

    async fn ensure(&self, spec: &ProductSpec<'_>) -> Result<EnsuredLink, StripeError> {
        let api = self.api;
        let amount = unit_amount(spec.price);
        let lookup_key = price_lookup_key(spec.sku, spec.currency, amount);

        let keyed = self
            .call(|| api.find_price_by_lookup_key(&lookup_key))
            .await?;

        let (product_id, price, created_product, created_price) = match keyed {
            Some(price) => {
                debug!(price = %price.id, "price found by lookup key");
                (price.product.id().to_string(), price, false, false)
            }
            None => {
                let (product, created_product) = match self.find_product(spec.sku).await? {
                    Some(product) => (product, false),
                    None => {
                        let params = NewProduct {
                            name: spec.name.to_string(),
                            sku: spec.sku.to_string(),
                        };
                        let product = self.call(|| api.create_product(&params)).await?;
                        info!(product = %product.id, "created stripe product");
                        (product, true)
                    }
                };

                let existing = if created_product {
                    None
                } else {
                    self.find_price_by_amount(&product.id, spec.currency, amount)
                        .await?
                };

                match existing {
                    Some(price) => (product.id, price, false, false),
                    None => {
                        let params = NewPrice {
                            product_id: product.id.clone(),
                            currency: spec.currency.to_string(),
                            unit_amount: amount,
                            lookup_key: lookup_key.clone(),
                        };
                        let price = self.call(|| api.create_price(&params)).await?;
                        info!(price = %price.id, unit_amount = amount, "created stripe price");
                        (product.id, price, created_product, true)
                    }
                }
            }
        };

        let existing_link = match self.policy {
            LinkPolicy::ReuseByPrice if !created_price => self.find_link(&price.id).await?,
            _ => None,
        };

        let (link, created_link) = match existing_link {
            Some(link) => (link, false),
            None => {
                let params = NewPaymentLink {
                    price_id: price.id.clone(),
                    quantity: 1,
                    sku: spec.sku.to_string(),
                };
                let link = self.call(|| api.create_payment_link(&params)).await?;
                info!(link = %link.id, "created stripe payment link");
                (link, true)
            }
        };

        Ok(EnsuredLink {
            product_id,
            price_id: price.id,
            link_id: link.id,
            url: link.url,
            created_product,
            created_price,
            created_link,
        })
    }

    async fn find_product(&self, sku: &str) -> Result<Option<Product>, StripeError> {
        let api = self.api;
        let query = product_search_query(sku);
        let tagged = |p: &Product| p.active && p.metadata.get("sku").map(String::as_str) == Some(sku);

        match self.call(|| api.search_products(&query)).await {
            Ok(found) => {
                if let Some(product) = found.data.into_iter().find(|p| tagged(p)) {
                    return Ok(Some(product));
                }
            }
            Err(err) => warn!(error = %err, "product search failed, scanning product list"),
        }

        self.scan(
            |after| async move { api.list_products(after.as_deref()).await },
            tagged,
        )
        .await
    }

    async fn find_price_by_amount(
        &self,
        product_id: &str,
        currency: &str,
        amount: i64,
    ) -> Result<Option<Price>, StripeError> {
        let api = self.api;
        self.scan(
            |after| async move { api.list_prices(product_id, after.as_deref()).await },
            |p: &Price| {
                p.active && p.currency.eq_ignore_ascii_case(currency) && p.unit_amount == Some(amount)
            },
        )
        .await
    }

    async fn find_link(&self, price_id: &str) -> Result<Option<PaymentLink>, StripeError> {
        let api = self.api;
        self.scan(
            |after| async move { api.list_payment_links(after.as_deref()).await },
            |l: &PaymentLink| {
                l.active
                    && (l.sole_price_id() == Some(price_id)
                        || l.metadata.get("price_id").map(String::as_str) == Some(price_id))
            },
        )
        .await
    }

    /// Walk a paginated list until `matches` hits or the list is exhausted.
    async fn scan<T, F, Fut, P>(&self, mut fetch: F, matches: P) -> Result<Option<T>, StripeError>
    where
        T: HasId,
        F: FnMut(Option<String>) -> Fut,
        Fut: Future<Output = Result<List<T>, StripeError>>,
        P: Fn(&T) -> bool,
    {
        let mut after: Option<String> = None;
        loop {
            let page = self.call(|| fetch(after.clone())).await?;
            let last = page.data.last().map(|item| item.id().to_string());
            if let Some(found) = page.data.into_iter().find(|item| matches(item)) {
                return Ok(Some(found));
            }
            match (page.has_more, last) {
                (true, Some(id)) => after = Some(id),
                _ => return Ok(None),
            }
        }
    }

    /// One API call: spacing delay, then rate-limit retry.
    async fn call<T, F, Fut>(&self, operation: F) -> Result<T, StripeError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StripeError>>,
    {
        if !self.call_delay.is_zero() {
            tokio::time::sleep(self.call_delay).await;
        }
        with_rate_limit_retry(&self.retry, operation).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_amount_rounds_to_cents() {
        assert_eq!(unit_amount(750.0), 75000);
        assert_eq!(unit_amount(19.99), 1999);
        assert_eq!(unit_amount(0.1 + 0.2), 30);
    }

    #[test]
    fn lookup_key_changes_with_amount() {
        assert_eq!(
            price_lookup_key("CYS-TENT-1", "usd", 75000),
            "price_CYS-TENT-1_usd_75000"
        );
        assert_ne!(
            price_lookup_key("A", "usd", 100),
            price_lookup_key("A", "usd", 101)
        );
    }

    #[test]
    fn search_query_escapes_quotes() {
        assert_eq!(
            product_search_query("O'NEIL-1"),
            "active:'true' AND metadata['sku']:'O\\'NEIL-1'"
        );
    }

    #[test]
    fn link_policy_yaml_names() {
        let p: LinkPolicy = serde_yaml::from_str("always_create").unwrap();
        assert_eq!(p, LinkPolicy::AlwaysCreate);
        assert_eq!(
            serde_yaml::to_string(&LinkPolicy::ReuseByPrice).unwrap().trim(),
            "reuse_by_price"
        );
    }
}
