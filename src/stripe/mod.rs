//! Stripe REST client and the idempotent product/price/payment-link upsert.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt;
use thiserror::Error;
use tracing::debug;

pub mod model;
pub mod retry;
pub mod upsert;

pub use model::{List, NewPaymentLink, NewPrice, NewProduct, PaymentLink, Price, Product};
pub use retry::{with_rate_limit_retry, RetryPolicy};
pub use upsert::{price_lookup_key, unit_amount, EnsuredLink, LinkPolicy, ProductSpec, Upserter, UpsertError};

const STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Largest page Stripe list endpoints return.
const LIST_LIMIT: &str = "100";

#[derive(Debug, Error)]
pub enum StripeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("rate limited by Stripe: {0}")]
    RateLimited(String),
    #[error("stripe error {status}: {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },
    #[error("invalid Stripe response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl StripeError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, StripeError::RateLimited(_))
    }
}

/// The Stripe calls the upserter and diagnostics make.
#[async_trait]
pub trait StripeApi: Send + Sync {
    /// Active price carrying `lookup_key`, with its product expanded.
    async fn find_price_by_lookup_key(&self, lookup_key: &str) -> Result<Option<Price>, StripeError>;

    async fn search_products(&self, query: &str) -> Result<List<Product>, StripeError>;

    /// One page of active products.
    async fn list_products(&self, starting_after: Option<&str>) -> Result<List<Product>, StripeError>;

    async fn create_product(&self, params: &NewProduct) -> Result<Product, StripeError>;

    /// One page of a product's active prices.
    async fn list_prices(
        &self,
        product_id: &str,
        starting_after: Option<&str>,
    ) -> Result<List<Price>, StripeError>;

    async fn create_price(&self, params: &NewPrice) -> Result<Price, StripeError>;

    /// One page of active payment links, line items expanded.
    async fn list_payment_links(
        &self,
        starting_after: Option<&str>,
    ) -> Result<List<PaymentLink>, StripeError>;

    async fn create_payment_link(&self, params: &NewPaymentLink) -> Result<PaymentLink, StripeError>;
}

#[derive(Clone)]
pub struct StripeClient {
    http: Client,
    base_url: String,
    api_key: String,
    api_version: String,
}

impl fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripeClient")
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

impl StripeClient {
    pub fn new(api_key: String, api_version: String) -> Result<Self, StripeError> {
        Self::with_base_url(api_key, api_version, STRIPE_API_BASE)
    }

    pub fn with_base_url(
        api_key: String,
        api_version: String,
        base_url: &str,
    ) -> Result<Self, StripeError> {
        let http = Client::builder()
            .user_agent(concat!("storefront-kit/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            api_version,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, StripeError> {
        self.send(self.http.get(self.url(path)).query(query)).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> Result<T, StripeError> {
        self.send(self.http.post(self.url(path)).form(form)).await
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, StripeError> {
        let request = builder
            .bearer_auth(&self.api_key)
            .header("Stripe-Version", &self.api_version)
            .build()?;
        debug!(method=%request.method(), url=%request.url(), "sending stripe request");

        let res = self.http.execute(request).await?;
        let status = res.status();
        let body = res.text().await?;

        if status.is_success() {
            return Ok(serde_json::from_str(&body)?);
        }

        let (code, message) = match serde_json::from_str::<model::ErrorEnvelope>(&body) {
            Ok(env) => (
                env.error.code,
                env.error.message.unwrap_or_else(|| body.clone()),
            ),
            Err(_) => (None, body),
        };
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(StripeError::RateLimited(message));
        }
        Err(StripeError::Api {
            status: status.as_u16(),
            code,
            message,
        })
    }
}

fn with_cursor<'a>(
    mut query: Vec<(&'a str, &'a str)>,
    starting_after: Option<&'a str>,
) -> Vec<(&'a str, &'a str)> {
    if let Some(after) = starting_after {
        query.push(("starting_after", after));
    }
    query
}

#[async_trait]
impl StripeApi for StripeClient {
    async fn find_price_by_lookup_key(&self, lookup_key: &str) -> Result<Option<Price>, StripeError> {
        let list: List<Price> = self
            .get(
                "v1/prices",
                &[
                    ("lookup_keys[]", lookup_key),
                    ("active", "true"),
                    ("limit", "1"),
                    ("expand[]", "data.product"),
                ],
            )
            .await?;
        Ok(list.data.into_iter().next())
    }

    async fn search_products(&self, query: &str) -> Result<List<Product>, StripeError> {
        self.get("v1/products/search", &[("query", query), ("limit", LIST_LIMIT)])
            .await
    }

    async fn list_products(&self, starting_after: Option<&str>) -> Result<List<Product>, StripeError> {
        let query = with_cursor(vec![("active", "true"), ("limit", LIST_LIMIT)], starting_after);
        self.get("v1/products", &query).await
    }

    async fn create_product(&self, params: &NewProduct) -> Result<Product, StripeError> {
        self.post("v1/products", &params.form()).await
    }

    async fn list_prices(
        &self,
        product_id: &str,
        starting_after: Option<&str>,
    ) -> Result<List<Price>, StripeError> {
        let query = with_cursor(
            vec![
                ("product", product_id),
                ("active", "true"),
                ("limit", LIST_LIMIT),
            ],
            starting_after,
        );
        self.get("v1/prices", &query).await
    }

    async fn create_price(&self, params: &NewPrice) -> Result<Price, StripeError> {
        self.post("v1/prices", &params.form()).await
    }

    async fn list_payment_links(
        &self,
        starting_after: Option<&str>,
    ) -> Result<List<PaymentLink>, StripeError> {
        let query = with_cursor(
            vec![
                ("active", "true"),
                ("limit", LIST_LIMIT),
                ("expand[]", "data.line_items"),
            ],
            starting_after,
        );
        self.get("v1/payment_links", &query).await
    }

    async fn create_payment_link(&self, params: &NewPaymentLink) -> Result<PaymentLink, StripeError> {
        self.post("v1/payment_links", &params.form()).await
    }
}
