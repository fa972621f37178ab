use serde::Deserialize;
use std::collections::HashMap;

/// A page of a Stripe list or search endpoint.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct List<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

impl<T> List<T> {
    pub fn of(data: Vec<T>) -> Self {
        Self {
            data,
            has_more: false,
        }
    }
}

/// A field Stripe returns either as an id or, when expanded, as the object.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Expandable<T> {
    Id(String),
    Object(Box<T>),
}

impl<T: HasId> Expandable<T> {
    pub fn id(&self) -> &str {
        match self {
            Expandable::Id(id) => id,
            Expandable::Object(obj) => obj.id(),
        }
    }
}

/// Objects paginated with `starting_after`.
pub trait HasId {
    fn id(&self) -> &str;
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Price {
    pub id: String,
    pub product: Expandable<Product>,
    #[serde(default)]
    pub active: bool,
    pub currency: String,
    #[serde(default)]
    pub unit_amount: Option<i64>,
    #[serde(default)]
    pub lookup_key: Option<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct PaymentLink {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub line_items: Option<List<LineItem>>,
}

impl PaymentLink {
    /// Price id of the only line item, when line items were expanded and
    /// there is exactly one.
    pub fn sole_price_id(&self) -> Option<&str> {
        let items = &self.line_items.as_ref()?.data;
        match items.as_slice() {
            [only] => only.price.as_ref().map(|p| p.id.as_str()),
            _ => None,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct LineItem {
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default)]
    pub quantity: Option<u64>,
}

impl HasId for Product {
    fn id(&self) -> &str {
        &self.id
    }
}

impl HasId for Price {
    fn id(&self) -> &str {
        &self.id
    }
}

impl HasId for PaymentLink {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Deserialize, Debug)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

/// Form pairs for `POST /v1/products`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub sku: String,
}

impl NewProduct {
    /// Stripe rejects long product names; keep the first 80 characters.
    pub const MAX_NAME_CHARS: usize = 80;

    pub fn form(&self) -> Vec<(String, String)> {
        vec![
            (
                "name".into(),
                self.name.chars().take(Self::MAX_NAME_CHARS).collect(),
            ),
            ("active".into(), "true".into()),
            ("metadata[sku]".into(), self.sku.clone()),
            ("metadata[lookup_key]".into(), format!("prod_{}", self.sku)),
        ]
    }
}

/// Form pairs for `POST /v1/prices`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPrice {
    pub product_id: String,
    pub currency: String,
    pub unit_amount: i64,
    pub lookup_key: String,
}

impl NewPrice {
    pub fn form(&self) -> Vec<(String, String)> {
        vec![
            ("product".into(), self.product_id.clone()),
            ("currency".into(), self.currency.clone()),
            ("unit_amount".into(), self.unit_amount.to_string()),
            ("lookup_key".into(), self.lookup_key.clone()),
            // Moves the key off an archived price instead of failing on it.
            ("transfer_lookup_key".into(), "true".into()),
        ]
    }
}

/// Form pairs for `POST /v1/payment_links`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPaymentLink {
    pub price_id: String,
    pub quantity: u64,
    pub sku: String,
}

impl NewPaymentLink {
    pub fn form(&self) -> Vec<(String, String)> {
        vec![
            ("line_items[0][price]".into(), self.price_id.clone()),
            ("line_items[0][quantity]".into(), self.quantity.to_string()),
            ("metadata[sku]".into(), self.sku.clone()),
            ("metadata[price_id]".into(), self.price_id.clone()),
        ]
    }
}
