//! Configuration loader and validator for the catalog sync and storefront tools.
//!
//! Non-secret settings (API versions, sync behavior, the Notion column schema)
//! come from an optional YAML file. Secrets and the Stripe mode come from the
//! environment, with a `.env` file honored when present.
use serde::{Deserialize, Serialize};
use std::env::VarError;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::StripeMode;
use crate::stripe::LinkPolicy;

/// Config file picked up when no `--config` is given and it exists.
pub const DEFAULT_PATH: &str = "storefront.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Missing environment variable {0}")]
    MissingEnv(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Root configuration: the YAML schema plus credentials read from the environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub notion: NotionSettings,
    #[serde(default)]
    pub stripe: StripeSettings,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub schema: CatalogSchema,
    #[serde(skip)]
    pub credentials: Credentials,
}

/// Notion API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NotionSettings {
    pub version: String,
    pub page_size: u32,
}

impl Default for NotionSettings {
    fn default() -> Self {
        Self {
            version: "2022-06-28".into(),
            page_size: 100,
        }
    }
}

/// Stripe API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StripeSettings {
    pub api_version: String,
}

impl Default for StripeSettings {
    fn default() -> Self {
        Self {
            api_version: "2024-06-20".into(),
        }
    }
}

/// How a sync run behaves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncSettings {
    /// Catalog file written at the end of a run.
    pub output: PathBuf,
    /// Root for locally cached product images.
    pub assets_dir: PathBuf,
    pub cache_images: bool,
    /// Write the resolved payment-link URL back to the Notion row.
    pub write_back: bool,
    /// Keep rows whose Stripe upsert failed, with a null link.
    pub keep_unlinked: bool,
    pub link_policy: LinkPolicy,
    pub call_delay_ms: u64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            output: PathBuf::from("data/products.json"),
            assets_dir: PathBuf::from("assets/products"),
            cache_images: true,
            write_back: true,
            keep_unlinked: false,
            link_policy: LinkPolicy::ReuseByPrice,
            call_delay_ms: 120,
            max_retries: 3,
            backoff_base_ms: 600,
        }
    }
}

/// Notion column names per catalog field. Each field lists aliases; the first
/// one present on a page wins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CatalogSchema {
    pub name: Vec<String>,
    pub active: Vec<String>,
    pub price: Vec<String>,
    pub sku: Vec<String>,
    pub url_live: Vec<String>,
    pub url_test: Vec<String>,
    pub images: Vec<String>,
    pub variants: Vec<String>,
}

impl Default for CatalogSchema {
    fn default() -> Self {
        let v = |names: &[&str]| names.iter().map(|n| n.to_string()).collect::<Vec<_>>();
        Self {
            name: v(&["Product Name", "Name"]),
            active: v(&["Active"]),
            price: v(&["Price"]),
            sku: v(&["Product SKU", "SKU"]),
            url_live: v(&["PaymentURL"]),
            url_test: v(&["Stripe Link (Test)"]),
            images: v(&["Image"]),
            variants: v(&["Variant 1", "Variant 2"]),
        }
    }
}

impl CatalogSchema {
    /// Column holding the payment link for `mode`.
    pub fn url_column(&self, mode: StripeMode) -> &[String] {
        match mode {
            StripeMode::Live => &self.url_live,
            StripeMode::Test => &self.url_test,
        }
    }
}

/// Secrets and run mode taken from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub notion_token: Option<String>,
    pub notion_db_id: Option<String>,
    pub stripe_key_live: Option<String>,
    pub stripe_key_test: Option<String>,
    pub mode: StripeMode,
    pub currency: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            notion_token: None,
            notion_db_id: None,
            stripe_key_live: None,
            stripe_key_test: None,
            mode: StripeMode::Live,
            currency: "usd".into(),
        }
    }
}

impl Credentials {
    /// Read credentials through `lookup`, so tests can pass a map instead of
    /// touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let get = |var: &str| {
            lookup(var)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mode = match get("STRIPE_MODE") {
            Some(raw) => StripeMode::parse(&raw).ok_or_else(|| {
                ConfigError::Invalid(format!("STRIPE_MODE must be live or test, got {raw:?}"))
            })?,
            None => StripeMode::Live,
        };

        Ok(Self {
            notion_token: get("NOTION_TOKEN"),
            notion_db_id: get("NOTION_DB_ID"),
            stripe_key_live: get("STRIPE_API_KEY_LIVE"),
            stripe_key_test: get("STRIPE_API_KEY_TEST"),
            mode,
            currency: get("CURRENCY")
                .unwrap_or_else(|| "usd".into())
                .to_ascii_lowercase(),
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key))
    }

    pub fn notion_token(&self) -> Result<&str, ConfigError> {
        self.notion_token
            .as_deref()
            .ok_or(ConfigError::MissingEnv("NOTION_TOKEN"))
    }

    pub fn notion_db_id(&self) -> Result<&str, ConfigError> {
        self.notion_db_id
            .as_deref()
            .ok_or(ConfigError::MissingEnv("NOTION_DB_ID"))
    }

    /// Secret key for the configured mode.
    pub fn stripe_key(&self) -> Result<&str, ConfigError> {
        match self.mode {
            StripeMode::Live => self
                .stripe_key_live
                .as_deref()
                .ok_or(ConfigError::MissingEnv("STRIPE_API_KEY_LIVE")),
            StripeMode::Test => self
                .stripe_key_test
                .as_deref()
                .ok_or(ConfigError::MissingEnv("STRIPE_API_KEY_TEST")),
        }
    }
}

impl Config {
    /// Fail before any network call unless everything a sync run needs is set.
    pub fn require_sync(&self) -> Result<(), ConfigError> {
        self.credentials.notion_token()?;
        self.credentials.notion_db_id()?;
        self.credentials.stripe_key()?;
        Ok(())
    }
}

/// Load configuration from the YAML file (if any) and the environment, then validate.
/// - If `path` is None, uses `storefront.yaml` when it exists, defaults otherwise.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    let credentials = Credentials::from_env()?;
    load_with(path, credentials)
}

/// Like [`load`], with credentials supplied by the caller.
pub fn load_with(path: Option<&Path>, credentials: Credentials) -> Result<Config, ConfigError> {
    let default_path = Path::new(DEFAULT_PATH);
    let path = match path {
        Some(p) => Some(p),
        None if default_path.exists() => Some(default_path),
        None => None,
    };

    let mut cfg: Config = match path {
        Some(p) => serde_yaml::from_str(&fs::read_to_string(p)?)?,
        None => Config::default(),
    };
    cfg.credentials = credentials;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

    if cfg.notion.version.trim().is_empty() {
        return invalid("notion.version must be non-empty");
    }
    if !(1..=100).contains(&cfg.notion.page_size) {
        return invalid("notion.page_size must be between 1 and 100");
    }
    if cfg.stripe.api_version.trim().is_empty() {
        return invalid("stripe.api_version must be non-empty");
    }
    if cfg.sync.output.as_os_str().is_empty() {
        return invalid("sync.output must be non-empty");
    }
    if cfg.sync.cache_images && cfg.sync.assets_dir.as_os_str().is_empty() {
        return invalid("sync.assets_dir must be non-empty when cache_images is on");
    }
    if cfg.sync.max_retries > 10 {
        return invalid("sync.max_retries must be at most 10");
    }

    let schema = &cfg.schema;
    for (field, aliases) in [
        ("name", &schema.name),
        ("active", &schema.active),
        ("price", &schema.price),
        ("sku", &schema.sku),
        ("url_live", &schema.url_live),
        ("url_test", &schema.url_test),
    ] {
        if aliases.iter().all(|a| a.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "schema.{field} needs at least one column name"
            )));
        }
    }

    let currency = &cfg.credentials.currency;
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_lowercase()) {
        return Err(ConfigError::Invalid(format!(
            "CURRENCY must be a three-letter ISO code, got {currency:?}"
        )));
    }

    Ok(())
}

/// Example config file with every setting at its default.
pub fn example() -> &'static str {
    r#"notion:
  version: "2022-06-28"
  page_size: 100

stripe:
  api_version: "2024-06-20"

sync:
  output: "data/products.json"
  assets_dir: "assets/products"
  cache_images: true
  write_back: true
  keep_unlinked: false
  # reuse_by_price | always_create
  link_policy: reuse_by_price
  call_delay_ms: 120
  max_retries: 3
  backoff_base_ms: 600

schema:
  name: ["Product Name", "Name"]
  active: ["Active"]
  price: ["Price"]
  sku: ["Product SKU", "SKU"]
  url_live: ["PaymentURL"]
  url_test: ["Stripe Link (Test)"]
  images: ["Image"]
  variants: ["Variant 1", "Variant 2"]
"#
}
