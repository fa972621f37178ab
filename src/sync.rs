//! One catalog sync run: Notion rows in, Stripe links provisioned, catalog rows out.
use anyhow::Result;
use futures::TryStreamExt;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::{CatalogSchema, Config};
use crate::images::ImageCache;
use crate::model::{CatalogRow, ImageRef, StripeMode, VariantRef};
use crate::notion::{self, props, NotionService, Page};
use crate::stripe::{ProductSpec, Upserter};

/// Why a Notion row produced no catalog row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("missing name")]
    MissingName,
    #[error("missing sku")]
    MissingSku,
    #[error("missing price")]
    MissingPrice,
}

/// A Notion row decoded against the schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRow {
    pub page_id: String,
    pub name: String,
    pub sku: String,
    pub price: f64,
    pub active: bool,
    pub images: Vec<String>,
    /// `(column label, url)`.
    pub variants: Vec<(String, String)>,
    /// Payment link already stored on the row for the current mode.
    pub current_link: Option<String>,
}

/// Decode a page, or say which required field is missing.
pub fn decode_row(
    page: &Page,
    schema: &CatalogSchema,
    mode: StripeMode,
) -> Result<ProductRow, SkipReason> {
    let p = &page.properties;
    let name = props::text(p, &schema.name).ok_or(SkipReason::MissingName)?;
    let sku = props::text(p, &schema.sku).ok_or(SkipReason::MissingSku)?;
    let price = props::number(p, &schema.price).ok_or(SkipReason::MissingPrice)?;

    let images = schema
        .images
        .iter()
        .flat_map(|column| props::files(p, column))
        .collect();
    let variants = schema
        .variants
        .iter()
        .flat_map(|column| {
            props::files(p, column)
                .into_iter()
                .map(move |url| (column.clone(), url))
        })
        .collect();

    Ok(ProductRow {
        page_id: page.id.clone(),
        name,
        sku,
        price,
        active: props::checkbox(p, &schema.active),
        images,
        variants,
        current_link: props::text(p, schema.url_column(mode)),
    })
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub rows: Vec<CatalogRow>,
    /// `(page id, reason)` for rows that were skipped.
    pub skipped: Vec<(String, SkipReason)>,
    /// SKUs whose Stripe upsert failed.
    pub failed: Vec<String>,
}

/// Walk the active rows of the configured database and build the catalog.
///
/// Per-row failures are logged and recorded in the report; only a failure
/// to read the database itself aborts the run.
#[instrument(skip_all)]
pub async fn run(
    cfg: &Config,
    notion: &dyn NotionService,
    upserter: &Upserter<'_>,
    images: Option<&ImageCache>,
) -> Result<SyncReport> {
    let creds = &cfg.credentials;
    let database_id = creds.notion_db_id()?;
    let mode = creds.mode;
    let currency = creds.currency.as_str();
    let schema = &cfg.schema;

    info!(mode = mode.as_str(), currency, "starting catalog sync");

    let active_column = notion::resolve_column(notion, database_id, &schema.active).await?;
    debug!(column = %active_column, "filtering on active column");
    let pages = notion::query_all(
        notion,
        database_id,
        Some(notion::active_filter(&active_column)),
        cfg.notion.page_size,
    );
    futures::pin_mut!(pages);

    let mut report = SyncReport::default();
    while let Some(page) = pages.try_next().await? {
        let row = match decode_row(&page, schema, mode) {
            Ok(row) => row,
            Err(reason) => {
                warn!(page = %page.id, %reason, "SKIP (missing fields)");
                report.skipped.push((page.id.clone(), reason));
                continue;
            }
        };

        let spec = ProductSpec {
            name: &row.name,
            sku: &row.sku,
            price: row.price,
            currency,
        };
        let link = match upserter.ensure_link(&spec).await {
            Ok(ensured) => Some(ensured.url),
            Err(err) => {
                warn!(sku = %row.sku, error = %err, "Stripe error");
                report.failed.push(row.sku.clone());
                if !cfg.sync.keep_unlinked {
                    continue;
                }
                None
            }
        };

        if let Some(url) = link.as_deref() {
            if cfg.sync.write_back && row.current_link.as_deref() != Some(url) {
                write_back(notion, &page, schema, mode, url).await;
            }
        }

        report.rows.push(build_catalog_row(row, link, mode, currency, images).await);
    }

    info!(
        processed = report.rows.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "catalog sync finished"
    );
    Ok(report)
}

async fn write_back(
    notion: &dyn NotionService,
    page: &Page,
    schema: &CatalogSchema,
    mode: StripeMode,
    url: &str,
) {
    let aliases = schema.url_column(mode);
    let Some(column) = props::resolve_name(&page.properties, aliases)
        .or_else(|| aliases.first().map(String::as_str))
    else {
        return;
    };
    let update = notion::build_url_update(column, url);
    if let Err(err) = notion.update_page_properties(&page.id, update).await {
        warn!(page = %page.id, error = %err, "Notion update failed");
    }
}

async fn build_catalog_row(
    row: ProductRow,
    link: Option<String>,
    mode: StripeMode,
    currency: &str,
    images: Option<&ImageCache>,
) -> CatalogRow {
    let (image_urls, variants) = match images {
        Some(cache) => {
            let mut all = row.images.clone();
            all.extend(row.variants.iter().map(|(_, url)| url.clone()));
            let cached = cache.cache_for_sku(&row.sku, &all).await;
            let (img, var) = cached.split_at(row.images.len());
            let image_urls = img.iter().flatten().cloned().collect::<Vec<_>>();
            let variants = row
                .variants
                .iter()
                .zip(var)
                .filter_map(|((label, _), local)| local.clone().map(|u| (label.clone(), u)))
                .collect::<Vec<_>>();
            (image_urls, variants)
        }
        None => (row.images.clone(), row.variants.clone()),
    };

    CatalogRow {
        id: row.page_id,
        images: image_urls
            .into_iter()
            .map(|url| ImageRef {
                url,
                alt: Some(row.name.clone()),
            })
            .collect(),
        variants: variants
            .into_iter()
            .map(|(label, url)| VariantRef {
                label: Some(label),
                url,
            })
            .collect(),
        name: row.name,
        sku: row.sku,
        price: row.price,
        currency: currency.to_string(),
        link,
        mode,
        active: row.active,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(props: serde_json::Value) -> Page {
        Page {
            id: "page-1".into(),
            properties: props.as_object().unwrap().clone(),
        }
    }

    #[test]
    fn decodes_full_row() {
        let schema = CatalogSchema::default();
        let p = page(json!({
            "Product Name": { "type": "title", "title": [{ "plain_text": "Tent" }] },
            "Product SKU": { "type": "rich_text", "rich_text": [{ "plain_text": "CYS-TENT-1" }] },
            "Price": { "type": "number", "number": 750.0 },
            "Active": { "type": "checkbox", "checkbox": true },
            "Stripe Link (Test)": { "type": "url", "url": "https://buy.stripe.com/test_1" },
            "Image": { "type": "files", "files": [{ "type": "external", "external": { "url": "https://cdn/a.png" } }] },
            "Variant 2": { "type": "files", "files": [{ "type": "external", "external": { "url": "https://cdn/v2.png" } }] }
        }));
        let row = decode_row(&p, &schema, StripeMode::Test).unwrap();
        assert_eq!(row.sku, "CYS-TENT-1");
        assert_eq!(row.price, 750.0);
        assert!(row.active);
        assert_eq!(row.images, vec!["https://cdn/a.png".to_string()]);
        assert_eq!(
            row.variants,
            vec![("Variant 2".to_string(), "https://cdn/v2.png".to_string())]
        );
        assert_eq!(row.current_link.as_deref(), Some("https://buy.stripe.com/test_1"));

        let live = decode_row(&p, &schema, StripeMode::Live).unwrap();
        assert!(live.current_link.is_none());
    }

    #[test]
    fn missing_fields_are_named() {
        let schema = CatalogSchema::default();
        let no_sku = page(json!({
            "Product Name": { "type": "title", "title": [{ "plain_text": "Tent" }] },
            "Price": { "type": "number", "number": 750.0 }
        }));
        assert_eq!(
            decode_row(&no_sku, &schema, StripeMode::Live),
            Err(SkipReason::MissingSku)
        );

        let blank_name = page(json!({
            "Product Name": { "type": "title", "title": [{ "plain_text": "  " }] }
        }));
        assert_eq!(
            decode_row(&blank_name, &schema, StripeMode::Live),
            Err(SkipReason::MissingName)
        );

        let text_price = page(json!({
            "Product Name": { "type": "title", "title": [{ "plain_text": "Tent" }] },
            "Product SKU": { "type": "rich_text", "rich_text": [{ "plain_text": "T" }] },
            "Price": { "type": "rich_text", "rich_text": [{ "plain_text": "750" }] }
        }));
        assert_eq!(
            decode_row(&text_price, &schema, StripeMode::Live),
            Err(SkipReason::MissingPrice)
        );
        assert_eq!(SkipReason::MissingSku.to_string(), "missing sku");
    }
}
