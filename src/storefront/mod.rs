//! Static storefront: one page per client directory over the shared catalog.
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument, warn};

use crate::catalog::{read_catalog, read_client};
use crate::model::{CatalogRow, ClientConfig};

pub mod deck;
pub mod page;

pub use deck::ImageDeck;
pub use page::{render_error, render_index, render_store, with_base, DEFAULT_STYLE};

pub const CLIENT_FILE: &str = "client.json";

/// Rows a store shows. A non-empty allowlist wins outright; prefixes apply
/// only without one; with neither every row passes. Inactive rows never do.
pub fn filter_products<'a>(products: &'a [CatalogRow], client: &ClientConfig) -> Vec<&'a CatalogRow> {
    let allow: Vec<&str> = client
        .sku_allowlist
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    let prefixes: Vec<&str> = client
        .sku_prefixes
        .iter()
        .map(String::as_str)
        .filter(|s| !s.is_empty())
        .collect();

    products
        .iter()
        .filter(|p| {
            if !allow.is_empty() {
                allow.contains(&p.sku.as_str())
            } else if !prefixes.is_empty() {
                prefixes.iter().any(|pre| p.sku.starts_with(pre))
            } else {
                true
            }
        })
        .filter(|p| p.active)
        .collect()
}

/// Store slugs: subdirectories of `stores_dir` holding a `client.json`,
/// sorted. A missing directory yields no stores.
pub async fn list_stores(stores_dir: &Path) -> Result<Vec<String>> {
    let mut entries = match fs::read_dir(stores_dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to list {}", stores_dir.display()))
        }
    };

    let mut slugs = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        if fs::try_exists(entry.path().join(CLIENT_FILE)).await.unwrap_or(false) {
            slugs.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    slugs.sort();
    Ok(slugs)
}

/// Where the site reads from and writes to.
#[derive(Debug, Clone)]
pub struct SiteLayout {
    pub products: PathBuf,
    pub stores_dir: PathBuf,
    pub out_dir: PathBuf,
    pub base_path: String,
}

/// Render every store. The catalog is read once, alongside store discovery.
/// If it or a store's `client.json` fails to load, that store gets the error
/// page and the build carries on. Returns the pages written.
#[instrument(skip_all, fields(out = %layout.out_dir.display()))]
pub async fn build_site(layout: &SiteLayout) -> Result<Vec<PathBuf>> {
    write_style(&layout.out_dir).await?;

    let (catalog, slugs) = tokio::join!(
        read_catalog(&layout.products),
        list_stores(&layout.stores_dir)
    );
    let slugs = slugs?;
    if let Err(err) = &catalog {
        warn!(error = %format!("{err:#}"), "failed to load catalog");
    }

    let mut written = Vec::new();
    let mut index = Vec::new();
    for slug in slugs {
        let client_path = layout.stores_dir.join(&slug).join(CLIENT_FILE);
        let client = read_client(&client_path).await;
        let name = match &client {
            Ok(client) => page::display_name(client, &slug),
            Err(_) => page::display_name(&ClientConfig::default(), &slug),
        };
        let html = render_or_error(catalog.as_ref().ok().map(Vec::as_slice), client, &slug, layout);
        written.push(write_page(&layout.out_dir, &slug, html).await?);
        index.push((slug, name));
    }

    let index_path = layout.out_dir.join("index.html");
    fs::write(&index_path, render_index(&index))
        .await
        .with_context(|| format!("failed to write {}", index_path.display()))?;

    Ok(written)
}

/// Render a single store from one client config file (e.g. `data/client.json`)
/// to `<out>/<slug>/index.html`. The slug is the config's `slug`, else
/// [`DEFAULT_SINGLE_SLUG`].
#[instrument(skip_all, fields(client = %client_path.display()))]
pub async fn build_single(layout: &SiteLayout, client_path: &Path) -> Result<PathBuf> {
    write_style(&layout.out_dir).await?;

    let (catalog, client) = tokio::join!(read_catalog(&layout.products), read_client(client_path));
    let slug = client
        .as_ref()
        .ok()
        .and_then(|c| c.slug.as_deref())
        .map(crate::images::safe_slug)
        .unwrap_or_else(|| DEFAULT_SINGLE_SLUG.to_string());
    let catalog = match catalog {
        Ok(rows) => Some(rows),
        Err(err) => {
            warn!(error = %format!("{err:#}"), "failed to load catalog");
            None
        }
    };
    let html = render_or_error(catalog.as_deref(), client, &slug, layout);
    write_page(&layout.out_dir, &slug, html).await
}

/// Directory name used by [`build_single`] when the client config has no slug.
pub const DEFAULT_SINGLE_SLUG: &str = "store";

fn render_or_error(
    catalog: Option<&[CatalogRow]>,
    client: Result<ClientConfig>,
    slug: &str,
    layout: &SiteLayout,
) -> String {
    match (catalog, client) {
        (Some(products), Ok(client)) => {
            let shown = filter_products(products, &client)
                .into_iter()
                .cloned()
                .collect::<Vec<_>>();
            info!(store = %slug, products = shown.len(), "rendering store");
            render_store(&client, slug, &shown, &layout.base_path)
        }
        (_, Err(err)) => {
            warn!(store = %slug, error = %format!("{err:#}"), "failed to load store data");
            render_error(slug)
        }
        (None, Ok(_)) => render_error(slug),
    }
}

async fn write_style(out_dir: &Path) -> Result<()> {
    let static_dir = out_dir.join("static");
    fs::create_dir_all(&static_dir)
        .await
        .with_context(|| format!("failed to create {}", static_dir.display()))?;
    let css_path = static_dir.join("style.css");
    fs::write(&css_path, DEFAULT_STYLE)
        .await
        .with_context(|| format!("failed to write {}", css_path.display()))
}

async fn write_page(out_dir: &Path, slug: &str, html: String) -> Result<PathBuf> {
    let dir = out_dir.join(slug);
    fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join("index.html");
    fs::write(&path, html)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}
