//! Reading and writing the JSON artifacts: `products.json` and `client.json`.
use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

use crate::model::{CatalogRow, ClientConfig};

/// Overwrite `path` with the whole catalog. There is no append mode; every
/// sync run replaces the file.
pub async fn write_catalog(path: &Path, rows: &[CatalogRow]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let body = serde_json::to_string_pretty(rows).context("failed to serialize catalog")?;
    fs::write(path, body)
        .await
        .with_context(|| format!("failed to write {}", path.display()))
}

pub async fn read_catalog(path: &Path) -> Result<Vec<CatalogRow>> {
    read_json(path).await
}

pub async fn read_client(path: &Path) -> Result<ClientConfig> {
    read_json(path).await
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", path.display()))
}
