//! Local copies of product images.
//!
//! Notion-hosted file URLs expire after about an hour, so a catalog that
//! points at them goes stale. The cache downloads each image once per run to
//! `<root>/<slug>/NN.<ext>` and hands back the relative path.

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

static NON_SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.-]+").expect("valid regex"));
static DASHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").expect("valid regex"));
static IMAGE_EXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(png|jpg|jpeg|webp)(\?|$)").expect("valid regex"));

/// Fallback directory for SKUs with no usable characters.
const FALLBACK_SLUG: &str = "sku";

/// Filesystem-safe directory name for a SKU, at most 80 characters. Never
/// empty and never a relative path component such as `..`.
pub fn safe_slug(raw: &str) -> String {
    let replaced = NON_SLUG.replace_all(raw, "-");
    let collapsed = DASHES.replace_all(&replaced, "-");
    let slug: String = collapsed
        .trim_matches(|c| c == '-' || c == '.')
        .chars()
        .take(80)
        .collect();
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// File extension (with dot) from the response content type, else the URL,
/// else `.jpg`.
pub fn ext_from(content_type: Option<&str>, url: &str) -> String {
    if let Some(ct) = content_type {
        if ct.contains("png") {
            return ".png".into();
        }
        if ct.contains("jpeg") || ct.contains("jpg") {
            return ".jpg".into();
        }
        if ct.contains("webp") {
            return ".webp".into();
        }
    }
    IMAGE_EXT
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| format!(".{}", m.as_str().to_ascii_lowercase()))
        .unwrap_or_else(|| ".jpg".into())
}

#[derive(Debug, Clone)]
pub struct ImageCache {
    http: Client,
    root: PathBuf,
    spacing: Duration,
}

impl ImageCache {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("storefront-kit/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            root: root.into(),
            spacing: Duration::from_millis(80),
        })
    }

    pub fn with_spacing(mut self, spacing: Duration) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Download `urls` for `sku`. The result is aligned with `urls`: the
    /// relative path for each stored image, `None` where the download failed.
    /// Files are numbered `01`, `02`, ... in order of successful downloads.
    pub async fn cache_for_sku(&self, sku: &str, urls: &[String]) -> Vec<Option<String>> {
        let slug = safe_slug(sku);
        let dir = self.root.join(&slug);
        if let Err(err) = tokio::fs::create_dir_all(&dir).await {
            warn!(sku, dir = %dir.display(), error = %err, "image cache directory unavailable");
            return vec![None; urls.len()];
        }

        let prefix = self.root.to_string_lossy().replace('\\', "/");
        let mut out = Vec::with_capacity(urls.len());
        let mut index = 1;
        for url in urls {
            match self.fetch(url).await {
                Ok((bytes, content_type)) => {
                    let name = format!("{:02}{}", index, ext_from(content_type.as_deref(), url));
                    match tokio::fs::write(dir.join(&name), &bytes).await {
                        Ok(()) => {
                            debug!(sku, file = %name, "cached image");
                            out.push(Some(format!("{}/{}/{}", prefix, slug, name)));
                            index += 1;
                        }
                        Err(err) => {
                            warn!(sku, error = %err, "image cache fail");
                            out.push(None);
                        }
                    }
                }
                Err(err) => {
                    warn!(sku, error = %err, "image cache fail");
                    out.push(None);
                }
            }
            if !self.spacing.is_zero() {
                tokio::time::sleep(self.spacing).await;
            }
        }
        out
    }

    async fn fetch(&self, url: &str) -> Result<(Vec<u8>, Option<String>)> {
        let res = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("fetch {}", url))?;
        if !res.status().is_success() {
            return Err(anyhow!("fetch {} {}", url, res.status()));
        }
        let content_type = res
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = res.bytes().await?;
        Ok((bytes.to_vec(), content_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_replaces_and_trims() {
        assert_eq!(safe_slug("CYS-TENT-1"), "CYS-TENT-1");
        assert_eq!(safe_slug("  a/b c  "), "a-b-c");
        assert_eq!(safe_slug("--x!!y--"), "x-y");
        assert_eq!(safe_slug(&"z".repeat(100)).len(), 80);
    }

    #[test]
    fn slug_never_escapes_cache_root() {
        assert_eq!(safe_slug(".."), "sku");
        assert_eq!(safe_slug("."), "sku");
        assert_eq!(safe_slug("../../etc"), "etc");
        assert_eq!(safe_slug("!!!"), "sku");
        assert_eq!(safe_slug(""), "sku");
        assert_eq!(safe_slug("v1.2"), "v1.2");
    }

    #[test]
    fn extension_prefers_content_type() {
        assert_eq!(ext_from(Some("image/png"), "https://x/a.jpg"), ".png");
        assert_eq!(ext_from(Some("image/jpeg"), "https://x/a"), ".jpg");
        assert_eq!(ext_from(None, "https://x/a.WEBP?sig=1"), ".webp");
        assert_eq!(ext_from(Some("application/octet-stream"), "https://x/a"), ".jpg");
    }
}
