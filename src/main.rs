use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

use storefront_kit::catalog::write_catalog;
use storefront_kit::config::{self, Config};
use storefront_kit::images::ImageCache;
use storefront_kit::notion::NotionClient;
use storefront_kit::stripe::{RetryPolicy, StripeClient, Upserter};
use storefront_kit::sync;

#[derive(Debug, Parser)]
#[command(author, version, about = "Sync the Notion catalog to Stripe payment links and write products.json")]
struct Args {
    /// Path to YAML config file (defaults to storefront.yaml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the catalog output path
    #[arg(long)]
    output: Option<PathBuf>,

    /// Keep remote image URLs instead of downloading them
    #[arg(long)]
    skip_images: bool,

    /// Do not write payment links back to Notion
    #[arg(long)]
    no_write_back: bool,
}

#[tokio::main]
async fn main() {
    storefront_kit::init_tracing();
    let args = Args::parse();
    if let Err(err) = run(args).await {
        error!("{:#}", err);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let mut cfg = config::load(args.config.as_deref())?;
    if let Some(output) = args.output {
        cfg.sync.output = output;
    }
    if args.skip_images {
        cfg.sync.cache_images = false;
    }
    if args.no_write_back {
        cfg.sync.write_back = false;
    }
    cfg.require_sync()?;

    let report = sync_catalog(&cfg).await?;
    write_catalog(&cfg.sync.output, &report.rows).await?;

    info!(
        output = %cfg.sync.output.display(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "Done. {} product(s)",
        report.rows.len()
    );
    Ok(())
}

async fn sync_catalog(cfg: &Config) -> Result<sync::SyncReport> {
    let creds = &cfg.credentials;
    let notion = NotionClient::new(creds.notion_token()?.to_string(), cfg.notion.version.clone())?;
    let stripe = StripeClient::new(
        creds.stripe_key()?.to_string(),
        cfg.stripe.api_version.clone(),
    )?;
    let upserter = Upserter::new(
        &stripe,
        cfg.sync.link_policy,
        RetryPolicy {
            max_retries: cfg.sync.max_retries,
            backoff_base: Duration::from_millis(cfg.sync.backoff_base_ms),
        },
        Duration::from_millis(cfg.sync.call_delay_ms),
    );
    let images = if cfg.sync.cache_images {
        Some(ImageCache::new(&cfg.sync.assets_dir)?)
    } else {
        None
    };

    sync::run(cfg, &notion, &upserter, images.as_ref()).await
}
