use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use storefront_kit::catalog::read_catalog;
use storefront_kit::config;
use storefront_kit::diag::diagnose_all;
use storefront_kit::stripe::{RetryPolicy, StripeClient};

#[derive(Debug, Parser)]
#[command(about = "Check that every catalog SKU still resolves to an active Stripe price")]
struct Args {
    /// Path to YAML config file (defaults to storefront.yaml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Catalog to check; defaults to the configured sync output
    #[arg(long)]
    products: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    storefront_kit::init_tracing();
    let args = Args::parse();
    let cfg = config::load(args.config.as_deref())?;
    let creds = &cfg.credentials;
    let stripe = StripeClient::new(
        creds.stripe_key()?.to_string(),
        cfg.stripe.api_version.clone(),
    )?;

    let path = args.products.unwrap_or_else(|| cfg.sync.output.clone());
    let rows = read_catalog(&path).await?;
    let retry = RetryPolicy {
        max_retries: cfg.sync.max_retries,
        backoff_base: Duration::from_millis(cfg.sync.backoff_base_ms),
    };

    let results = diagnose_all(
        &stripe,
        &retry,
        creds.mode,
        &rows,
        Duration::from_millis(cfg.sync.call_delay_ms),
    )
    .await;
    for result in &results {
        println!("{}", serde_json::to_string(result)?);
    }
    Ok(())
}
