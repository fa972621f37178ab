use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use storefront_kit::config;
use storefront_kit::notion::NotionClient;
use storefront_kit::status::link_status;

#[derive(Debug, Parser)]
#[command(about = "Report how many active Notion rows lack a test or live payment link")]
struct Args {
    /// Path to YAML config file (defaults to storefront.yaml when present)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    storefront_kit::init_tracing();
    let args = Args::parse();
    let cfg = config::load(args.config.as_deref())?;
    let creds = &cfg.credentials;
    let notion = NotionClient::new(creds.notion_token()?.to_string(), cfg.notion.version.clone())?;

    let status = link_status(
        &notion,
        creds.notion_db_id()?,
        &cfg.schema,
        cfg.notion.page_size,
    )
    .await?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
