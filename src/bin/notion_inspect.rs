use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use storefront_kit::config;
use storefront_kit::notion::NotionClient;

#[derive(Parser, Debug)]
struct Args {
    /// Path to YAML config (defaults to storefront.yaml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Database ID to inspect; defaults to NOTION_DB_ID
    #[arg(long)]
    db_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = config::load(args.config.as_deref())?;
    let creds = &cfg.credentials;
    let client = NotionClient::new(creds.notion_token()?.to_string(), cfg.notion.version.clone())?;

    let db_id = match args.db_id {
        Some(id) => id,
        None => creds.notion_db_id()?.to_string(),
    };
    let db = client.retrieve_database(&db_id).await?;
    println!("Database ID: {}", db.id);
    println!("Properties:");
    let mut names: Vec<_> = db.properties.iter().collect();
    names.sort_by(|a, b| a.0.cmp(b.0));
    for (name, prop) in names {
        println!("  {} -> {{ id: {}, type: {} }}", name, prop.id, prop.typ);
    }

    let schema = &cfg.schema;
    println!("Schema:");
    for (field, aliases) in [
        ("name", &schema.name),
        ("active", &schema.active),
        ("price", &schema.price),
        ("sku", &schema.sku),
        ("url_live", &schema.url_live),
        ("url_test", &schema.url_test),
        ("images", &schema.images),
        ("variants", &schema.variants),
    ] {
        let found: Vec<&str> = aliases
            .iter()
            .filter(|a| db.properties.contains_key(a.as_str()))
            .map(String::as_str)
            .collect();
        if found.is_empty() {
            println!("  {:<9} MISSING (tried {})", field, aliases.join(", "));
        } else {
            println!("  {:<9} {}", field, found.join(", "));
        }
    }
    Ok(())
}
