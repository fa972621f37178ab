use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use storefront_kit::storefront::{build_single, build_site, SiteLayout};

#[derive(Debug, Parser)]
#[command(about = "Render static storefront pages, one per store directory or a single client.json")]
struct Args {
    /// Catalog written by the sync
    #[arg(long, default_value = "data/products.json")]
    products: PathBuf,

    /// Directory with one subdirectory per store
    #[arg(long, default_value = "public/stores")]
    stores: PathBuf,

    /// Render one store from this client config (e.g. data/client.json)
    /// instead of every directory under --stores
    #[arg(long)]
    client: Option<PathBuf>,

    /// Output directory for the generated site
    #[arg(long, default_value = "site")]
    out: PathBuf,

    /// Path prefix the site is served under (e.g. /storefront)
    #[arg(long, default_value = "")]
    base_path: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    storefront_kit::init_tracing();
    let args = Args::parse();

    let layout = SiteLayout {
        products: args.products,
        stores_dir: args.stores,
        out_dir: args.out,
        base_path: args.base_path,
    };
    let pages = match &args.client {
        Some(client) => vec![build_single(&layout, client).await?],
        None => build_site(&layout).await?,
    };
    if pages.is_empty() {
        println!("No stores found under {}", layout.stores_dir.display());
    }
    for page in &pages {
        println!("Wrote {}", page.display());
    }
    Ok(())
}
