pub mod catalog;
pub mod config;
pub mod diag;
pub mod images;
pub mod model;
pub mod notion;
pub mod status;
pub mod storefront;
pub mod stripe;
pub mod sync;

use tracing_subscriber::EnvFilter;

/// Level used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Same subscriber setup for every binary: `RUST_LOG` filtering, compact lines.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .compact()
        .init();
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}
