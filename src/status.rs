//! Payment-link coverage of the active Notion rows.
use anyhow::Result;
use futures::TryStreamExt;
use serde::Serialize;
use tracing::instrument;

use crate::config::CatalogSchema;
use crate::notion::{self, props, NotionService};

const SAMPLE_LIMIT: usize = 5;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct LinkStatus {
    pub total_active: usize,
    pub missing_test_count: usize,
    pub missing_live_count: usize,
    /// Product name, or page id when the name is blank.
    pub sample_missing_test: Vec<String>,
    pub sample_missing_live: Vec<String>,
}

impl LinkStatus {
    fn record(&mut self, label: String, has_test: bool, has_live: bool) {
        self.total_active += 1;
        if !has_test {
            self.missing_test_count += 1;
            if self.sample_missing_test.len() < SAMPLE_LIMIT {
                self.sample_missing_test.push(label.clone());
            }
        }
        if !has_live {
            self.missing_live_count += 1;
            if self.sample_missing_live.len() < SAMPLE_LIMIT {
                self.sample_missing_live.push(label);
            }
        }
    }
}

#[instrument(skip_all)]
pub async fn link_status(
    notion: &dyn NotionService,
    database_id: &str,
    schema: &CatalogSchema,
    page_size: u32,
) -> Result<LinkStatus> {
    let active = notion::resolve_column(notion, database_id, &schema.active).await?;
    let pages = notion::query_all(
        notion,
        database_id,
        Some(notion::active_filter(&active)),
        page_size,
    );
    futures::pin_mut!(pages);

    let mut status = LinkStatus::default();
    while let Some(page) = pages.try_next().await? {
        let p = &page.properties;
        let label = props::text(p, &schema.name).unwrap_or_else(|| page.id.clone());
        status.record(
            label,
            props::text(p, &schema.url_test).is_some(),
            props::text(p, &schema.url_live).is_some(),
        );
    }
    Ok(status)
}
