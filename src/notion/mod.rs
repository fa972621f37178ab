use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::stream::{self, Stream, TryStreamExt};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::fmt;
use tracing::{debug, warn};

use crate::notion::model::{QueryDatabaseResp, RetrieveDatabaseResp};

pub mod model;
pub mod props;

pub use model::Page;

const NOTION_API_BASE: &str = "https://api.notion.com/";

/// Notion caps `page_size` at 100.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Clone)]
pub struct NotionClient {
    http: Client,
    base_url: Url,
    token: String,
    version: String,
}

impl fmt::Debug for NotionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotionClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// The Notion calls a sync run makes. Tests swap in a recording fake.
#[async_trait]
pub trait NotionService: Send + Sync {
    /// One page of `POST /v1/databases/{id}/query`; `body` carries filter,
    /// cursor and page size.
    async fn query_database(&self, database_id: &str, body: &Value) -> Result<QueryDatabaseResp>;

    async fn update_page_properties(&self, page_id: &str, properties: Value) -> Result<()>;

    /// Column names of the database.
    async fn database_columns(&self, database_id: &str) -> Result<Vec<String>>;
}

impl NotionClient {
    pub fn new(token: String, version: String) -> Result<Self> {
        let base_url = Url::parse(NOTION_API_BASE).context("invalid default Notion URL")?;
        Self::with_base_url(token, version, base_url)
    }

    pub fn with_base_url(token: String, version: String, base_url: Url) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("storefront-kit/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url,
            token,
            version,
        })
    }

    pub fn build_request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<reqwest::Request> {
        let endpoint = self
            .base_url
            .join(path)
            .context("invalid Notion base URL")?;
        let mut builder = self
            .http
            .request(method, endpoint)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Notion-Version", &self.version);
        if let Some(body) = body {
            builder = builder
                .header("Content-Type", "application/json")
                .json(body);
        }
        builder.build().context("failed to build Notion request")
    }

    async fn execute<T: DeserializeOwned>(&self, request: reqwest::Request) -> Result<T> {
        debug!(method=%request.method(), url=%request.url(), "sending notion request");
        let res = self
            .http
            .execute(request)
            .await
            .context("failed to reach Notion")?;

        if res.status() == StatusCode::TOO_MANY_REQUESTS {
            let body = res.text().await.unwrap_or_default();
            warn!("Rate limited by Notion: {}", body);
            return Err(anyhow!("received 429 from Notion: {}", body));
        }
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("notion error {}: {}", status, body));
        }

        res.json::<T>().await.context("invalid Notion response")
    }

    pub async fn retrieve_database(&self, database_id: &str) -> Result<RetrieveDatabaseResp> {
        let request = self.build_request(
            Method::GET,
            &format!("v1/databases/{}", database_id),
            None,
        )?;
        self.execute(request)
            .await
            .with_context(|| format!("failed to retrieve database {}", database_id))
    }
}

#[async_trait]
impl NotionService for NotionClient {
    async fn query_database(&self, database_id: &str, body: &Value) -> Result<QueryDatabaseResp> {
        let request = self.build_request(
            Method::POST,
            &format!("v1/databases/{}/query", database_id),
            Some(body),
        )?;
        self.execute(request).await
    }

    async fn update_page_properties(&self, page_id: &str, properties: Value) -> Result<()> {
        let body = json!({ "properties": properties });
        let request =
            self.build_request(Method::PATCH, &format!("v1/pages/{}", page_id), Some(&body))?;
        let _: Value = self.execute(request).await?;
        Ok(())
    }

    async fn database_columns(&self, database_id: &str) -> Result<Vec<String>> {
        let db = self.retrieve_database(database_id).await?;
        Ok(db.properties.into_keys().collect())
    }
}

/// `checkbox equals true` filter on `property`.
/// The first of `aliases` that is a column of the database. Query filters
/// must name a real column, so this runs before any filtered query.
pub async fn resolve_column(
    notion: &dyn NotionService,
    database_id: &str,
    aliases: &[String],
) -> Result<String> {
    let columns = notion.database_columns(database_id).await?;
    aliases
        .iter()
        .find(|alias| columns.iter().any(|c| c == *alias))
        .cloned()
        .ok_or_else(|| {
            anyhow!(
                "none of the columns {:?} exist in database {}",
                aliases,
                database_id
            )
        })
}

pub fn active_filter(property: &str) -> Value {
    json!({ "property": property, "checkbox": { "equals": true } })
}

pub fn build_query_body(filter: Option<&Value>, start_cursor: Option<&str>, page_size: u32) -> Value {
    let mut body = Map::new();
    if let Some(filter) = filter {
        body.insert("filter".into(), filter.clone());
    }
    if let Some(cursor) = start_cursor {
        body.insert("start_cursor".into(), json!(cursor));
    }
    body.insert(
        "page_size".into(),
        json!(page_size.clamp(1, MAX_PAGE_SIZE)),
    );
    Value::Object(body)
}

/// Properties payload setting a single `url` column.
pub fn build_url_update(property: &str, url: &str) -> Value {
    let mut properties = Map::new();
    properties.insert(property.to_string(), json!({ "url": url }));
    Value::Object(properties)
}

enum Cursor {
    Start,
    Next(String),
    Done,
}

/// Every page matching `filter`, fetched lazily one query page at a time and
/// following `next_cursor` until `has_more` is false.
pub fn query_all<'a>(
    notion: &'a dyn NotionService,
    database_id: &'a str,
    filter: Option<Value>,
    page_size: u32,
) -> impl Stream<Item = Result<Page>> + 'a {
    let batches = stream::try_unfold(Cursor::Start, move |state| {
        let filter = filter.clone();
        async move {
            let cursor = match state {
                Cursor::Done => return Ok(None),
                Cursor::Start => None,
                Cursor::Next(c) => Some(c),
            };
            let body = build_query_body(filter.as_ref(), cursor.as_deref(), page_size);
            let resp = notion
                .query_database(database_id, &body)
                .await
                .context("failed to query Notion database")?;
            debug!(
                results = resp.results.len(),
                has_more = resp.has_more,
                "fetched notion page"
            );
            let next = match (resp.has_more, resp.next_cursor) {
                (true, Some(c)) => Cursor::Next(c),
                _ => Cursor::Done,
            };
            Ok::<_, anyhow::Error>(Some((resp.results, next)))
        }
    });
    batches
        .map_ok(|pages| stream::iter(pages.into_iter().map(Ok::<Page, anyhow::Error>)))
        .try_flatten()
}
