use crate::config::{NotionConfig, RetryConfig};
use crate::error::{SyncError, SyncResult};
use crate::fingerprint::Fingerprint;
use crate::item::{Category, NewItem, Priority, StoredItem};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const TITLE_PROPERTY: &str = "Name";
pub const CATEGORY_PROPERTY: &str = "Category";
pub const PRIORITY_PROPERTY: &str = "Priority";
pub const SOURCE_PROPERTY: &str = "Source Meeting";
pub const DATE_ADDED_PROPERTY: &str = "Date Added";
pub const DEADLINE_PROPERTY: &str = "Deadline";
pub const FINGERPRINT_PROPERTY: &str = "Item ID";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemFilter {
    /// Items whose completion flag is unset.
    Open,
    /// Every item ever stored, completed or not.
    All
}

#[derive(Debug, Clone, Default)]
pub struct ItemPage {
    pub items: Vec<StoredItem>,
    pub next_cursor: Option<String>
}

/// Task store seam. Implementors page; callers get complete sets from the
/// provided `list_*` methods.
#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn query_page(&self, filter: ItemFilter, cursor: Option<&str>) -> SyncResult<ItemPage>;

    /// Persists a new record and returns its store id.
    async fn create(&self, item: &NewItem) -> SyncResult<String>;

    async fn list_items(&self, filter: ItemFilter) -> SyncResult<Vec<StoredItem>> {
        let mut all_items = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self.query_page(filter, cursor.as_deref()).await?;
            all_items.extend(page.items);

            match page.next_cursor {
                Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
                Some(next) => {
                    warn!(cursor = %next, "Store repeated a page cursor, stopping pagination");
                    break;
                }
                None => break
            }
        }

        Ok(all_items)
    }

    async fn list_open(&self) -> SyncResult<Vec<StoredItem>> {
        self.list_items(ItemFilter::Open).await
    }

    async fn list_all_fingerprints(&self) -> SyncResult<HashSet<Fingerprint>> {
        Ok(self
            .list_items(ItemFilter::All)
            .await?
            .into_iter()
            .filter_map(|item| item.fingerprint)
            .collect())
    }
}

pub struct NotionStore {
    client: Client,
    config: NotionConfig,
    retry: RetryConfig
}

impl NotionStore {
    pub fn new(config: NotionConfig, retry: RetryConfig) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(SyncError::HttpError)?;

        Ok(Self {
            client,
            config,
            retry
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &Value
    ) -> SyncResult<T> {
        let url = self.url(path);
        debug!(method = %method, url = %url, "Making Notion API request");

        let response = self
            .client
            .request(method, &url)
            .bearer_auth(&self.config.api_key)
            .header("Notion-Version", &self.config.notion_version)
            .json(body)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response.json::<T>().await?),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(1);
                Err(SyncError::RateLimited {
                    retry_after_seconds: retry_after
                })
            }
            StatusCode::UNAUTHORIZED => Err(SyncError::AuthenticationError(
                "Invalid Notion API key".to_string()
            )),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(SyncError::StoreApiError {
                    status: status.as_u16(),
                    message: body.chars().take(200).collect()
                })
            }
        }
    }

    /// Runs `action` until it succeeds, `should_retry` rejects the error, or
    /// the backoff is spent. A rate-limit hint stretches the wait to at least
    /// the server's `Retry-After`.
    async fn with_retry<T, F, Fut>(
        &self,
        mut action: F,
        should_retry: impl Fn(&SyncError) -> bool
    ) -> SyncResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = SyncResult<T>>
    {
        let mut delays = self.retry.strategy();
        loop {
            let error = match action().await {
                Ok(value) => return Ok(value),
                Err(e) => e
            };
            if !should_retry(&error) {
                return Err(error);
            }
            let Some(backoff) = delays.next() else {
                return Err(error);
            };
            let wait = error
                .retry_after()
                .map(Duration::from_secs)
                .map_or(backoff, |hint| hint.max(backoff));
            warn!(error = %error, wait_ms = wait.as_millis() as u64, "Retrying Notion request");
            tokio::time::sleep(wait).await;
        }
    }

    fn query_body(&self, filter: ItemFilter, cursor: Option<&str>) -> Value {
        let mut body = json!({ "page_size": self.config.page_size });
        if filter == ItemFilter::Open {
            body["filter"] = json!({
                "property": self.config.completion_property,
                "checkbox": { "equals": false }
            });
        }
        if let Some(cursor) = cursor {
            body["start_cursor"] = json!(cursor);
        }
        body
    }

    fn create_body(&self, item: &NewItem) -> Value {
        let mut properties = json!({
            TITLE_PROPERTY: { "title": [{ "text": { "content": item.description } }] },
            CATEGORY_PROPERTY: { "select": { "name": item.category.display_name() } },
            PRIORITY_PROPERTY: { "select": { "name": item.priority.display_name() } },
            SOURCE_PROPERTY: { "rich_text": [{ "text": { "content": item.source_meeting } }] },
            DATE_ADDED_PROPERTY: { "date": { "start": item.date_added.format("%Y-%m-%d").to_string() } },
            FINGERPRINT_PROPERTY: { "rich_text": [{ "text": { "content": item.fingerprint.as_str() } }] }
        });
        properties[self.config.completion_property.as_str()] = json!({ "checkbox": false });
        if let Some(deadline) = item.deadline {
            properties[DEADLINE_PROPERTY] =
                json!({ "date": { "start": deadline.format("%Y-%m-%d").to_string() } });
        }

        json!({
            "parent": { "database_id": self.config.database_id },
            "properties": properties
        })
    }

    /// Declares every property the sync reads or writes. Safe to repeat.
    pub async fn configure_schema(&self) -> SyncResult<()> {
        let options = |names: Vec<&str>| -> Value {
            Value::Array(names.into_iter().map(|n| json!({ "name": n })).collect())
        };

        let mut properties = json!({
            TITLE_PROPERTY: { "title": {} },
            CATEGORY_PROPERTY: { "select": { "options": options(Category::ALL.iter().map(|c| c.display_name()).collect()) } },
            PRIORITY_PROPERTY: { "select": { "options": options(Priority::ALL.iter().map(|p| p.display_name()).collect()) } },
            DEADLINE_PROPERTY: { "date": {} },
            SOURCE_PROPERTY: { "rich_text": {} },
            DATE_ADDED_PROPERTY: { "date": {} },
            FINGERPRINT_PROPERTY: { "rich_text": {} }
        });
        properties[self.config.completion_property.as_str()] = json!({ "checkbox": {} });

        let path = format!("/databases/{}", self.config.database_id);
        let body = json!({ "properties": properties });
        let _: Value = self.send(Method::PATCH, &path, &body).await?;
        Ok(())
    }

    fn page_to_item(&self, page: NotionPage) -> StoredItem {
        let properties = page.properties;
        let description = plain_text(properties.get(TITLE_PROPERTY), "title");
        let fingerprint = Fingerprint::from_stored(&plain_text(
            properties.get(FINGERPRINT_PROPERTY),
            "rich_text"
        ));
        let completed = properties
            .get(self.config.completion_property.as_str())
            .and_then(|p| p.get("checkbox"))
            .and_then(Value::as_bool)
            .unwrap_or(false);

        StoredItem {
            id: page.id,
            description,
            fingerprint,
            completed
        }
    }
}

/// Concatenated `plain_text` of a title or rich text property.
fn plain_text(property: Option<&Value>, kind: &str) -> String {
    property
        .and_then(|p| p.get(kind))
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("plain_text").and_then(Value::as_str))
                .collect::<String>()
        })
        .unwrap_or_default()
}

#[async_trait]
impl ItemStore for NotionStore {
    async fn query_page(&self, filter: ItemFilter, cursor: Option<&str>) -> SyncResult<ItemPage> {
        let path = format!("/databases/{}/query", self.config.database_id);
        let body = self.query_body(filter, cursor);

        let response: QueryResponse = self
            .with_retry(
                || self.send(Method::POST, &path, &body),
                SyncError::is_retryable
            )
            .await?;

        Ok(ItemPage {
            items: response
                .results
                .into_iter()
                .map(|page| self.page_to_item(page))
                .collect(),
            next_cursor: if response.has_more {
                response.next_cursor
            } else {
                None
            }
        })
    }

    async fn create(&self, item: &NewItem) -> SyncResult<String> {
        let body = self.create_body(item);

        // Only a 429 guarantees the page was not created.
        let page: CreatedPage = self
            .with_retry(
                || self.send(Method::POST, "/pages", &body),
                |e| matches!(e, SyncError::RateLimited { .. })
            )
            .await?;

        Ok(page.id)
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<NotionPage>,
    #[serde(default)]
    has_more: bool,
    next_cursor: Option<String>
}

#[derive(Debug, Deserialize)]
struct NotionPage {
    id: String,
    #[serde(default)]
    properties: serde_json::Map<String, Value>
}

#[derive(Debug, Deserialize)]
struct CreatedPage {
    id: String
}

pub fn create_notion_store(
    config: NotionConfig,
    retry: RetryConfig
) -> SyncResult<Arc<dyn ItemStore>> {
    Ok(Arc::new(NotionStore::new(config, retry)?))
}
