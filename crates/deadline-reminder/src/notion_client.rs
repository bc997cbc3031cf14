//! Notion API client for the task database.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::config::NotionConfig;
use crate::error::{RemoteFailure, ReminderError, ReminderResult};

const NOTION_VERSION: &str = "2022-06-28";

/// Remote task database operations the service depends on
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// Query one page of database records starting at `cursor`
    async fn query_tasks(&self, cursor: Option<&str>) -> ReminderResult<TaskPage>;

    /// Retrieve a single record by id with its current property values
    async fn retrieve(&self, page_id: &str) -> ReminderResult<PageRecord>;

    /// Mark a record as archived
    async fn archive(&self, page_id: &str) -> ReminderResult<()>;
}

/// One page of query results
#[derive(Debug, Clone, Default)]
pub struct TaskPage {
    pub records: Vec<PageRecord>,
    /// Cursor for the following page; `None` once the provider has no more
    pub next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    results: Vec<PageRecord>,
    #[serde(default)]
    has_more: bool,
    next_cursor: Option<String>,
}

/// A database record as returned by the API, reduced to the properties we read
#[derive(Debug, Clone, Deserialize)]
pub struct PageRecord {
    pub id: String,
    #[serde(default)]
    pub properties: PageProperties,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageProperties {
    #[serde(rename = "Name")]
    pub name: Option<TitleProperty>,
    #[serde(rename = "Due")]
    pub due: Option<DateProperty>,
    #[serde(rename = "Complete")]
    pub complete: Option<CheckboxProperty>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TitleProperty {
    #[serde(default)]
    pub title: Vec<RichText>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RichText {
    pub plain_text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DateProperty {
    pub date: Option<DateValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DateValue {
    pub start: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckboxProperty {
    #[serde(default)]
    pub checkbox: bool,
}

impl PageRecord {
    /// Plain text of the first title fragment
    pub fn title(&self) -> Option<&str> {
        self.properties
            .name
            .as_ref()
            .and_then(|name| name.title.first())
            .map(|text| text.plain_text.as_str())
    }

    /// Raw `Due.date.start` value
    pub fn due_start(&self) -> Option<&str> {
        self.properties
            .due
            .as_ref()
            .and_then(|due| due.date.as_ref())
            .map(|date| date.start.as_str())
    }

    /// Value of the `Complete` checkbox, or `None` when the property is absent
    pub fn complete(&self) -> Option<bool> {
        self.properties.complete.as_ref().map(|c| c.checkbox)
    }
}

/// Client for the Notion REST API scoped to a single database
pub struct NotionClient {
    client: Client,
    base_url: String,
    api_key: String,
    database_id: String,
}

impl NotionClient {
    pub fn new(config: &NotionConfig, timeout: Duration) -> ReminderResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReminderError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            database_id: config.database_id.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/v1/{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION)
    }
}

/// Send a request and decode a JSON body. Non-success statuses keep the
/// response body for the error.
async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, RemoteFailure> {
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(RemoteFailure::Status { status, body });
    }

    Ok(response.json::<T>().await?)
}

#[async_trait]
impl TaskSource for NotionClient {
    async fn query_tasks(&self, cursor: Option<&str>) -> ReminderResult<TaskPage> {
        let body = match cursor {
            Some(cursor) => json!({ "start_cursor": cursor }),
            None => json!({}),
        };

        let request = self
            .request(Method::POST, &format!("databases/{}/query", self.database_id))
            .json(&body);

        let response: QueryResponse = send_json(request)
            .await
            .map_err(|e| e.into_fetch(format!("query database {}", self.database_id)))?;

        tracing::debug!(
            "Fetched {} records (has_more: {})",
            response.results.len(),
            response.has_more
        );

        Ok(TaskPage {
            records: response.results,
            next_cursor: if response.has_more {
                response.next_cursor
            } else {
                None
            },
        })
    }

    async fn retrieve(&self, page_id: &str) -> ReminderResult<PageRecord> {
        let request = self.request(Method::GET, &format!("pages/{}", page_id));

        send_json(request)
            .await
            .map_err(|e| e.into_fetch(format!("retrieve page {}", page_id)))
    }

    async fn archive(&self, page_id: &str) -> ReminderResult<()> {
        let request = self
            .request(Method::PATCH, &format!("pages/{}", page_id))
            .json(&json!({ "archived": true }));

        send_json::<serde_json::Value>(request)
            .await
            .map_err(|e| ReminderError::update(format!("archive page {}", page_id), e))?;

        Ok(())
    }
}
