//! PostgREST-style hosted table client (Supabase).

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use notifier_models::{Filter, NewService, ServicePatch, TrackedService};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, warn};

use crate::error::{Result, StoreError};
use crate::store::RecordStore;

/// Attempts per store call before the error is surfaced.
pub const DEFAULT_ATTEMPTS: u32 = 3;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Client for one table behind a PostgREST endpoint.
#[derive(Debug, Clone)]
pub struct RestTableStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    table: String,
    attempts: u32,
    retry_delay: Duration,
}

impl RestTableStore {
    /// Create a client for `table` at the project URL `base_url`.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        table: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            table: table.into(),
            attempts: DEFAULT_ATTEMPTS,
            retry_delay: RETRY_DELAY,
        })
    }

    /// Override the delay between retries.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Override the number of attempts (minimum 1).
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn endpoint(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|e| StoreError::Http(format!("invalid api key header: {e}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| StoreError::Http(format!("invalid api key header: {e}")))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        Ok(headers)
    }

    async fn with_retry<T, F, Fut>(&self, op: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.attempts => {
                    warn!(op, attempt, error = %e, "Store call failed, retrying");
                    attempt += 1;
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_rows(&self, request: reqwest::RequestBuilder) -> Result<Vec<TrackedService>> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&body)?)
    }
}

/// Render filters as PostgREST query parameters.
pub fn query_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|filter| match filter {
            Filter::Eq { column, value } => (column.clone(), format!("eq.{value}")),
            Filter::In { column, values } => {
                let quoted: Vec<String> = values
                    .iter()
                    .map(|v| format!("\"{}\"", v.replace('"', "\\\"")))
                    .collect();
                (column.clone(), format!("in.({})", quoted.join(",")))
            }
            Filter::NotNull { column } => (column.clone(), "not.is.null".to_string()),
        })
        .collect()
}

#[async_trait]
impl RecordStore for RestTableStore {
    async fn insert(&self, service: &NewService) -> Result<TrackedService> {
        let rows = self
            .with_retry("insert", || async move {
                let request = self
                    .client
                    .post(self.endpoint())
                    .headers(self.headers()?)
                    .json(service);
                self.send_rows(request).await
            })
            .await?;
        debug!(name = %service.name, "Inserted service");
        rows.into_iter().next().ok_or(StoreError::EmptyInsert)
    }

    async fn select(&self, filters: &[Filter]) -> Result<Vec<TrackedService>> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(query_params(filters));
        let params = &params;
        self.with_retry("select", || async move {
            let request = self
                .client
                .get(self.endpoint())
                .headers(self.headers()?)
                .query(params);
            self.send_rows(request).await
        })
        .await
    }

    async fn update(
        &self,
        filters: &[Filter],
        patch: &ServicePatch,
    ) -> Result<Vec<TrackedService>> {
        if filters.is_empty() {
            return Err(StoreError::UnfilteredUpdate);
        }
        let params = &query_params(filters);
        let rows = self
            .with_retry("update", || async move {
                let request = self
                    .client
                    .patch(self.endpoint())
                    .headers(self.headers()?)
                    .query(params)
                    .json(patch);
                self.send_rows(request).await
            })
            .await?;
        debug!(rows = rows.len(), "Updated services");
        Ok(rows)
    }
}
