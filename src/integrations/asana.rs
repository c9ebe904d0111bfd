//! Asana integration.
//!
//! Implements [`TaskClient`] on top of Asana's REST API. Responses come
//! wrapped in a `{"data": ...}` envelope and collections are paged with
//! `limit`/`offset`.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::{retry_async, RetryConfig, Retryable};
use crate::tracker::{
    NewComment, RemoteTask, Section, Story, TaskClient, TaskUpdate, TrackerError, TrackerResult,
};

/// Public Asana API root.
pub const DEFAULT_BASE_URL: &str = "https://app.asana.com/api/1.0";

/// Fields requested for a task; everything the engine decides on.
const TASK_FIELDS: &str = "gid,completed,projects.name,memberships.project.name,\
    memberships.section.name,custom_fields.name,custom_fields.type,\
    custom_fields.display_value,custom_fields.enum_options.name";

/// Largest page Asana serves.
const PAGE_SIZE: usize = 100;

/// Asana API client.
#[derive(Debug, Clone)]
pub struct AsanaClient {
    /// Personal access token
    token: String,
    /// API root, without trailing slash
    base_url: String,
    /// HTTP client
    client: reqwest::Client,
    /// Backoff for rate limiting and server errors
    retry: RetryConfig,
}

/// The user a token belongs to.
#[derive(Debug, Clone, Deserialize)]
pub struct AsanaUser {
    pub gid: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Serialize)]
struct Payload<T> {
    data: T,
}

#[derive(Deserialize)]
struct Page<T> {
    data: Vec<T>,
    #[serde(default)]
    next_page: Option<NextPage>,
}

#[derive(Deserialize)]
struct NextPage {
    offset: String,
}

#[derive(Serialize)]
struct AddTask<'a> {
    task: &'a str,
}

impl AsanaClient {
    /// Create a new Asana client.
    pub fn new(token: impl Into<String>) -> TrackerResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!("tasklink/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            token: token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client,
            retry: RetryConfig::network(),
        })
    }

    /// Create a client and check that the token is accepted.
    pub async fn connect(token: impl Into<String>) -> TrackerResult<Self> {
        let client = Self::new(token)?;
        client.verify().await?;
        Ok(client)
    }

    /// Point the client at another API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Replace the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Check the token by fetching the user it belongs to.
    pub async fn verify(&self) -> TrackerResult<AsanaUser> {
        let user = self.current_user().await?;
        tracing::debug!(user = %user.gid, "Asana token verified");
        Ok(user)
    }

    /// Get the user the token belongs to.
    pub async fn current_user(&self) -> TrackerResult<AsanaUser> {
        let envelope: Envelope<AsanaUser> =
            self.execute::<_, ()>(Method::GET, "/users/me", &[], None).await?;
        Ok(envelope.data)
    }

    /// Build an authenticated request.
    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/json")
    }

    /// Parse error response from the Asana API.
    async fn parse_error(response: reqwest::Response) -> TrackerError {
        let status = response.status().as_u16();

        match status {
            401 => TrackerError::Unauthorized,
            404 => TrackerError::NotFound(response.url().path().to_string()),
            429 => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.trim().parse::<u64>().ok())
                    .map(Duration::from_secs);
                TrackerError::RateLimited { retry_after }
            }
            _ => {
                let message = response
                    .json::<serde_json::Value>()
                    .await
                    .ok()
                    .and_then(|v| {
                        v.pointer("/errors/0/message").and_then(|m| m.as_str()).map(String::from)
                    })
                    .unwrap_or_else(|| format!("HTTP {}", status));
                TrackerError::Api { status, message }
            }
        }
    }

    /// Send one request, retrying rate-limited and failed-server attempts.
    async fn execute<T, B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> TrackerResult<T>
    where
        T: DeserializeOwned + Send,
        B: Serialize + ?Sized + Sync,
    {
        let url = format!("{}{}", self.base_url, path);
        let (url, method) = (url.as_str(), &method);
        tracing::debug!(%method, url, "Asana request");

        if *method == Method::POST {
            // A POST that failed after reaching the server may have been applied.
            return retry_async(&self.retry, || async move {
                self.attempt(method, url, query, body).await.map_err(Unsafe)
            })
            .await
            .into_result()
            .map_err(|Unsafe(err)| err);
        }

        retry_async(&self.retry, || self.attempt(method, url, query, body)).await.into_result()
    }

    async fn attempt<T, B>(
        &self,
        method: &Method,
        url: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> TrackerResult<T>
    where
        T: DeserializeOwned + Send,
        B: Serialize + ?Sized + Sync,
    {
        let mut request = self.request(method.clone(), url).query(query);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(Self::parse_error(response).await);
        }

        response.json::<T>().await.map_err(|e| TrackerError::InvalidResponse(e.to_string()))
    }

    /// Collect up to `limit` items of a paged collection.
    async fn get_paged<T: DeserializeOwned + Send>(
        &self,
        path: &str,
        fields: &str,
        limit: usize,
    ) -> TrackerResult<Vec<T>> {
        let mut items: Vec<T> = Vec::new();
        let mut offset: Option<String> = None;

        while items.len() < limit {
            let mut query = vec![
                ("limit", PAGE_SIZE.min(limit - items.len()).to_string()),
                ("opt_fields", fields.to_string()),
            ];
            if let Some(offset) = &offset {
                query.push(("offset", offset.clone()));
            }

            let page: Page<T> = self.execute::<_, ()>(Method::GET, path, &query, None).await?;
            items.extend(page.data);

            match page.next_page {
                Some(next) => offset = Some(next.offset),
                None => break,
            }
        }

        items.truncate(limit);
        Ok(items)
    }
}

/// Failure of a request that is not safe to resend.
///
/// Only retried when the server certainly did not process it.
struct Unsafe(TrackerError);

impl fmt::Display for Unsafe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Retryable for Unsafe {
    fn is_retryable(&self) -> bool {
        self.0.is_unprocessed()
    }

    fn retry_after(&self) -> Option<Duration> {
        self.0.retry_after()
    }
}

#[async_trait]
impl TaskClient for AsanaClient {
    async fn fetch_task(&self, task_id: &str) -> TrackerResult<RemoteTask> {
        let query = [("opt_fields", TASK_FIELDS.to_string())];
        let envelope: Envelope<RemoteTask> = self
            .execute::<_, ()>(Method::GET, &format!("/tasks/{}", task_id), &query, None)
            .await?;
        Ok(envelope.data)
    }

    async fn list_sections(&self, project_gid: &str) -> TrackerResult<Vec<Section>> {
        self.get_paged(&format!("/projects/{}/sections", project_gid), "name", usize::MAX).await
    }

    async fn list_stories(&self, task_id: &str, limit: usize) -> TrackerResult<Vec<Story>> {
        self.get_paged(&format!("/tasks/{}/stories", task_id), "text", limit).await
    }

    async fn add_comment(&self, task_id: &str, comment: &NewComment) -> TrackerResult<Story> {
        let query = [("opt_fields", "text".to_string())];
        let envelope: Envelope<Story> = self
            .execute(
                Method::POST,
                &format!("/tasks/{}/stories", task_id),
                &query,
                Some(&Payload { data: comment }),
            )
            .await?;
        Ok(envelope.data)
    }

    async fn delete_story(&self, story_gid: &str) -> TrackerResult<()> {
        let _: Envelope<serde_json::Value> = self
            .execute::<_, ()>(Method::DELETE, &format!("/stories/{}", story_gid), &[], None)
            .await?;
        Ok(())
    }

    async fn update_task(&self, task_id: &str, update: &TaskUpdate) -> TrackerResult<()> {
        let query = [("opt_fields", "gid".to_string())];
        let _: Envelope<serde_json::Value> = self
            .execute(
                Method::PUT,
                &format!("/tasks/{}", task_id),
                &query,
                Some(&Payload { data: update }),
            )
            .await?;
        Ok(())
    }

    async fn add_task_to_section(&self, section_gid: &str, task_id: &str) -> TrackerResult<()> {
        let body = Payload { data: AddTask { task: task_id } };
        let _: Envelope<serde_json::Value> = self
            .execute(Method::POST, &format!("/sections/{}/addTask", section_gid), &[], Some(&body))
            .await?;
        Ok(())
    }
}
