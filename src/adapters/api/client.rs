use super::dto::{BoardListResponse, BoardResponse, CreatedDto};
use super::retry::{Attempt, RetryPolicy};
use super::task_cache::TaskCache;
use crate::domain::{Attachment, Comment, Task, TaskId};
use crate::ports::{MetricsSink, RepositoryError, RepositoryResult, TaskRepository};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub use crate::ports::DEFAULT_BASE_URL;

/// Status and fully drained body of one HTTP exchange.
///
/// A body that breaks off mid-read leaves `body` empty and the cause in
/// `read_error`; the status still stands.
struct Exchange {
    status: StatusCode,
    body: Vec<u8>,
    read_error: Option<String>,
}

impl Exchange {
    fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Turns a broken-off body into a transport error, for callers that need the payload.
    fn require_body(self) -> RepositoryResult<Exchange> {
        match self.read_error {
            Some(e) => Err(RepositoryError::Network(format!("Failed to read response body: {e}"))),
            None => Ok(self),
        }
    }
}

/// Client for a single board on the remote tracker.
///
/// Every call goes through the retry policy; task listings are served from a
/// short-lived snapshot when possible.
pub struct BoardClient {
    http: Client,
    api_token: String,
    board_id: String,
    base_url: String,
    cache: TaskCache,
    retry: RetryPolicy,
    metrics: Option<Arc<dyn MetricsSink>>,
}

impl BoardClient {
    pub fn new(api_token: String, board_id: impl Into<String>, timeout: Duration) -> RepositoryResult<Self> {
        let mut builder = Client::builder().user_agent("board-relay/0.1.0");
        if !timeout.is_zero() {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| RepositoryError::Request(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_token,
            board_id: board_id.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            cache: TaskCache::default(),
            retry: RetryPolicy::default(),
            metrics: None,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Tunes retries before the client is shared. Non-positive values are ignored.
    pub fn set_retry_policy(&mut self, max_attempts: u32, base_wait: Duration, max_elapsed: Duration) {
        self.retry.update(max_attempts, base_wait, max_elapsed);
        tracing::debug!("Retry policy set to {:?}", self.retry);
    }

    fn board_url(&self) -> String {
        format!(
            "{}/api-v2/board/{}",
            self.base_url,
            urlencoding::encode(&self.board_id)
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.api_token)
    }

    fn record_error(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.inc_api_errors();
        }
    }

    /// Sends one request and drains the body on every path.
    async fn execute(&self, request: RequestBuilder) -> RepositoryResult<Exchange> {
        let started = Instant::now();
        if let Some(metrics) = &self.metrics {
            metrics.inc_api_requests();
        }

        let result = match request.send().await {
            Ok(response) => {
                let status = response.status();
                match response.bytes().await {
                    Ok(body) => Ok(Exchange {
                        status,
                        body: body.to_vec(),
                        read_error: None,
                    }),
                    Err(e) => {
                        tracing::warn!("Response body with status {} broke off: {}", status, e);
                        self.record_error();
                        Ok(Exchange {
                            status,
                            body: Vec::new(),
                            read_error: Some(e.to_string()),
                        })
                    }
                }
            }
            Err(e) if e.is_builder() => Err(RepositoryError::Request(e.to_string())),
            Err(e) => Err(RepositoryError::Network(e.to_string())),
        };

        if let Some(metrics) = &self.metrics {
            metrics.update_latency(started.elapsed());
        }
        if result.is_err() {
            self.record_error();
        }
        result
    }

    fn expect_status(&self, exchange: Exchange, expected: StatusCode) -> RepositoryResult<Exchange> {
        if exchange.status == expected {
            return Ok(exchange);
        }
        self.record_error();
        Err(RepositoryError::Status {
            status: exchange.status.as_u16(),
            body: exchange.body_text(),
        })
    }

    /// Sends a JSON payload and requires `expected` back, retrying transient failures.
    async fn send_json(
        &self,
        operation: &str,
        method: Method,
        url: &str,
        payload: &[u8],
        expected: StatusCode,
    ) -> RepositoryResult<Exchange> {
        self.retry
            .run(operation, move |_| {
                let method = method.clone();
                async move {
                    let request = self
                        .request(method, url)
                        .header(CONTENT_TYPE, "application/json")
                        .body(payload.to_vec());
                    Attempt::classify(
                        self.execute(request)
                            .await
                            .and_then(|exchange| self.expect_status(exchange, expected)),
                    )
                }
            })
            .await
    }

    /// The id in a `{"data": {"id": ..}}` body. A body we can't read is not an
    /// error here: the 201 already confirmed the write.
    fn parse_created_id(&self, exchange: &Exchange) -> Option<TaskId> {
        if let Some(e) = &exchange.read_error {
            tracing::warn!("Create response body could not be read: {}", e);
            return None;
        }
        match serde_json::from_slice::<BoardResponse<CreatedDto>>(&exchange.body) {
            Ok(created) if created.data.id != 0 => Some(TaskId(created.data.id)),
            Ok(_) => {
                tracing::warn!("Create response carried no task id: {}", exchange.body_text());
                None
            }
            Err(e) => {
                self.record_error();
                tracing::warn!(
                    "Failed to parse create response: {}. Response was: {}",
                    e,
                    exchange.body_text()
                );
                None
            }
        }
    }
}

/// Metadata and file parts, built fresh for each attempt since a form is consumed by sending it.
fn attachment_form(attachment: &Attachment, data: &[u8]) -> RepositoryResult<Form> {
    let metadata = serde_json::to_string(attachment)
        .map_err(|e| RepositoryError::Request(format!("Failed to encode attachment metadata: {e}")))?;
    let metadata = Part::text(metadata)
        .mime_str("application/json")
        .map_err(|e| RepositoryError::Request(e.to_string()))?;
    let file = Part::bytes(data.to_vec())
        .file_name(attachment.id.clone())
        .mime_str("application/octet-stream")
        .map_err(|e| RepositoryError::Request(e.to_string()))?;

    Ok(Form::new().part("metadata", metadata).part("file", file))
}

#[async_trait]
impl TaskRepository for BoardClient {
    async fn get_tasks(&self, limit: usize) -> RepositoryResult<Vec<Task>> {
        if let Some(tasks) = self.cache.fresh().await {
            tracing::debug!("Serving {} tasks from cache", tasks.len());
            return Ok(tasks);
        }

        let url = format!("{}/tasks?limit={}", self.board_url(), limit);
        let url = url.as_str();
        let exchange = self
            .retry
            .run("GET tasks", move |_| async move {
                Attempt::classify(
                    self.execute(self.request(Method::GET, url))
                        .await
                        .and_then(|exchange| self.expect_status(exchange, StatusCode::OK))
                        .and_then(Exchange::require_body),
                )
            })
            .await?;

        tracing::debug!("API List Response: {}", exchange.body_text());

        let list: BoardListResponse<Task> = serde_json::from_slice(&exchange.body).map_err(|e| {
            self.record_error();
            RepositoryError::Serialization(format!(
                "Failed to parse list response: {}. Response was: {}",
                e,
                exchange.body_text()
            ))
        })?;

        self.cache.replace(list.data.clone()).await;
        Ok(list.data)
    }

    async fn create_task(&self, task: &mut Task) -> RepositoryResult<()> {
        let url = format!("{}/tasks", self.board_url());
        let payload = serde_json::to_vec(task)
            .map_err(|e| RepositoryError::Request(format!("Failed to serialize task: {e}")))?;

        let exchange = self
            .send_json("POST task", Method::POST, &url, &payload, StatusCode::CREATED)
            .await?;

        if let Some(id) = self.parse_created_id(&exchange) {
            task.id = id;
        }
        tracing::info!("Created task {} \"{}\"", task.id, task.title);
        Ok(())
    }

    async fn update_task(&self, task: &Task) -> RepositoryResult<()> {
        let url = format!("{}/tasks/{}", self.board_url(), task.id);
        let payload = serde_json::to_vec(task)
            .map_err(|e| RepositoryError::Request(format!("Failed to serialize task: {e}")))?;

        self.send_json("PUT task", Method::PUT, &url, &payload, StatusCode::OK)
            .await?;
        tracing::info!("Updated task {}", task.id);
        Ok(())
    }

    async fn upload_attachment(
        &self,
        task_id: TaskId,
        attachment: &Attachment,
        data: &[u8],
    ) -> RepositoryResult<()> {
        let url = format!("{}/tasks/{}/attachments", self.board_url(), task_id);
        let url = url.as_str();

        self.retry
            .run("POST attachment", move |_| async move {
                let form = match attachment_form(attachment, data) {
                    Ok(form) => form,
                    Err(e) => return Attempt::Fail(e),
                };
                Attempt::classify(
                    self.execute(self.request(Method::POST, url).multipart(form))
                        .await
                        .and_then(|exchange| self.expect_status(exchange, StatusCode::CREATED)),
                )
            })
            .await?;

        tracing::info!("Uploaded attachment {} to task {}", attachment.id, task_id);
        Ok(())
    }

    async fn add_comment(&self, task_id: TaskId, comment: &Comment) -> RepositoryResult<()> {
        let url = format!("{}/tasks/{}/comments", self.board_url(), task_id);
        let payload = serde_json::to_vec(comment)
            .map_err(|e| RepositoryError::Request(format!("Failed to serialize comment: {e}")))?;

        self.send_json("POST comment", Method::POST, &url, &payload, StatusCode::CREATED)
            .await?;
        tracing::info!("Added comment to task {}", task_id);
        Ok(())
    }
}
