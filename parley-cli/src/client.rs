use crate::error::ConsoleError;
use crate::stream::{self, StreamHandler, StreamOutcome};
use parley_shared::work::{
    Deliverable, Email, EmailSubmission, NewDeliverable, NewProject, NewStatusUpdate,
    ProcessedEmail, Project, QueryAnswer, StatusUpdate, StatusUpdateCreated, WorkQuery,
};
use parley_shared::{
    ChatRequest, ClearOutcome, ClearRequest, Health, SaveOutcome, SystemPrompt, TextRequest,
    TokenCount, TokenCountRequest,
};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// Default time a streamed exchange may take before it is abandoned.
pub const STREAM_TIMEOUT: Duration = Duration::from_secs(300);

/// Which server-side system prompt a settings call addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    Chat,
    Summarize,
}

impl PromptKind {
    fn path(self) -> &'static str {
        match self {
            PromptKind::Chat => "/api/settings/system-prompt",
            PromptKind::Summarize => "/api/settings/summarize-system-prompt",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PromptKind::Chat => "System prompt",
            PromptKind::Summarize => "Summarization prompt",
        }
    }
}

/// HTTP front for the console server. Cheap to clone; clones share the
/// connection pool.
#[derive(Clone)]
pub struct ApiClient {
    base: Url,
    http: reqwest::Client,
    stream_timeout: Duration,
}

impl ApiClient {
    /// `base_url` may carry a path prefix such as `http://host/llm`; API
    /// paths are resolved below it.
    pub fn new(base_url: &str) -> Result<Self, ConsoleError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            base,
            http: reqwest::Client::new(),
            stream_timeout: STREAM_TIMEOUT,
        })
    }

    pub fn with_stream_timeout(mut self, timeout: Duration) -> Self {
        self.stream_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url, ConsoleError> {
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ConsoleError> {
        let url = self.url(path)?;
        debug!("GET {}", url);
        let response = self.http.get(url).send().await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    async fn get_json_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, ConsoleError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self.url(path)?;
        debug!("GET {}", url);
        let response = self.http.get(url).query(query).send().await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ConsoleError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        debug!("POST {}", url);
        let response = self.http.post(url).json(body).send().await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    /// POST `body` and feed the NDJSON response into `handler`. The whole
    /// exchange is bounded by the stream timeout; cancellation is honoured
    /// both while waiting for headers and while reading the body.
    async fn stream<B, H>(
        &self,
        path: &str,
        body: &B,
        handler: &mut H,
        cancel: &CancellationToken,
    ) -> Result<StreamOutcome, ConsoleError>
    where
        B: Serialize + ?Sized,
        H: StreamHandler + ?Sized,
    {
        let url = self.url(path)?;
        info!("Opening stream {}", url);

        let exchange = async {
            let request = self.http.post(url).json(body).send();
            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(StreamOutcome::Stopped),
                response = request => response?,
            };
            let response = ensure_success(response).await?;
            stream::consume(response.bytes_stream(), handler, cancel).await
        };

        match tokio::time::timeout(self.stream_timeout, exchange).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Stream {} timed out after {:?}", path, self.stream_timeout);
                Err(ConsoleError::Timeout(self.stream_timeout))
            }
        }
    }

    pub async fn health(&self) -> Result<Health, ConsoleError> {
        self.get_json("/api/health").await
    }

    pub async fn stream_chat<H: StreamHandler + ?Sized>(
        &self,
        request: &ChatRequest,
        handler: &mut H,
        cancel: &CancellationToken,
    ) -> Result<StreamOutcome, ConsoleError> {
        self.stream("/api/chat/stream", request, handler, cancel).await
    }

    pub async fn stream_summary<H: StreamHandler + ?Sized>(
        &self,
        text: &str,
        handler: &mut H,
        cancel: &CancellationToken,
    ) -> Result<StreamOutcome, ConsoleError> {
        let body = TextRequest { text: text.to_string() };
        self.stream("/api/summarize/stream", &body, handler, cancel).await
    }

    pub async fn stream_parse<H: StreamHandler + ?Sized>(
        &self,
        text: &str,
        handler: &mut H,
        cancel: &CancellationToken,
    ) -> Result<StreamOutcome, ConsoleError> {
        let body = TextRequest { text: text.to_string() };
        self.stream("/api/parse/stream", &body, handler, cancel).await
    }

    pub async fn chat_tokens(
        &self,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<TokenCount, ConsoleError> {
        let body = TokenCountRequest {
            message: message.to_string(),
            session_id: session_id.map(str::to_string),
        };
        self.post_json("/api/chat/tokens", &body).await
    }

    pub async fn summarize_tokens(&self, text: &str) -> Result<TokenCount, ConsoleError> {
        let body = TextRequest { text: text.to_string() };
        self.post_json("/api/summarize/tokens", &body).await
    }

    pub async fn clear_conversation(
        &self,
        session_id: Option<&str>,
    ) -> Result<ClearOutcome, ConsoleError> {
        let url = self.url("/api/conversation/clear")?;
        let body = ClearRequest {
            session_id: session_id.map(str::to_string),
        };
        let response = self.http.post(url).json(&body).send().await?;
        // 400/404 still carry a JSON verdict worth showing.
        match response.status() {
            StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => Ok(response.json().await?),
            _ => Ok(ensure_success(response).await?.json().await?),
        }
    }

    pub async fn system_prompt(&self, kind: PromptKind) -> Result<SystemPrompt, ConsoleError> {
        self.get_json(kind.path()).await
    }

    pub async fn save_system_prompt(
        &self,
        kind: PromptKind,
        prompt: &str,
    ) -> Result<SaveOutcome, ConsoleError> {
        let body = SystemPrompt {
            system_prompt: prompt.to_string(),
        };
        self.post_json(kind.path(), &body).await
    }

    pub async fn projects(&self) -> Result<Vec<Project>, ConsoleError> {
        self.get_json("/api/work/projects").await
    }

    pub async fn create_project(&self, project: &NewProject) -> Result<Project, ConsoleError> {
        self.post_json("/api/work/projects", project).await
    }

    pub async fn project_emails(&self, project_id: i64) -> Result<Vec<Email>, ConsoleError> {
        self.get_json_query("/api/work/emails", &[("project_id", project_id)])
            .await
    }

    pub async fn process_email(
        &self,
        email: &EmailSubmission,
    ) -> Result<ProcessedEmail, ConsoleError> {
        self.post_json("/api/work/emails/process", email).await
    }

    pub async fn status_updates(&self, project_id: i64) -> Result<Vec<StatusUpdate>, ConsoleError> {
        self.get_json(&format!("/api/work/status-updates/{project_id}"))
            .await
    }

    pub async fn add_status_update(
        &self,
        update: &NewStatusUpdate,
    ) -> Result<StatusUpdateCreated, ConsoleError> {
        self.post_json("/api/work/status-updates", update).await
    }

    pub async fn upcoming_deliverables(&self, days: u32) -> Result<Vec<Deliverable>, ConsoleError> {
        self.get_json_query("/api/work/deliverables", &[("upcoming_days", days)])
            .await
    }

    pub async fn add_deliverable(
        &self,
        deliverable: &NewDeliverable,
    ) -> Result<Deliverable, ConsoleError> {
        self.post_json("/api/work/deliverables", deliverable).await
    }

    pub async fn query(&self, query: &str) -> Result<QueryAnswer, ConsoleError> {
        let body = WorkQuery {
            query: query.to_string(),
        };
        self.post_json("/api/work/query", &body).await
    }
}

async fn ensure_success(response: Response) -> Result<Response, ConsoleError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!("Request failed with {}: {}", status, body);
    Err(ConsoleError::Status {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_join_onto_base() {
        let client = ApiClient::new("http://127.0.0.1:5000").unwrap();
        assert_eq!(
            client.url("/api/health").unwrap().as_str(),
            "http://127.0.0.1:5000/api/health"
        );
        assert_eq!(
            client.url(PromptKind::Summarize.path()).unwrap().as_str(),
            "http://127.0.0.1:5000/api/settings/summarize-system-prompt"
        );
    }

    #[test]
    fn path_prefix_of_base_is_kept() {
        for base in ["http://host/llm", "http://host/llm/"] {
            let client = ApiClient::new(base).unwrap();
            assert_eq!(
                client.url("/api/health").unwrap().as_str(),
                "http://host/llm/api/health"
            );
        }
    }

    #[test]
    fn bad_base_url_is_rejected() {
        assert!(matches!(
            ApiClient::new("not a url"),
            Err(ConsoleError::Url(_))
        ));
    }
}
