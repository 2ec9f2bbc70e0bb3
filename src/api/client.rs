//! Typed operations over the backend endpoints.

use super::http::HttpClient;
use super::types::{ChatInfo, ChatQuery, ScrapeReport, SendMessage};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::stream::TextStream;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Streaming chat endpoint. Answers are not scoped to a single chat.
const CHAT_PATH: &str = "/chat";

/// Client for the chat/scraping backend.
///
/// Cloning is cheap; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: HttpClient,
    scrape_limit: u32,
}

impl ApiClient {
    /// Create a client with default timeouts and scrape limit.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::from_config(&Config {
            base_url: base_url.to_string(),
            ..Config::default()
        })
    }

    /// Create a client from a resolved configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = HttpClient::new(&config.base_url, config.timeouts())?;
        Ok(Self {
            http,
            scrape_limit: config.scrape_limit,
        })
    }

    /// Create a client from the process-wide configuration.
    pub fn from_global() -> Result<Self> {
        Self::from_config(crate::config::get())
    }

    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    /// `GET /chats`
    pub async fn list_chats(&self) -> Result<Vec<ChatInfo>> {
        self.http.get_json("/chats").await
    }

    /// `GET /chats/{id}/messages`
    pub async fn list_messages(&self, chat_id: i64) -> Result<Value> {
        self.http
            .get_json(&format!("/chats/{chat_id}/messages"))
            .await
    }

    /// `POST /chats/{id}/send`
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<Value> {
        self.http
            .post_json(&format!("/chats/{chat_id}/send"), &SendMessage { text })
            .await
    }

    /// `POST /chats/{id}/scrape?limit={n}`
    ///
    /// `None` uses the configured default limit.
    pub async fn scrape_chat(&self, chat_id: i64, limit: Option<u32>) -> Result<ScrapeReport> {
        let limit = limit.unwrap_or(self.scrape_limit);
        let report: ScrapeReport = self
            .http
            .post_query(&format!("/chats/{chat_id}/scrape"), &[("limit", limit)])
            .await?;

        if !report.is_success() {
            tracing::debug!(chat_id, detail = ?report.detail, "Backend reported scrape failure");
        }
        Ok(report)
    }

    /// `GET /chats/{id}/summary`
    pub async fn fetch_summary(&self, chat_id: i64) -> Result<Value> {
        self.http
            .get_json(&format!("/chats/{chat_id}/summary"))
            .await
    }

    /// `GET /sources`
    pub async fn list_sources(&self) -> Result<Value> {
        self.http.get_json("/sources").await
    }

    /// `GET /admin/stats`
    pub async fn admin_stats(&self) -> Result<Value> {
        self.http.get_json("/admin/stats").await
    }

    /// Start a streamed chat answer and return its fragments as a [`TextStream`].
    ///
    /// Fails with `Error::Transport` before any body byte is read when the
    /// backend rejects the request.
    pub async fn chat_stream(&self, query: &str) -> Result<TextStream> {
        let response = self.http.post_stream(CHAT_PATH, &ChatQuery { query }).await?;
        Ok(TextStream::new(response.bytes_stream()))
    }

    /// Stream a chat answer into `sink`, one call per decoded fragment.
    ///
    /// Returns once the backend closes the stream. The sink is never called
    /// with an empty string, and never called at all if the request fails.
    pub async fn stream_chat<F>(&self, query: &str, sink: F) -> Result<()>
    where
        F: FnMut(&str),
    {
        self.chat_stream(query).await?.for_each_chunk(sink, None).await
    }

    /// Like [`stream_chat`](Self::stream_chat), but stops with
    /// `Error::Cancelled` once `cancel` fires.
    pub async fn stream_chat_until<F>(
        &self,
        query: &str,
        cancel: &CancellationToken,
        sink: F,
    ) -> Result<()>
    where
        F: FnMut(&str),
    {
        let stream = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            stream = self.chat_stream(query) => stream?,
        };
        stream.for_each_chunk(sink, Some(cancel)).await
    }
}
