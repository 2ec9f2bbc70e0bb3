//! HTTP client wrapper for backend API requests.

use crate::error::{Error, Result};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Response};
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;

const USER_AGENT: &str = concat!("chatbot-client/", env!("CARGO_PKG_VERSION"));

/// Timeouts applied to requests.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    /// Whole-request limit for one-shot JSON calls. Streamed bodies are not
    /// bounded by it. `None` disables it.
    pub request: Option<Duration>,
    /// Longest wait for the next read on any connection, streams included.
    /// `None` disables it.
    pub read: Option<Duration>,
    pub connect: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            request: Some(Duration::from_secs(120)),
            read: Some(Duration::from_secs(120)),
            connect: Duration::from_secs(10),
        }
    }
}

/// HTTP client bound to one backend base URL.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    request_timeout: Option<Duration>,
}

impl HttpClient {
    /// Create a new HTTP client.
    ///
    /// `base_url` must be an absolute http(s) URL; a trailing slash is ignored.
    pub fn new(base_url: &str, timeouts: Timeouts) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;

        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(timeouts.connect);
        if let Some(timeout) = timeouts.read {
            builder = builder.read_timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url,
            request_timeout: timeouts.request,
        })
    }

    /// Base URL requests are resolved against, without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!("Sending {method} {url}");
        self.client.request(method, url)
    }

    /// Request with the whole-request timeout applied.
    fn one_shot(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.request(method, path);
        match self.request_timeout {
            Some(timeout) => builder.timeout(timeout),
            None => builder,
        }
    }

    /// Make a GET request and deserialize the JSON response.
    pub async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        let response = self.one_shot(Method::GET, path).send().await?;
        read_json(response).await
    }

    /// Make a POST request with JSON body and deserialize the response.
    pub async fn post_json<T: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<R> {
        let response = self
            .one_shot(Method::POST, path)
            .json(body)
            .send()
            .await?;
        read_json(response).await
    }

    /// Make a bodiless POST request with query parameters and deserialize the response.
    pub async fn post_query<Q: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<R> {
        let response = self
            .one_shot(Method::POST, path)
            .query(query)
            .send()
            .await?;
        read_json(response).await
    }

    /// Make a POST request for a streamed response.
    ///
    /// The status is checked before the body is touched: on failure no bytes
    /// are read from the stream. The returned response body is unread. Only
    /// the idle read timeout applies, so a body that keeps arriving is never
    /// cut off.
    pub async fn post_stream<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Response> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/plain"));

        let response = self
            .request(Method::POST, path)
            .headers(headers)
            .json(body)
            .send()
            .await?;

        check_status(response).await
    }
}

/// Fail with `Error::Transport` unless the response status is 2xx.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    tracing::debug!(%status, url = %response.url(), "Received response");

    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::Transport { status, body })
}

async fn read_json<R: DeserializeOwned>(response: Response) -> Result<R> {
    let response = check_status(response).await?;
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let invalid = |reason: String| Error::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };

    let trimmed = raw.trim().trim_end_matches('/');
    let url = url::Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("must not carry a query or fragment".into()));
    }

    Ok(trimmed.to_string())
}
