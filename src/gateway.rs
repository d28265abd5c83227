use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::model::{Article, ArticleChanges, ArticleForm, ArticlePatch};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid url: {0}")]
    Url(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The REST boundary. The store only ever talks to the backend through this.
#[async_trait]
pub trait Gateway: Send + Sync + 'static {
    async fn list(&self) -> Result<Vec<Article>, GatewayError>;
    async fn list_page(&self, skip: usize, limit: usize) -> Result<Vec<Article>, GatewayError>;
    async fn get(&self, id: &str) -> Result<Article, GatewayError>;
    async fn create(&self, form: &ArticleForm) -> Result<Article, GatewayError>;
    async fn update(&self, id: &str, patch: &ArticlePatch) -> Result<ArticleChanges, GatewayError>;
    async fn delete(&self, id: &str) -> Result<(), GatewayError>;
}

#[derive(Clone, Debug)]
pub struct HttpGateway {
    client: Client,
    base_url: Url,
}

impl HttpGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let base_url = Url::parse(base_url).map_err(|e| GatewayError::Url(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::Url(base_url.to_string()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("articlebox/0.1 (Rust; TUI)")
            .build()?;
        Ok(Self { client, base_url })
    }

    /// Appends path segments to the base url, escaping each one.
    fn url(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::Url(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, GatewayError> {
        Ok(self.client.request(method, self.url(segments)?))
    }

    async fn send(&self, req: RequestBuilder) -> Result<String, GatewayError> {
        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        debug!(%status, bytes = body.len(), "response");
        if !status.is_success() {
            return Err(GatewayError::Status { status, body });
        }
        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, GatewayError> {
        let body = self.send(req).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn list(&self) -> Result<Vec<Article>, GatewayError> {
        self.send_json(self.request(Method::GET, &["articles"])?).await
    }

    async fn list_page(&self, skip: usize, limit: usize) -> Result<Vec<Article>, GatewayError> {
        let req = self
            .request(Method::GET, &["articles"])?
            .query(&[("skip", skip), ("limit", limit)]);
        self.send_json(req).await
    }

    async fn get(&self, id: &str) -> Result<Article, GatewayError> {
        self.send_json(self.request(Method::GET, &["articles", id])?).await
    }

    async fn create(&self, form: &ArticleForm) -> Result<Article, GatewayError> {
        self.send_json(self.request(Method::POST, &["articles"])?.json(form)).await
    }

    async fn update(&self, id: &str, patch: &ArticlePatch) -> Result<ArticleChanges, GatewayError> {
        self.send_json(self.request(Method::PUT, &["articles", id])?.json(patch)).await
    }

    async fn delete(&self, id: &str) -> Result<(), GatewayError> {
        // 204, body ignored
        self.send(self.request(Method::DELETE, &["articles", id])?).await?;
        Ok(())
    }
}
