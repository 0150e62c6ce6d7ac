//! HTTP resource backend.
//!
//! This module provides [`HttpResourceClient`], which talks to the SGM REST
//! API with reqwest. Every request carries the bearer token, when one is
//! configured.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde_json::Value as JsonValue;
use tracing::debug;

use super::{unwrap_list, ResourceClient};
use crate::config::ApiConfig;
use crate::{Result, SgmError};

/// A [`ResourceClient`] backed by the SGM REST API.
#[derive(Debug, Clone)]
pub struct HttpResourceClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpResourceClient {
    /// Creates a client for the given base URL, e.g. `http://localhost:3002/api`.
    ///
    /// # Errors
    ///
    /// Returns [`SgmError::Validation`] if `base_url` is not an absolute
    /// http(s) URL and [`SgmError::Network`] if the underlying client cannot
    /// be built.
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| invalid_base_url(base_url))?;
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    /// Creates a client from the API section of the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SgmError::Network`] if the underlying client cannot be built.
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        Self::new(
            &config.base_url,
            config.token.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Replaces the bearer token, e.g. after signing in again.
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    /// The base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Appends path segments to the base URL, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| invalid_base_url(self.base_url.as_str()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.authorize(request).send().await?;
        debug!(status = response.status().as_u16(), url = %response.url(), "backend response");
        Ok(response)
    }

    async fn handle_response(&self, response: Response) -> Result<JsonValue> {
        let status = response.status();

        if status.is_success() {
            let text = response.text().await?;
            if text.trim().is_empty() {
                Ok(JsonValue::Null)
            } else {
                Ok(serde_json::from_str(&text)?)
            }
        } else if status == StatusCode::NOT_FOUND {
            Err(SgmError::NotFound(response.url().path().to_string()))
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(SgmError::RequestFailed {
                status: status.as_u16(),
                message: error_message(&text),
            })
        }
    }
}

fn invalid_base_url(base_url: &str) -> SgmError {
    SgmError::Validation {
        field: "base_url".to_string(),
        message: format!("{base_url:?} is not an absolute http(s) URL"),
    }
}

/// Prefers the `message` field of a JSON error body over the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<JsonValue>(body)
        .ok()
        .and_then(|value| value.get("message")?.as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl ResourceClient for HttpResourceClient {
    async fn list(&self, resource: &str) -> Result<Vec<JsonValue>> {
        let response = self.send(self.client.get(self.url(&[resource])?)).await?;
        let body = self.handle_response(response).await?;
        unwrap_list(resource, body)
    }

    async fn create(&self, resource: &str, body: &JsonValue) -> Result<JsonValue> {
        let response = self
            .send(self.client.post(self.url(&[resource])?).json(body))
            .await?;
        self.handle_response(response).await
    }

    async fn update(&self, resource: &str, id: &str, body: &JsonValue) -> Result<JsonValue> {
        let response = self
            .send(self.client.put(self.url(&[resource, id])?).json(body))
            .await?;
        self.handle_response(response).await
    }

    async fn delete(&self, resource: &str, id: &str) -> Result<()> {
        let response = self
            .send(self.client.delete(self.url(&[resource, id])?))
            .await?;
        self.handle_response(response).await.map(|_| ())
    }

    async fn apply_transition(
        &self,
        resource: &str,
        id: &str,
        endpoint_suffix: &str,
    ) -> Result<JsonValue> {
        let url = self.url(&[resource, id, endpoint_suffix])?;
        let response = self.send(self.client.post(url)).await?;
        self.handle_response(response).await
    }
}
