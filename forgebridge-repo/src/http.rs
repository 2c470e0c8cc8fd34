//! HTTP primitive used by the forge adapters
//!
//! Non-success statuses are returned as values so callers can react to 404 specifically;
//! only transport failures become errors.

use async_trait::async_trait;
use forgebridge_core::{ErrorContext, ForgeError, ForgeResult};
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Status and decoded body of one forge response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Parsed JSON body; non-JSON text is kept as a JSON string, an empty body is `null`
    pub body: Value,
}

impl HttpResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    /// Convert a non-success response into an upstream error
    pub fn into_error(self, component: &str, operation: &str) -> ForgeError {
        let message = match &self.body {
            Value::Object(map) => map
                .get("message")
                .or_else(|| map.get("error"))
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                }),
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
        .unwrap_or_else(|| {
            reqwest::StatusCode::from_u16(self.status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("Unknown error")
                .to_string()
        });

        ForgeError::Upstream {
            status: self.status,
            message,
            context: ErrorContext::new(component)
                .with_operation(operation)
                .with_suggestion(match self.status {
                    401 => "Check your access token",
                    403 => "Check repository permissions or rate limits",
                    404 => "Resource not found or not accessible",
                    _ => "Check network connectivity and API status",
                }),
        }
    }
}

/// The outbound HTTP calls the adapters rely on
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(
        &self,
        url: &str,
        headers: &HeaderMap,
        query: &[(&str, String)],
    ) -> ForgeResult<HttpResponse>;

    async fn post(&self, url: &str, headers: &HeaderMap, body: &Value)
        -> ForgeResult<HttpResponse>;
}

/// `HttpClient` backed by reqwest
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new(timeout_seconds: u64) -> ForgeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| ForgeError::Network {
                message: format!("Failed to create HTTP client: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("http_client").with_operation("create_client"),
            })?;

        Ok(Self { client })
    }

    async fn read_response(response: reqwest::Response) -> ForgeResult<HttpResponse> {
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| network_error(e, "read_body"))?;

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        Ok(HttpResponse { status, body })
    }
}

fn network_error(e: reqwest::Error, operation: &str) -> ForgeError {
    ForgeError::Network {
        message: e.to_string(),
        source: Some(Box::new(e)),
        context: ErrorContext::new("http_client")
            .with_operation(operation)
            .with_suggestion("Check network connectivity and API status"),
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(
        &self,
        url: &str,
        headers: &HeaderMap,
        query: &[(&str, String)],
    ) -> ForgeResult<HttpResponse> {
        debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(url)
            .headers(headers.clone())
            .query(query)
            .send()
            .await
            .map_err(|e| network_error(e, "get"))?;

        Self::read_response(response).await
    }

    async fn post(
        &self,
        url: &str,
        headers: &HeaderMap,
        body: &Value,
    ) -> ForgeResult<HttpResponse> {
        debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .headers(headers.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| network_error(e, "post"))?;

        Self::read_response(response).await
    }
}
