//! HTTP collaborators.
//!
//! - `ReqwestHttpClient` issues real requests, resolving relative paths against an
//!   optional base URL. Non-2xx answers become `HttpError::Status` carrying the
//!   decoded body; connection problems become `HttpError::Transport`.
//! - `DryRunHttpClient` only logs the request and answers `200` with a `null` body.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info, trace};
use url::Url;

use super::{HttpClient, HttpError, HttpRequest, HttpResponse};
use crate::config::HttpMethod;

#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
    base_url: Option<Url>,
}

impl ReqwestHttpClient {
    pub fn new(base_url: Option<Url>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    fn resolve(&self, path: &str) -> Result<Url, HttpError> {
        if let Ok(absolute) = Url::parse(path) {
            return Ok(absolute);
        }
        let base = self
            .base_url
            .as_ref()
            .ok_or_else(|| HttpError::Transport(format!("relative URL '{path}' without a base URL")))?;
        base.join(path)
            .map_err(|e| HttpError::Transport(format!("invalid URL '{path}': {e}")))
    }
}

fn map_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

/// JSON when possible, raw text otherwise, `null` for an empty body.
fn decode_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let url = self.resolve(&request.url)?;
        debug!(target: "pageflow::http", method = request.method.as_str(), %url, "Sending request");

        let mut builder = self.client.request(map_method(request.method), url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| HttpError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| HttpError::Transport(e.to_string()))?;
        let data = decode_body(&text);
        trace!(target: "pageflow::http", status = status.as_u16(), "Response received");

        if status.is_success() {
            Ok(HttpResponse {
                status: status.as_u16(),
                data,
            })
        } else {
            Err(HttpError::Status {
                status: status.as_u16(),
                body: data,
            })
        }
    }
}

/// Logs requests instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct DryRunHttpClient;

#[async_trait]
impl HttpClient for DryRunHttpClient {
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        info!(
            target: "pageflow::http",
            method = request.method.as_str(),
            url = %request.url,
            body = ?request.body,
            "DRY-RUN request"
        );
        Ok(HttpResponse {
            status: 200,
            data: Value::Null,
        })
    }
}
