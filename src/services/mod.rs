/*!
External collaborators the action engine calls into.

The engine never talks to the network, the router or the UI directly. It goes
through the traits defined here, so a host (browser shell, CLI, test) can plug in
its own implementations:

- `HttpClient`   -> used exclusively by `callApi`
- `Navigator`    -> in-app route changes (`navigate` without `openInNewTab`)
- `WindowOpener` -> opens a URL in a new browsing context, bypassing the router
- `Notifier`     -> toast notifications
- `ModalBus`     -> typed in-process publish/subscribe channel for modals
- `UrlNormalizer`-> pure URL reconciliation before navigation

Concrete implementations live in their own files:

- `http.rs`    -> `ReqwestHttpClient`, `DryRunHttpClient`
- `console.rs` -> tracing-backed navigator, window opener and notifier
- `modal.rs`   -> `ModalBus` / `ModalEvent`
- `url.rs`     -> `UrlNormalizer`
*/

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{HttpMethod, ToastKind};

pub mod console;
pub mod http;
pub mod modal;
pub mod url;

#[cfg(test)]
pub(crate) mod testing;

pub use console::{TracingNavigator, TracingNotifier, TracingWindowOpener};
pub use http::{DryRunHttpClient, ReqwestHttpClient};
pub use modal::{ModalBus, ModalEvent};
pub use url::UrlNormalizer;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpResponse {
    pub status: u16,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HttpError {
    /// The server answered with a non-success status.
    #[error("{}", status_message(.status, .body))]
    Status { status: u16, body: Value },
    /// The request never produced a response.
    #[error("{0}")]
    Transport(String),
}

/// Prefer the server's own `message`, like most REST error payloads carry.
fn status_message(status: &u16, body: &Value) -> String {
    body.get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Request failed with status code {status}"))
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

/// In-app router.
pub trait Navigator: Send + Sync {
    fn push(&self, url: &str);
}

/// Opens a URL in a new browsing context.
pub trait WindowOpener: Send + Sync {
    fn open(&self, url: &str);
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToastOptions {
    pub title: Option<String>,
    pub duration: Option<Duration>,
}

/// Toast notification surface.
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str, options: &ToastOptions);
    fn error(&self, message: &str, options: &ToastOptions);
    fn warning(&self, message: &str, options: &ToastOptions);
    fn info(&self, message: &str, options: &ToastOptions);

    fn notify(&self, kind: ToastKind, message: &str, options: &ToastOptions) {
        match kind {
            ToastKind::Success => self.success(message, options),
            ToastKind::Error => self.error(message, options),
            ToastKind::Warning => self.warning(message, options),
            ToastKind::Info => self.info(message, options),
        }
    }
}

/// The full set of collaborators handed to the executor.
#[derive(Clone)]
pub struct Services {
    pub http: Arc<dyn HttpClient>,
    pub navigator: Arc<dyn Navigator>,
    pub window: Arc<dyn WindowOpener>,
    pub notifier: Arc<dyn Notifier>,
    pub modals: ModalBus,
    pub urls: UrlNormalizer,
}

impl Services {
    /// Collaborators that log through `tracing`, with the given HTTP client.
    pub fn console(http: Arc<dyn HttpClient>, urls: UrlNormalizer) -> Self {
        Self {
            http,
            navigator: Arc::new(TracingNavigator),
            window: Arc::new(TracingWindowOpener),
            notifier: Arc::new(TracingNotifier),
            modals: ModalBus::default(),
            urls,
        }
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("modals", &self.modals)
            .field("urls", &self.urls)
            .finish_non_exhaustive()
    }
}
