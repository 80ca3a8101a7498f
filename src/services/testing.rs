//! Recording collaborators for unit tests.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::{
    HttpClient, HttpError, HttpRequest, HttpResponse, ModalBus, Navigator, Notifier, Services,
    ToastOptions, UrlNormalizer, WindowOpener,
};
use crate::config::ToastKind;

type RequestHook = Box<dyn Fn(&HttpRequest) + Send + Sync>;

/// Answers from a queue (default `200 null`) and records every request.
#[derive(Default)]
pub struct ScriptedHttp {
    pub requests: Mutex<Vec<HttpRequest>>,
    responses: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
    hook: Mutex<Option<RequestHook>>,
}

impl ScriptedHttp {
    pub fn push_ok(&self, status: u16, data: Value) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(HttpResponse { status, data }));
    }

    pub fn push_err(&self, err: HttpError) {
        self.responses.lock().unwrap().push_back(Err(err));
    }

    /// Run `hook` while each request is in flight.
    pub fn on_request(&self, hook: impl Fn(&HttpRequest) + Send + Sync + 'static) {
        *self.hook.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for ScriptedHttp {
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        if let Some(hook) = self.hook.lock().unwrap().as_ref() {
            hook(&request);
        }
        self.requests.lock().unwrap().push(request);
        // Resolve after one scheduler tick, like a real network call.
        tokio::task::yield_now().await;
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(HttpResponse {
                status: 200,
                data: Value::Null,
            }))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub toasts: Mutex<Vec<(ToastKind, String, ToastOptions)>>,
}

impl RecordingNotifier {
    fn record(&self, kind: ToastKind, message: &str, options: &ToastOptions) {
        self.toasts
            .lock()
            .unwrap()
            .push((kind, message.to_string(), options.clone()));
    }

    pub fn toasts(&self) -> Vec<(ToastKind, String, ToastOptions)> {
        self.toasts.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn success(&self, message: &str, options: &ToastOptions) {
        self.record(ToastKind::Success, message, options);
    }
    fn error(&self, message: &str, options: &ToastOptions) {
        self.record(ToastKind::Error, message, options);
    }
    fn warning(&self, message: &str, options: &ToastOptions) {
        self.record(ToastKind::Warning, message, options);
    }
    fn info(&self, message: &str, options: &ToastOptions) {
        self.record(ToastKind::Info, message, options);
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    pub pushed: Mutex<Vec<String>>,
    pub opened: Mutex<Vec<String>>,
}

impl Navigator for RecordingNavigator {
    fn push(&self, url: &str) {
        self.pushed.lock().unwrap().push(url.to_string());
    }
}

impl WindowOpener for RecordingNavigator {
    fn open(&self, url: &str) {
        self.opened.lock().unwrap().push(url.to_string());
    }
}

/// Handles to the recorders behind a test `Services`.
pub struct Recorders {
    pub http: Arc<ScriptedHttp>,
    pub notifier: Arc<RecordingNotifier>,
    pub navigator: Arc<RecordingNavigator>,
}

pub fn recording_services() -> (Services, Recorders) {
    let http = Arc::new(ScriptedHttp::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let navigator = Arc::new(RecordingNavigator::default());
    let services = Services {
        http: http.clone(),
        navigator: navigator.clone(),
        window: navigator.clone(),
        notifier: notifier.clone(),
        modals: ModalBus::default(),
        urls: UrlNormalizer::default(),
    };
    (
        services,
        Recorders {
            http,
            notifier,
            navigator,
        },
    )
}
