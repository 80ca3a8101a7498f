use tracing::{error, info, warn};

use super::{Navigator, Notifier, ToastOptions, WindowOpener};

/// Logs route changes instead of performing them.
#[derive(Debug, Clone, Default)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn push(&self, url: &str) {
        info!(target: "pageflow::navigate", %url, "Route push");
    }
}

#[derive(Debug, Clone, Default)]
pub struct TracingWindowOpener;

impl WindowOpener for TracingWindowOpener {
    fn open(&self, url: &str) {
        info!(target: "pageflow::navigate", %url, "Open in new tab");
    }
}

/// Renders toasts as log lines at a matching level.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn success(&self, message: &str, options: &ToastOptions) {
        info!(target: "pageflow::toast", kind = "success", title = ?options.title, duration = ?options.duration, "{message}");
    }

    fn error(&self, message: &str, options: &ToastOptions) {
        error!(target: "pageflow::toast", kind = "error", title = ?options.title, duration = ?options.duration, "{message}");
    }

    fn warning(&self, message: &str, options: &ToastOptions) {
        warn!(target: "pageflow::toast", kind = "warning", title = ?options.title, duration = ?options.duration, "{message}");
    }

    fn info(&self, message: &str, options: &ToastOptions) {
        info!(target: "pageflow::toast", kind = "info", title = ?options.title, duration = ?options.duration, "{message}");
    }
}
