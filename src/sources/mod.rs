/*!
Trigger sources (orchestration layer).

This module defines the `TriggerSource` trait and the orchestration helpers
(`build_sources_from_page`, `spawn_all_sources`). Concrete implementations live in
their own files:

- `file.rs`         -> `FileSource`  (poll a file of newline-delimited trigger records)
- `stdin_source.rs` -> `StdinSource` (newline-delimited trigger records from standard input)

Each source:
- Parses raw lines into `serde_json::Value` (the runtime validates the record shape)
- Pushes values via `Sender<Value>`, respecting backpressure (`send().await`)
- Logs errors and continues, never panicking inside tasks
- Stops when the channel closes or the cancellation token fires
*/

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{info, trace, warn};

use crate::config::{PageDefinition, SourceConfig};

pub mod file;
pub mod stdin_source;

pub use file::FileSource;
pub use stdin_source::StdinSource;

/// Trait implemented by all trigger sources.
pub trait TriggerSource: Send + Sync {
    /// Static human-readable identifier (used in logs).
    fn name(&self) -> &'static str;

    /// Start the source in the background.
    fn start(&self, sender: Sender<Value>, cancel: CancellationToken) -> JoinHandle<()>;
}

/// Construct all configured sources. An empty list yields a single stdin source.
pub fn build_sources_from_page(page: &PageDefinition) -> Vec<Box<dyn TriggerSource>> {
    if page.sources.is_empty() {
        return vec![Box::new(StdinSource::new())];
    }

    page.sources
        .iter()
        .map(|sc| -> Box<dyn TriggerSource> {
            match sc {
                SourceConfig::File {
                    path,
                    poll_ms,
                    delete_on_success,
                } => Box::new(FileSource::new(path.clone(), *poll_ms, *delete_on_success)),
                SourceConfig::Stdin => Box::new(StdinSource::new()),
            }
        })
        .collect()
}

/// Spawn every source, returning their `JoinHandle`s.
pub fn spawn_all_sources(
    sources: &[Box<dyn TriggerSource>],
    sender: Sender<Value>,
    cancel: &CancellationToken,
) -> Vec<JoinHandle<()>> {
    sources
        .iter()
        .map(|src| {
            info!(
                target: "pageflow::sources",
                source = %src.name(),
                "Starting source task"
            );
            src.start(sender.clone(), cancel.child_token())
        })
        .collect()
}

/// How a line-forwarding loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forwarded {
    /// Input exhausted; carries the number of records sent.
    Eof(usize),
    /// Receiver dropped or cancellation requested.
    Stopped(usize),
}

/// Forward every non-empty JSON line of `reader` into `sender`.
///
/// Malformed lines are logged and skipped.
pub async fn forward_lines<R>(
    mut reader: R,
    sender: &Sender<Value>,
    cancel: &CancellationToken,
    origin: &str,
) -> Forwarded
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let mut sent = 0;

    loop {
        line.clear();
        let read = tokio::select! {
            _ = cancel.cancelled() => return Forwarded::Stopped(sent),
            read = reader.read_line(&mut line) => read,
        };
        match read {
            Ok(0) => return Forwarded::Eof(sent),
            Ok(_) => {
                let raw = line.trim();
                if raw.is_empty() {
                    continue;
                }
                match serde_json::from_str::<Value>(raw) {
                    Ok(value) => {
                        trace!(target: "pageflow::sources", %origin, "Parsed trigger record");
                        if sender.send(value).await.is_err() {
                            return Forwarded::Stopped(sent);
                        }
                        sent += 1;
                    }
                    Err(e) => {
                        warn!(
                            target: "pageflow::sources",
                            %origin, error = %e, line = raw,
                            "Failed to parse trigger record"
                        );
                    }
                }
            }
            Err(e) => {
                warn!(target: "pageflow::sources", %origin, error = %e, "Read error; stopping");
                return Forwarded::Eof(sent);
            }
        }
    }
}
