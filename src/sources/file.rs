//! File trigger source.
//!
//! Polls a single file path for newline-delimited trigger records at a fixed interval.
//!
//! Behavior:
//! - `delete_on_success = true`: every poll that finds records dispatches them all and
//!   deletes the file, so producers append to a fresh file each time.
//! - `delete_on_success = false`: the file is dispatched again only when its
//!   (length, mtime_seconds) signature changes.
//! - Missing and whitespace-only files are ignored quietly.
//!
//! The task ends when the channel closes or the cancellation token fires.

use std::fs;
use std::time::{Duration, SystemTime};

use serde_json::Value;
use tokio::{
    fs as afs,
    io::BufReader,
    sync::mpsc::Sender,
    task::JoinHandle,
    time::{Instant, sleep_until},
};
use tokio_util::sync::CancellationToken;
use tracing::{info, trace, warn};

use super::{Forwarded, TriggerSource, forward_lines};

const DEFAULT_POLL_MS: u64 = 100;
const MIN_POLL_MS: u64 = 10;

#[derive(Debug, Clone)]
pub struct FileSource {
    path: String,
    poll_ms: u64,
    delete_on_success: bool,
}

impl FileSource {
    /// `poll_ms` defaults to 100ms and is clamped to at least 10ms.
    pub fn new(path: String, poll_ms: Option<u64>, delete_on_success: Option<bool>) -> Self {
        Self {
            path,
            poll_ms: poll_ms.unwrap_or(DEFAULT_POLL_MS).max(MIN_POLL_MS),
            delete_on_success: delete_on_success.unwrap_or(false),
        }
    }

    fn file_signature(meta: &fs::Metadata) -> (u64, u64) {
        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0);
        (meta.len(), mtime)
    }
}

impl TriggerSource for FileSource {
    fn name(&self) -> &'static str {
        "file"
    }

    fn start(&self, sender: Sender<Value>, cancel: CancellationToken) -> JoinHandle<()> {
        let FileSource {
            path,
            poll_ms,
            delete_on_success,
        } = self.clone();

        tokio::spawn(async move {
            info!(
                target: "pageflow::sources",
                %path, poll_ms, delete_on_success,
                "FileSource task started"
            );

            let interval = Duration::from_millis(poll_ms);
            let mut last_sig: Option<(u64, u64)> = None;
            let mut next_tick = Instant::now();

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = sleep_until(next_tick) => {}
                }
                next_tick += interval;

                let meta = match fs::metadata(&path) {
                    Ok(m) if m.is_file() => m,
                    Ok(_) => {
                        warn!(target: "pageflow::sources", %path, "Path exists but is not a regular file");
                        continue;
                    }
                    Err(_) => continue,
                };

                let sig = Self::file_signature(&meta);
                if !delete_on_success && last_sig == Some(sig) {
                    trace!(target: "pageflow::sources", %path, "File unchanged; skipping");
                    continue;
                }

                let content = match afs::read(&path).await {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!(target: "pageflow::sources", %path, error = %e, "Failed to read file");
                        continue;
                    }
                };
                if content.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }

                let sent = match forward_lines(BufReader::new(content.as_slice()), &sender, &cancel, &path).await {
                    Forwarded::Eof(sent) => sent,
                    Forwarded::Stopped(_) => break,
                };
                info!(target: "pageflow::sources", %path, sent, "Dispatched trigger records from file");

                if delete_on_success {
                    if let Err(e) = afs::remove_file(&path).await {
                        warn!(target: "pageflow::sources", %path, error = %e, "Failed to delete file after dispatch");
                    }
                } else {
                    last_sig = Some(sig);
                }
            }

            info!(target: "pageflow::sources", %path, "FileSource task ended");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc;

    #[test]
    fn poll_interval_defaults_and_minimum() {
        assert_eq!(FileSource::new("x".into(), None, None).poll_ms, 100);
        assert_eq!(FileSource::new("x".into(), Some(1), None).poll_ms, 10);
    }

    #[tokio::test]
    async fn dispatches_records_and_deletes_the_file() {
        let path = std::env::temp_dir().join(format!("pageflow-triggers-{}.ndjson", std::process::id()));
        fs::write(
            &path,
            "{\"component\":\"a\",\"trigger\":\"onClick\"}\n{\"component\":\"b\",\"trigger\":\"onLoad\"}\n",
        )
        .unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let source = FileSource::new(path.to_string_lossy().into_owned(), Some(10), Some(true));
        let handle = source.start(tx, cancel.clone());

        assert_eq!(rx.recv().await.unwrap()["component"], json!("a"));
        assert_eq!(rx.recv().await.unwrap()["component"], json!("b"));

        cancel.cancel();
        handle.await.unwrap();
        assert!(!path.exists());
    }
}
