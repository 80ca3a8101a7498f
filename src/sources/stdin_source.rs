//! Stdin trigger source.
//!
//! Reads newline-delimited trigger records from standard input, e.g.:
//!     echo '{"component":"btn","trigger":"onClick"}' | pageflow --page page.json
//!
//! EOF, a closed channel or cancellation ends the task.

use serde_json::Value;
use tokio::{
    io::{self, BufReader},
    sync::mpsc::Sender,
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{Forwarded, TriggerSource, forward_lines};

#[derive(Debug, Clone, Default)]
pub struct StdinSource;

impl StdinSource {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl TriggerSource for StdinSource {
    fn name(&self) -> &'static str {
        "stdin"
    }

    fn start(&self, sender: Sender<Value>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(target: "pageflow::sources", "StdinSource task started (reading lines)");
            let reader = BufReader::new(io::stdin());
            match forward_lines(reader, &sender, &cancel, "stdin").await {
                Forwarded::Eof(sent) => {
                    info!(target: "pageflow::sources", sent, "EOF on stdin; StdinSource exiting");
                }
                Forwarded::Stopped(sent) => {
                    info!(target: "pageflow::sources", sent, "StdinSource stopped");
                }
            }
        })
    }
}
