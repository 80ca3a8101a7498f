use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use pageflow::config as cfg;
use pageflow::executor::{DetachedActions, Runtime};
use pageflow::services::{
    DryRunHttpClient, HttpClient, ModalBus, ReqwestHttpClient, Services, UrlNormalizer,
};
use pageflow::sources;

/// Pageflow CLI
#[derive(Debug, Parser)]
#[command(
    name = pageflow::PKG_NAME,
    version = pageflow::PKG_VERSION,
    about = "Run a low-code page definition and dispatch component triggers to its actions"
)]
struct Args {
    /// Path to the JSON page definition
    #[arg(short = 'p', long = "page", default_value = "page.json")]
    page: PathBuf,

    /// Enable dry-run mode (log API calls instead of sending them)
    #[arg(long = "dry-run")]
    dry_run: bool,

    /// Base URL for relative API paths. Overrides `settings.baseUrl`.
    #[arg(long = "base-url")]
    base_url: Option<String>,

    /// Set log level (e.g., trace, debug, info, warn, error). Overrides RUST_LOG.
    #[arg(long = "log-level")]
    log_level: Option<String>,

    /// Print the JSON Schema for the page definition and exit
    #[arg(long = "print-schema")]
    print_schema: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.log_level.as_deref() {
        Some(level) => pageflow::init_tracing_with_level(pageflow::parse_level(level)),
        None => pageflow::init_tracing(),
    }

    if args.print_schema {
        cfg::write_schema_to_writer(std::io::stdout().lock())?;
        println!();
        return Ok(());
    }

    info!(
        version = pageflow::PKG_VERSION,
        page = %args.page.display(),
        dry_run = args.dry_run,
        "Starting pageflow"
    );

    let page = cfg::load_from_path_async(&args.page).await?;
    debug!(target: "pageflow", "Page definition loaded successfully");

    let base_url = args
        .base_url
        .as_deref()
        .or(page.settings.base_url.as_deref())
        .map(Url::parse)
        .transpose()
        .context("Invalid base URL")?;
    let http: Arc<dyn HttpClient> = if args.dry_run {
        Arc::new(DryRunHttpClient)
    } else {
        Arc::new(ReqwestHttpClient::new(base_url))
    };
    let urls = UrlNormalizer::new(page.settings.locale.clone(), page.settings.locales.clone());
    let services = Services::console(http, urls);

    let cancel = CancellationToken::new();
    spawn_modal_logger(&services.modals, cancel.child_token());

    let runtime = Runtime::new(page, services);
    let mut pending = DetachedActions::new();
    for (component, mut run) in runtime.load().await {
        if !run.success {
            warn!(%component, "onLoad sequence aborted");
        }
        pending.track(&mut run);
    }

    let sources = sources::build_sources_from_page(runtime.page());
    let (tx, mut rx) = mpsc::channel::<Value>(256);
    let _handles = sources::spawn_all_sources(&sources, tx, &cancel);

    // Main loop: dispatch triggers until every source is done or Ctrl+C
    let finished = tokio::select! {
        _ = async {
            while let Some(record) = rx.recv().await {
                match runtime.dispatch_value(&record).await {
                    Ok(Some(mut run)) => {
                        if !run.success {
                            warn!(record = %record, "Action sequence aborted");
                        }
                        pending.track(&mut run);
                    }
                    Ok(None) => {}
                    Err(err) => {
                        error!(error = %err, record = %record, "Failed to handle trigger");
                    }
                }
            }
        } => true,
        _ = tokio::signal::ctrl_c() => false,
    };

    if finished {
        info!(pending = pending.len(), "All trigger sources finished");
        let failed = pending.join_all().await.iter().filter(|r| !r.success).count();
        if failed > 0 {
            warn!(failed, "Some background actions failed");
        }
    } else {
        info!(abandoned = pending.len(), "Received Ctrl+C, shutting down");
        pending.abort_all();
    }

    cancel.cancel();
    info!("pageflow exited");
    Ok(())
}

/// Log every modal request; there is no modal host in the CLI.
fn spawn_modal_logger(bus: &ModalBus, cancel: CancellationToken) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                msg = rx.recv() => match msg {
                    Ok(event) => info!(target: "pageflow::modal", ?event, "Modal request"),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(target: "pageflow::modal", skipped, "Modal logger lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    });
}
