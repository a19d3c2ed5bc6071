//! docops-agent: applies coordinator batches to a SQLite-backed document.
//!
//! Runs the push socket, the pull loop, or both, against one document.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use docops::{
    config::AgentConfig,
    core::{dedup::DedupFilter, marker::completed_jobs},
    document::MemoryDocument,
    persist::sqlite::SqliteDocumentSink,
    transport::{
        pull::{HttpCoordinator, PullAdapter},
        push::{PushAdapter, user_socket_url},
        session::Session,
    },
};

#[derive(Parser, Debug)]
#[command(name = "docops-agent")]
#[command(about = "Applies remote document-edit batches")]
struct Args {
    /// JSON config file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Document identity (claim scope for pulled jobs)
    #[arg(long)]
    doc_url: Option<String>,

    /// SQLite file for document saves
    #[arg(long)]
    db: Option<PathBuf>,

    /// Push socket URL, or the socket origin when --email is given
    #[arg(long)]
    push_url: Option<String>,

    /// User whose push socket to join
    #[arg(long)]
    email: Option<String>,

    /// Coordinator origin for the pull loop
    #[arg(long)]
    pull_url: Option<String>,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,
}

fn load_config(args: &Args) -> Result<AgentConfig> {
    let mut config = match &args.config {
        Some(path) => AgentConfig::load(path).context("loading config")?,
        None => AgentConfig::default(),
    };

    if let Some(url) = &args.doc_url {
        config.document.url = url.clone();
    }
    if let Some(db) = &args.db {
        config.document.sqlite_path = Some(db.clone());
    }
    if let Some(url) = &args.push_url {
        config.push.url = match &args.email {
            Some(email) => user_socket_url(url, email),
            None => url.clone(),
        };
    }
    if let Some(url) = &args.pull_url {
        config.pull.base_url = url.clone();
    }
    Ok(config)
}

fn open_document(config: &AgentConfig) -> Result<MemoryDocument> {
    let doc_cfg = &config.document;
    let mut doc = match &doc_cfg.sqlite_path {
        Some(path) => {
            let mut sink = SqliteDocumentSink::open(path)
                .with_context(|| format!("opening {}", path.display()))?;
            if let Some(keep) = doc_cfg.retain_snapshots {
                sink = sink.with_retention(keep);
            }
            MemoryDocument::open(doc_cfg.url.clone(), Box::new(sink)).context("loading document")?
        }
        None => MemoryDocument::new(doc_cfg.url.clone()),
    };
    for style in &doc_cfg.styles {
        doc = doc.with_style(style.clone());
    }
    Ok(doc)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins; otherwise info, or debug with --verbose
    let default_filter = if args.verbose {
        "debug,docops=debug"
    } else {
        "info,docops=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = load_config(&args)?;
    if !config.push_enabled() && !config.pull_enabled() {
        bail!("nothing to run: configure a push url, a pull url, or both");
    }

    let doc = open_document(&config)?;
    let done = completed_jobs(&doc);
    info!(
        url = %config.document.url,
        paragraphs = doc.paragraphs().len(),
        completed_jobs = done.len(),
        "document loaded"
    );

    let session = Session::new(Box::new(doc), DedupFilter::from_config(&config.dedup));
    let doc_handle = session.document();

    let mut events = session.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => debug!(?event, "document event"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event log lagging"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let pull = config.pull_enabled().then(|| {
        PullAdapter::new(
            HttpCoordinator::new(config.pull.base_url.clone()),
            doc_handle.clone(),
            config.claim_url(),
            config.backoff,
        )
    });
    let mut push = config
        .push_enabled()
        .then(|| PushAdapter::new(config.push.clone(), session));

    let push_loop = async {
        match push.as_mut() {
            Some(adapter) => adapter.run().await,
            None => std::future::pending::<()>().await,
        }
    };
    let pull_loop = async {
        match &pull {
            Some(adapter) => adapter.run().await,
            None => std::future::pending::<()>().await,
        }
    };

    info!(push = config.push_enabled(), pull = config.pull_enabled(), "agent running, Ctrl+C to stop");
    tokio::select! {
        _ = push_loop => {}
        _ = pull_loop => {}
        _ = tokio::signal::ctrl_c() => info!("shutdown signal received"),
    }

    // Let queued batches finish, then commit once more.
    if let Err(err) = doc_handle.submit("shutdown-save", |m| m.save()).wait().await {
        warn!(error = %err, "final save failed");
    }
    info!("shutting down");
    Ok(())
}
