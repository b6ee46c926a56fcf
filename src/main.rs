//! feedscrape command-line interface
//!
//! Thin wrapper over [`Spider`]: every subcommand streams the spider's log
//! entries to stdout while it runs.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use feedscrape::{CrawlOutcome, LogEntry, Spider, SpiderConfig, StatusEvent};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Crawl an authenticated profile feed and export its posts as CSV
#[derive(Parser, Debug)]
#[command(name = "feedscrape", version, about, long_about = None)]
struct Cli {
    /// Directory holding the session blob and exported files
    /// [default: $FEEDSCRAPE_ASSETS_DIR, then the local data dir]
    #[arg(long, global = true, value_name = "DIR")]
    assets_dir: Option<PathBuf>,

    /// Base URL of the feed service
    #[arg(long, global = true, value_name = "URL")]
    base_url: Option<String>,

    /// Run crawl windows headless (login and link checks are always visible)
    #[arg(long, global = true)]
    headless: bool,

    /// Give up on a page after this many retries
    #[arg(long, global = true, value_name = "N", conflicts_with = "unbounded_retries")]
    max_retries: Option<u32>,

    /// Retry a failing page until cancelled
    #[arg(long, global = true)]
    unbounded_retries: bool,

    /// Seconds to wait for a manual login
    #[arg(long, global = true, value_name = "SECS")]
    login_timeout: Option<u64>,

    /// Seconds to wait for a feed page to finish loading
    #[arg(long, global = true, value_name = "SECS")]
    page_timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open a browser window and capture the session after you log in
    Login,
    /// Delete the persisted session
    Logout,
    /// Crawl pages 1..=PAGES of TARGET's feed
    Crawl {
        target: String,
        pages: u32,
        /// Also copy the artifact here
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },
    /// Open a profile in a visible window; Ctrl-C closes it
    CheckLink { link: String },
    /// Copy an exported file (default destination: ./spider.csv)
    Export { src: PathBuf, dest: Option<PathBuf> },
    /// Show session state and exported files
    Status,
}

fn build_config(cli: &Cli) -> Result<SpiderConfig> {
    let mut builder = match &cli.assets_dir {
        Some(dir) => SpiderConfig::builder().assets_dir(dir.clone()),
        None => SpiderConfig::builder().assets_dir_from_env()?,
    };
    if let Some(url) = &cli.base_url {
        builder = builder.feed_base_url(url.clone());
    }
    builder = builder.headless(cli.headless);
    if cli.unbounded_retries {
        builder = builder.max_page_retries(None);
    } else if let Some(n) = cli.max_retries {
        builder = builder.max_page_retries(Some(n));
    }
    if let Some(secs) = cli.login_timeout {
        builder = builder.login_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = cli.page_timeout {
        builder = builder.page_ready_timeout(Duration::from_secs(secs));
    }
    builder.build()
}

fn print_entry(entry: &LogEntry) {
    println!(
        "#{} [{}] {} ({})",
        entry.sequence,
        entry.timestamp.format("%Y.%m.%d %H:%M:%S"),
        entry.message,
        entry.detail.as_deref().unwrap_or("no further detail")
    );
}

/// Print log entries as they arrive
///
/// Entries missed by a lagging receiver are printed from history by
/// [`flush_log`].
fn spawn_log_printer(spider: &Spider, printed: Arc<AtomicU64>) -> JoinHandle<()> {
    let mut rx = spider.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(StatusEvent::Log(entry)) => {
                    print_entry(&entry);
                    printed.store(entry.sequence, Ordering::Release);
                }
                Ok(StatusEvent::Ready { path, row_count }) => {
                    println!("Ready: {row_count} rows in {}", path.display());
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Log printer skipped {skipped} events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

async fn flush_log(spider: &Spider, printer: JoinHandle<()>, printed: &AtomicU64) {
    // Let the printer drain what is already queued before taking over
    tokio::task::yield_now().await;
    printer.abort();
    let _ = printer.await;
    let last = printed.load(Ordering::Acquire);
    for entry in spider.status().history().iter().filter(|e| e.sequence > last) {
        print_entry(entry);
    }
}

async fn run(spider: &Spider, command: Command) -> Result<()> {
    match command {
        Command::Login => {
            spider.authenticate().await?;
        }
        Command::Logout => {
            spider.logout().await?;
        }
        Command::Crawl { target, pages, out } => {
            let mut handle = spider.start_crawl(&target, pages).await?;
            let outcome = tokio::select! {
                joined = &mut handle => joined.context("crawl task failed")?,
                _ = tokio::signal::ctrl_c() => {
                    spider.cancel();
                    handle.await.context("crawl task failed")?
                }
            };
            match outcome {
                CrawlOutcome::Completed(artifact) => {
                    if let Some(out) = out {
                        spider.export_artifact(&artifact.path, Some(&out)).await?;
                    }
                }
                CrawlOutcome::PreconditionFailed(e) => anyhow::bail!("crawl not started: {e}"),
                CrawlOutcome::AbortedFatal { page, reason } => {
                    anyhow::bail!("crawl aborted at page {page}: {reason}")
                }
                CrawlOutcome::Cancelled { page } => anyhow::bail!("crawl cancelled at page {page}"),
                CrawlOutcome::ExportFailed { failure, buffer } => anyhow::bail!(
                    "export failed with {} records buffered: {failure}",
                    buffer.len()
                ),
            }
        }
        Command::CheckLink { link } => {
            let surface = spider.validate_target_link(&link).await?;
            println!("Press Ctrl-C to close the window");
            tokio::signal::ctrl_c().await?;
            surface.close().await?;
        }
        Command::Export { src, dest } => {
            spider.export_artifact(&src, dest.as_deref()).await?;
        }
        Command::Status => {
            let config = spider.config();
            println!("Assets:  {}", config.assets_dir().display());
            println!(
                "Session: {}",
                if spider.has_session().await {
                    "present"
                } else {
                    "absent, run `feedscrape login`"
                }
            );
            let artifacts = spider.list_artifacts().await?;
            println!("Exports: {}", artifacts.len());
            for path in artifacts {
                println!("  {}", path.display());
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("warn".parse()?))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    let spider = Spider::new(config);

    let printed = Arc::new(AtomicU64::new(0));
    let printer = spawn_log_printer(&spider, Arc::clone(&printed));

    let result = run(&spider, cli.command).await;

    if let Err(e) = spider.shutdown().await {
        tracing::warn!("Shutdown incomplete: {e}");
    }
    flush_log(&spider, printer, &printed).await;
    result
}
