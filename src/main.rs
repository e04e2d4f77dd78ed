//! InstaBatch command-line entry point

use std::io::{self, Read, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use instabatch::downloader::FailureReason;
use instabatch::{
    AppConfig, BatchEvent, BatchOptions, DownloadOutcome, InstaBatch, Result, SaveMode,
};

#[derive(Parser)]
#[command(name = "instabatch")]
#[command(author, version, about = "Batch downloader for social media links", long_about = None)]
struct Cli {
    /// JSON config file; defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the output directory
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// Borrow cookies from this browser (chrome, firefox, ...)
    #[arg(long, global = true)]
    cookies_from_browser: Option<String>,

    /// Proxy for short-link expansion (http, https, socks5, socks5h)
    #[arg(long, global = true)]
    proxy: Option<String>,

    /// Keep short links as they are instead of following their redirects
    #[arg(long, global = true)]
    no_resolve: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, deduplicate and classify links from text
    Parse {
        /// Text file to read; stdin when omitted
        input: Option<PathBuf>,
    },

    /// Probe supported links for their media type
    Audit {
        /// Text file to read; stdin when omitted
        input: Option<PathBuf>,
    },

    /// Download every supported link, streaming progress as JSON lines
    Download {
        /// Text file to read; stdin when omitted
        input: Option<PathBuf>,

        /// Parallel downloads (1-5)
        #[arg(long)]
        concurrency: Option<usize>,

        /// Extra attempts per failed link (0-5)
        #[arg(long)]
        retries: Option<u32>,

        /// Per-link timeout in seconds (15-600)
        #[arg(long)]
        timeout: Option<u64>,

        #[arg(long, value_enum)]
        save_mode: Option<SaveModeArg>,

        /// Open the output folder when the batch completes
        #[arg(long)]
        open: bool,
    },

    /// Show availability and version of yt-dlp and gallery-dl
    Tools,
}

#[derive(Clone, Copy, ValueEnum)]
enum SaveModeArg {
    /// One folder per uploader
    #[value(name = "by_uploader", alias = "perfil")]
    ByUploader,
    /// Everything in the output folder
    Flat,
}

impl From<SaveModeArg> for SaveMode {
    fn from(arg: SaveModeArg) -> Self {
        match arg {
            SaveModeArg::ByUploader => SaveMode::ByUploader,
            SaveModeArg::Flat => SaveMode::Flat,
        }
    }
}

fn read_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

fn print_json_line<T: serde::Serialize>(value: &T) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}

/// Explain a failed link on stderr; cancellations need no explanation
fn report_failure(item: &DownloadOutcome, using_cookies: bool) {
    let Some(reason) = item.reason.filter(|r| !item.success && *r != FailureReason::Cancelled)
    else {
        return;
    };
    match reason.hint(using_cookies) {
        Some(hint) => warn!(url = %item.url, reason = reason.description(), hint, "download failed"),
        None => warn!(url = %item.url, reason = reason.description(), "download failed"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "instabatch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(dir) = cli.output_dir {
        config = config.with_output_dir(dir);
    }
    if cli.cookies_from_browser.is_some() {
        config = config.with_cookies_from_browser(cli.cookies_from_browser);
    }
    if cli.proxy.is_some() {
        config = config.with_proxy(cli.proxy);
    }
    if cli.no_resolve {
        config = config.with_resolve_short_links(false);
    }

    let app = InstaBatch::new(config)?;

    match cli.command {
        Commands::Parse { input } => {
            let text = read_input(input.as_ref())?;
            print_json(&app.parse_links(&text).await)?;
        }

        Commands::Audit { input } => {
            let text = read_input(input.as_ref())?;
            let parsed = app.parse_links(&text).await;
            let urls: Vec<String> = parsed.links.into_iter().map(|l| l.url).collect();
            print_json(&app.audit_links(&urls).await)?;
        }

        Commands::Download {
            input,
            concurrency,
            retries,
            timeout,
            save_mode,
            open,
        } => {
            let text = read_input(input.as_ref())?;
            let parsed = app.parse_links(&text).await;
            for url in &parsed.unsupported_links {
                warn!(url, "skipping unsupported link");
            }

            let defaults = app.config().batch.clone();
            let options = BatchOptions {
                concurrency: concurrency.or(defaults.concurrency),
                max_retries: retries.or(defaults.max_retries),
                timeout_ms: timeout.map(|s| s.saturating_mul(1000)).or(defaults.timeout_ms),
                save_mode: save_mode.map(SaveMode::from).unwrap_or(defaults.save_mode),
                open_output_dir: open || defaults.open_output_dir,
            };

            let using_cookies = app.config().cookies_from_browser.is_some();
            let mut handle = app.start_download_batch(parsed.links, Some(options));
            let batch_id = handle.id;
            let mut interrupted = false;

            loop {
                tokio::select! {
                    event = handle.next_event() => {
                        let Some(event) = event else { break };
                        print_json_line(&event)?;
                        match &event {
                            BatchEvent::Progress { item, .. } => report_failure(item, using_cookies),
                            BatchEvent::Done { .. } => break,
                            BatchEvent::Started { .. } => {}
                        }
                    }
                    _ = tokio::signal::ctrl_c(), if !interrupted => {
                        interrupted = true;
                        info!(batch = %batch_id, "interrupt received, cancelling");
                        app.cancel_download_batch(batch_id);
                    }
                }
            }
        }

        Commands::Tools => {
            print_json(&app.tools_status().await)?;
        }
    }

    Ok(())
}
