//! wdi-pulse - live World Bank population indicators
//!
//! A CLI tool that fetches regional population series from the World Bank
//! indicators API, aligns them to a year range and reports growth rates and
//! the working-age share of one region within another.
//!
//! Exit codes:
//!   0 - Refresh succeeded (or watch mode stopped cleanly)
//!   1 - Refresh failed, or a runtime error (config, output file, etc.)

mod aggregator;
mod analysis;
mod cli;
mod config;
mod error;
mod models;
mod report;
mod source;

use aggregator::{AggregatorSettings, IndicatorAggregator};
use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use indicatif::{ProgressBar, ProgressStyle};
use models::{RefreshStatus, Snapshot};
use source::{SeriesFetcher, TokioSleeper, WorldBankTransport};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("wdi-pulse v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .wdipulse.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml()?;
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize regions, year range and refresh timing.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level())
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Build the aggregator and run it in the requested mode. Returns the exit code.
async fn run(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let settings = AggregatorSettings::from_config(&config).context("Invalid configuration")?;
    let fetcher = build_fetcher(&config)?;

    println!("🌍 World Bank indicators: {}", config.source.base_url);
    println!(
        "   Series: {} | Years: {} to {}",
        settings.series.len(),
        settings.years.start(),
        settings.years.end()
    );

    if args.watch {
        run_watch(IndicatorAggregator::new(settings, fetcher), &args).await
    } else {
        run_once(settings, fetcher, &args).await
    }
}

fn build_fetcher(config: &Config) -> Result<SeriesFetcher> {
    let transport = WorldBankTransport::new(
        &config.source.base_url,
        config.source.per_page,
        Duration::from_secs(config.source.timeout_seconds),
    )
    .context("Failed to create HTTP client")?;

    Ok(SeriesFetcher::new(
        Arc::new(transport),
        Arc::new(TokioSleeper),
        config.refresh.retry_policy(),
    ))
}

/// One refresh, a printed summary and an optional output file.
async fn run_once(
    settings: AggregatorSettings,
    fetcher: SeriesFetcher,
    args: &Args,
) -> Result<i32> {
    let progress = fetch_progress(settings.request_count() as u64, args.quiet);
    let aggregator = IndicatorAggregator::new(settings, fetcher).with_progress(progress.clone());

    println!("\n📥 Fetching series...");
    let outcome = aggregator.init().await;
    progress.finish_and_clear();
    aggregator.dispose();

    let snapshot = aggregator.snapshot();
    println!("\n{}", report::render_summary(&snapshot));

    if let Some(ref path) = args.output {
        if snapshot.has_data() {
            write_output(&snapshot, args.format, path)?;
            println!("✅ Snapshot saved to: {}", path.display());
        } else {
            warn!("No data to write to {}", path.display());
        }
    }

    match outcome {
        Ok(_) => Ok(0),
        Err(e) => {
            error!("Refresh failed: {}", e);
            Ok(1)
        }
    }
}

/// Refresh on the configured interval until Ctrl-C.
async fn run_watch(aggregator: IndicatorAggregator, args: &Args) -> Result<i32> {
    let aggregator = Arc::new(aggregator);
    let mut updates = aggregator.subscribe();

    println!(
        "\n👀 Watching, refresh every {:.0}s. Press Ctrl-C to stop.",
        aggregator.settings().refresh_interval.as_secs_f64()
    );
    if cfg!(unix) {
        println!("   Send SIGHUP to refresh immediately.");
    }
    println!();

    if let Err(e) = aggregator.init().await {
        warn!("Initial refresh failed: {}", e);
    }
    let snapshot = updates.borrow_and_update().clone();
    report_watch_update(&snapshot, args)?;

    let periodic = aggregator.spawn_periodic();
    let mut hangup = RefreshSignal::install();

    loop {
        tokio::select! {
            _ = hangup.recv() => {
                info!("Refresh requested by signal");
                periodic.trigger();
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                if snapshot.status != RefreshStatus::Loading {
                    report_watch_update(&snapshot, args)?;
                }
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!("Failed to listen for Ctrl-C: {}", e);
                }
                println!("\n🛑 Stopping...");
                break;
            }
        }
    }

    aggregator.dispose();
    periodic.stopped().await;
    Ok(0)
}

/// SIGHUP listener used to request an immediate refresh in watch mode.
#[cfg(unix)]
struct RefreshSignal(Option<tokio::signal::unix::Signal>);

#[cfg(unix)]
impl RefreshSignal {
    fn install() -> Self {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::hangup()) {
            Ok(stream) => Self(Some(stream)),
            Err(e) => {
                warn!("Failed to listen for SIGHUP: {}", e);
                Self(None)
            }
        }
    }

    /// Resolves on each SIGHUP; never resolves when no listener is installed.
    async fn recv(&mut self) {
        if let Some(ref mut stream) = self.0 {
            if stream.recv().await.is_some() {
                return;
            }
        }
        std::future::pending::<()>().await
    }
}

#[cfg(not(unix))]
struct RefreshSignal;

#[cfg(not(unix))]
impl RefreshSignal {
    fn install() -> Self {
        Self
    }

    async fn recv(&mut self) {
        std::future::pending::<()>().await
    }
}

fn report_watch_update(snapshot: &Snapshot, args: &Args) -> Result<()> {
    println!("{}", report::status_line(snapshot));

    if let (Some(path), RefreshStatus::Ready) = (&args.output, &snapshot.status) {
        write_output(snapshot, args.format, path)?;
        debug!("Snapshot written to {}", path.display());
    }
    Ok(())
}

fn write_output(snapshot: &Snapshot, format: OutputFormat, path: &Path) -> Result<()> {
    match format {
        OutputFormat::Csv => report::save_csv(snapshot, path),
        OutputFormat::Json => {
            let content = report::generate_json_report(snapshot)?;
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write snapshot to {}", path.display()))
        }
        OutputFormat::Markdown => {
            let content = report::generate_markdown_report(snapshot);
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write snapshot to {}", path.display()))
        }
    }
}

fn fetch_progress(requests: u64, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(requests);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
