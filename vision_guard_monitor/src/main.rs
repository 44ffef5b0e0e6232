//! Vision Guard Monitor Binary

use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vision_guard_monitor::downtime::{START_FAILED_MSG, STOP_FAILED_MSG};
use vision_guard_monitor::export::EXPORT_FAILED_MSG;
use vision_guard_monitor::models::HistoryQuery;
use vision_guard_monitor::{
    format_duration, save_report, DashboardApi, DowntimeReason, ExportRequest, HttpTransport,
    MonitorConfig, MonitorError, ReportScope, Result, Synchronizer,
};

/// Spark Vision Guard dashboard client
#[derive(Parser)]
#[command(name = "vision-guard-monitor")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Backend base URL, including the /api prefix
    #[arg(long, global = true, env = "GUARD_API_BASE_URL")]
    api_url: Option<String>,

    /// Human-readable logs instead of JSON
    #[arg(long, global = true)]
    plain_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Keep the dashboard synchronized and print it on every state poll
    Watch,

    /// Fetch everything once and print the dashboard
    Status,

    /// Start a downtime episode
    Start {
        /// Reason code, e.g. REPAIR or MATERIAL_SHORTAGE
        reason: DowntimeReason,
    },

    /// Stop the active downtime episode
    Stop,

    /// Download an Excel report
    Export {
        /// daily, monthly or yearly
        scope: ReportScope,

        #[arg(long)]
        year: Option<i32>,

        #[arg(long)]
        month: Option<u32>,

        #[arg(long)]
        day: Option<u32>,

        /// Output directory (defaults to GUARD_EXPORT_DIR or the working directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// List past downtime episodes
    History {
        #[arg(long)]
        start: Option<NaiveDate>,

        #[arg(long)]
        end: Option<NaiveDate>,

        #[arg(long, default_value_t = 100)]
        limit: u32,
    },

    /// List completed cycles for a day
    Cycles {
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Show the production summary for a day
    Summary {
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// List the downtime reason catalogue
    Reasons,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_tracing(cli.plain_logs);

    info!("Starting Vision Guard Monitor v{}", env!("CARGO_PKG_VERSION"));

    let mut config = MonitorConfig::from_env();
    if let Some(url) = cli.api_url {
        config.api_base_url = url.trim_end_matches('/').to_string();
    }

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    let transport = HttpTransport::from_config(&config)?;
    let api: Arc<dyn DashboardApi> = Arc::new(transport);

    let outcome = match cli.command {
        Commands::Watch => watch(config, api).await,
        Commands::Status => status(config, api).await,
        Commands::Start { reason } => start(config, api, reason).await,
        Commands::Stop => stop(config, api).await,
        Commands::Export {
            scope,
            year,
            month,
            day,
            out,
        } => {
            let today = Local::now().date_naive();
            let year = year.unwrap_or_else(|| today.year());
            let month = month.unwrap_or_else(|| today.month());
            let request = match scope {
                ReportScope::Daily => {
                    ExportRequest::daily(year, month, day.unwrap_or_else(|| today.day()))
                }
                ReportScope::Monthly => ExportRequest::monthly(year, month),
                ReportScope::Yearly => ExportRequest::yearly(year),
            };
            let dir = out.unwrap_or_else(|| config.export_dir.clone());
            export(api, request, dir).await
        }
        Commands::History { start, end, limit } => {
            let query = HistoryQuery {
                start_date: start,
                end_date: end,
                limit,
            };
            history(api, query).await
        }
        Commands::Cycles { date } => cycles(api, date.unwrap_or_else(today)).await,
        Commands::Summary { date } => summary(api, date.unwrap_or_else(today)).await,
        Commands::Reasons => {
            for reason in DowntimeReason::ALL {
                println!("{:<18} {:<24} {}", reason.code(), reason.label(), reason.color());
            }
            Ok(())
        }
    };

    if let Err(e) = outcome {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

async fn watch(config: MonitorConfig, api: Arc<dyn DashboardApi>) -> Result<()> {
    let period = config.state_poll_interval;
    let sync = Synchronizer::new(config, api)?;
    sync.start()?;

    let mut ticker = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                println!("{}\n", sync.snapshot().await);
                if let Some(alert) = sync.downtime().take_error().await {
                    eprintln!("{}", alert);
                }
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    error!("Failed to wait for shutdown signal: {}", e);
                }
                break;
            }
        }
    }

    info!("Shutting down");
    sync.shutdown().await;
    Ok(())
}

async fn status(config: MonitorConfig, api: Arc<dyn DashboardApi>) -> Result<()> {
    let sync = Synchronizer::new(config, api)?;
    sync.refresh().await;
    println!("{}", sync.snapshot().await);
    sync.shutdown().await;
    Ok(())
}

async fn start(
    config: MonitorConfig,
    api: Arc<dyn DashboardApi>,
    reason: DowntimeReason,
) -> Result<()> {
    let sync = Synchronizer::new(config, api)?;
    let panel = sync.downtime();

    let result = async {
        panel.load_status().await?;
        panel.start(reason).await
    }
    .await;
    sync.shutdown().await;

    match result {
        Ok(()) => {
            println!("Downtime started: {}", reason.label());
            Ok(())
        }
        Err(e) => Err(alert(e, START_FAILED_MSG)),
    }
}

async fn stop(config: MonitorConfig, api: Arc<dyn DashboardApi>) -> Result<()> {
    let sync = Synchronizer::new(config, api)?;
    let panel = sync.downtime();

    // An unreadable status must not be reported as "no active downtime".
    let result = async {
        panel.load_status().await?;
        panel.stop().await
    }
    .await;
    sync.shutdown().await;

    match result {
        Ok(true) => {
            println!("Downtime stopped");
            Ok(())
        }
        Ok(false) => {
            println!("No active downtime");
            Ok(())
        }
        Err(e) => Err(alert(e, STOP_FAILED_MSG)),
    }
}

async fn export(api: Arc<dyn DashboardApi>, request: ExportRequest, dir: PathBuf) -> Result<()> {
    match save_report(api.as_ref(), &request, &dir).await {
        Ok(path) => {
            println!("Saved {}", path.display());
            Ok(())
        }
        Err(e) => Err(alert(e, EXPORT_FAILED_MSG)),
    }
}

async fn history(api: Arc<dyn DashboardApi>, query: HistoryQuery) -> Result<()> {
    let logs = api.fetch_downtime_history(&query).await?;
    if logs.is_empty() {
        println!("No downtime recorded");
    }
    for log in logs {
        let end = log
            .end_time
            .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "active".to_string());
        println!(
            "{:>6}  {}  {:<24} {} - {:<8} {}",
            log.id,
            log.date,
            log.downtime_reason.label(),
            log.start_time.with_timezone(&Local).format("%H:%M:%S"),
            end,
            format_duration(log.duration_sec.unwrap_or(0) as i64)
        );
    }
    Ok(())
}

async fn cycles(api: Arc<dyn DashboardApi>, date: NaiveDate) -> Result<()> {
    let cycles = api.fetch_cycles(date).await?;
    if cycles.is_empty() {
        println!("No cycles on {}", date);
    }
    for cycle in cycles {
        println!(
            "#{:<5} {} - {}  {}",
            cycle.cycle_no,
            cycle.start_time.with_timezone(&Local).format("%H:%M:%S"),
            cycle.stop_time.with_timezone(&Local).format("%H:%M:%S"),
            format_duration(cycle.runtime_sec as i64)
        );
    }
    Ok(())
}

async fn summary(api: Arc<dyn DashboardApi>, date: NaiveDate) -> Result<()> {
    match api.fetch_summary_for(date).await? {
        Some(summary) => {
            println!("Date:         {}", summary.date.unwrap_or(date));
            println!("Cycles:       {}", summary.total_cycles.unwrap_or(0));
            println!(
                "Runtime:      {}",
                format_duration(summary.total_runtime_sec.unwrap_or(0) as i64)
            );
            println!(
                "Downtime:     {}",
                format_duration(summary.total_downtime_sec as i64)
            );
            match summary.availability {
                Some(availability) => println!("Availability: {:.1}%", availability),
                None => println!("Availability: -"),
            }
        }
        None => println!("No data for {}", date),
    }
    Ok(())
}

/// Print the operator alert for a failed action and pass the error on.
fn alert(err: MonitorError, fallback: &str) -> MonitorError {
    eprintln!("{}", err.user_message(fallback));
    err
}

/// Initialize structured logging
fn initialize_tracing(plain: bool) {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&log_level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter_layer);

    if plain {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr);
        registry.with(fmt_layer).init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_file(false)
            .with_line_number(false)
            .with_writer(std::io::stderr)
            .json();
        registry.with(fmt_layer).init();
    }
}
