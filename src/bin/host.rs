//! Dry-run host for the waqt alarm engine.
//!
//! Runs the engine against in-process collaborators that log instead of
//! touching the OS: alarms are kept in memory and the heartbeat is written
//! to the log. State and calendar data are real files.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, Layer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use waqt::calendar::CalendarFile;
use waqt::platform::memory::{MemoryAlarmService, SwitchPermission};
use waqt::platform::{HeartbeatSurface, Platform, SystemClock};
use waqt::scheduler::manager::plan_day;
use waqt::scheduler::recovery::RecoveryCoordinator;
use waqt::store::JsonFileStore;
use waqt::{Engine, EngineConfig, HeartbeatStatus, PlatformError, RecoveryTrigger, waqt_dirs};

/// Waqt: prayer-time alarm engine host.
#[derive(Parser)]
#[command(name = "waqt-host", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Calendar JSON file (defaults to the data directory).
    #[arg(long)]
    calendar: Option<PathBuf>,

    /// Durable state file (defaults to the data directory).
    #[arg(long)]
    state: Option<PathBuf>,

    /// Also write a daily rolling log file under the logs directory.
    #[arg(long)]
    log_file: bool,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Start the engine and keep it running until Ctrl-C.
    Run,

    /// Print the heartbeat for the current moment.
    Status,

    /// List the alarms a renewal starting today would register.
    Plan {
        /// Number of days to list (defaults to the renewal horizon).
        #[arg(long)]
        days: Option<u32>,
    },
}

/// Heartbeat surface that writes each status to the log.
struct LogSurface;

#[async_trait]
impl HeartbeatSurface for LogSurface {
    async fn activate(&self) -> Result<(), PlatformError> {
        info!("heartbeat surface active");
        Ok(())
    }

    async fn show(&self, notification_id: u32, status: &HeartbeatStatus) -> Result<(), PlatformError> {
        info!(notification_id, body = ?status.body, "{}", status.title);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.log_file)?;

    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => {
            let path = EngineConfig::default_config_path();
            if path.exists() {
                EngineConfig::from_file(&path)?
            } else {
                EngineConfig::default()
            }
        }
    };

    let calendar_path = cli.calendar.unwrap_or_else(waqt_dirs::calendar_file);
    let state_path = cli.state.unwrap_or_else(waqt_dirs::state_file);
    let calendar = Arc::new(CalendarFile::load(&calendar_path)?);
    let platform = Platform {
        alarms: Arc::new(MemoryAlarmService::new()),
        permission: Arc::new(SwitchPermission::granted()),
        surface: Arc::new(LogSurface),
        store: Arc::new(JsonFileStore::open(&state_path)?),
        calendar: calendar.clone(),
        clock: Arc::new(SystemClock),
    };

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(&platform, &config).await,
        Command::Status => status(&platform, &config).await,
        Command::Plan { days } => plan(&calendar, &config, days),
    }
}

fn init_logging(
    log_file: bool,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("waqt=info"));
    let stderr = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(filter());

    if !log_file {
        tracing_subscriber::registry().with(stderr).init();
        return Ok(None);
    }

    let dir = waqt_dirs::logs_dir();
    std::fs::create_dir_all(&dir)?;
    let appender = tracing_appender::rolling::daily(&dir, "waqt-host.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let file = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(filter());
    tracing_subscriber::registry().with(stderr).with(file).init();
    Ok(Some(guard))
}

async fn run(platform: &Platform, config: &EngineConfig) -> anyhow::Result<()> {
    println!("waqt-host v{}", env!("CARGO_PKG_VERSION"));

    let engine = Engine::start(platform, config)?;
    let handle = engine.handle();

    // In-memory alarms start empty, the same as after a reboot.
    let outcome = handle.recover(RecoveryTrigger::DeviceReboot).await?;
    info!(?outcome, "initial recovery finished");

    tokio::signal::ctrl_c().await?;
    println!("\nStopping...");
    engine.shutdown().await;
    Ok(())
}

async fn status(platform: &Platform, config: &EngineConfig) -> anyhow::Result<()> {
    let mut config = config.clone();
    config.heartbeat.show_full_day = true;
    let coordinator = RecoveryCoordinator::new(platform, &config);

    let status = coordinator.heartbeat_status().await;
    println!("{}", status.title);
    if let Some(body) = status.body {
        println!("{body}");
    }
    Ok(())
}

fn plan(calendar: &CalendarFile, config: &EngineConfig, days: Option<u32>) -> anyhow::Result<()> {
    let today: NaiveDate = chrono::Local::now().date_naive();
    let count = days.unwrap_or(config.renewal.horizon_days);

    for date in today.iter_days().take(count as usize) {
        let Some(day) = calendar.get(date) else {
            println!("{date}  no calendar data");
            continue;
        };
        let day_plan = plan_day(&day, &config.alarms.lead_offsets, &config.alarms.enabled_kinds);
        for alarm in &day_plan.alarms {
            println!(
                "{date}  {:>5}  {}  {:?}  {}",
                alarm.id().0,
                alarm.trigger.format("%Y-%m-%d %H:%M"),
                alarm.key.kind.alert_channel(),
                alarm.label
            );
        }
        for fault in &day_plan.faults {
            println!("{date}  skipped  {fault}");
        }
    }

    let last = today + Duration::days(i64::from(count.max(1)) - 1);
    println!("window {today} .. {last}");
    Ok(())
}
