//! `hearth` command-line entry point.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use hearth::registry::POINT_CALLABLE;
use hearth::scheduler::now_epoch_secs;
use hearth::{Host, Scheduler, Settings, hearth_dirs, interval, plugins};

#[derive(Parser)]
#[command(name = "hearth", version, about = "Personal automation host")]
struct Cli {
    /// Additional settings files, merged over the default config in order.
    #[arg(short, long, value_name = "FILE")]
    config: Vec<PathBuf>,

    /// Increase log verbosity (repeatable).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Decrease log verbosity (repeatable).
    #[arg(short, long, action = ArgAction::Count)]
    quiet: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List recurring tasks with their intervals and last runs.
    Tasks,
    /// Run one scheduling pass and exit.
    Tick,
    /// Run the scheduler loop in the foreground.
    Daemon {
        /// Seconds between scheduling passes.
        #[arg(long, default_value_t = 60)]
        tick_secs: u64,
    },
    /// Archive old files out of a directory.
    Archive {
        /// Source directory.
        #[arg(short = 'f', long)]
        source: PathBuf,
        /// Archive destination; defaults to "<source> (Archive)".
        #[arg(short = 't', long)]
        destination: Option<PathBuf>,
        /// Minimum age, e.g. "30D".
        #[arg(short, long)]
        delta: String,
        /// Print planned moves without performing them.
        #[arg(short = 'n', long)]
        dry_run: bool,
    },
}

const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Pick the log filter: `RUST_LOG` wins outright, otherwise the settings
/// `log-level` shifted by `-v`/`-q`.
fn log_filter(settings: &Settings, verbose: u8, quiet: u8) -> String {
    if let Ok(spec) = std::env::var("RUST_LOG") {
        return spec;
    }

    let base = settings.get_str_or("log-level", "warn");
    let base_idx = LEVELS
        .iter()
        .position(|level| *level == base)
        .unwrap_or(1) as i32;
    let idx = (base_idx + i32::from(verbose) - i32::from(quiet)).clamp(0, 4);
    LEVELS[idx as usize].to_owned()
}

fn load_settings(extra: &[PathBuf]) -> anyhow::Result<(Settings, Vec<PathBuf>)> {
    let mut settings = Settings::new();
    let mut missing = Vec::new();

    let default = hearth_dirs::config_file();
    if !settings.load_file(&default)? {
        missing.push(default);
    }
    for path in extra {
        if !settings.load_file(path)? {
            missing.push(path.clone());
        }
    }

    Ok((settings, missing))
}

fn print_tasks(scheduler: &Scheduler) {
    for status in scheduler.describe_tasks() {
        let last = match status.last_run {
            Some(secs) => chrono::DateTime::from_timestamp(secs as i64, 0)
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "invalid".to_owned()),
            None => "never".to_owned(),
        };
        println!(
            "{:<20} {:<20} last run {last}",
            status.name,
            interval::format_interval(Duration::from_secs(status.interval_secs)),
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (settings, missing) = load_settings(&cli.config)?;
    let filter = EnvFilter::new(log_filter(&settings, cli.verbose, cli.quiet));

    // The daemon additionally logs to a daily-rolling file; the guard must
    // outlive the subscriber so buffered lines are flushed on exit.
    let _guard = if matches!(cli.command, Command::Daemon { .. }) {
        let appender = tracing_appender::rolling::daily(hearth_dirs::logs_dir(), "hearth.log");
        let (file_writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr.and(file_writer))
            .init();
        Some(guard)
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        None
    };

    for path in missing {
        tracing::warn!(path = %path.display(), "settings file not found; skipped");
    }

    let mut host = Host::new(settings, hearth_dirs::cache_dir())
        .context("host initialization failed")?;
    plugins::register_builtins(host.registry_mut())?;

    match cli.command {
        Command::Tasks => {
            let scheduler = Scheduler::from_host(&host, hearth_dirs::state_file())?;
            print_tasks(&scheduler);
        }
        Command::Tick => {
            let mut scheduler = Scheduler::from_host(&host, hearth_dirs::state_file())?;
            let executed = scheduler.tick(&host, now_epoch_secs())?;
            tracing::info!(executed, "tick complete");
        }
        Command::Daemon { tick_secs } => {
            let mut scheduler = Scheduler::from_host(&host, hearth_dirs::state_file())?;
            tracing::info!(tick_secs, "daemon starting");
            scheduler
                .run(&host, Duration::from_secs(tick_secs))
                .await
                .context("scheduler loop ended")?;
        }
        Command::Archive {
            source,
            destination,
            delta,
            dry_run,
        } => {
            let args = serde_json::json!({
                "source": source,
                "destination": destination,
                "delta": delta,
                "dry_run": dry_run,
            });
            let instance = host.resolve(POINT_CALLABLE, "archive", &args)?;
            let mut callable = instance
                .into_callable()
                .context("archive is not a callable")?;
            let outcome = callable.call(&host)?;
            println!("{outcome}");
        }
    }

    Ok(())
}
