//! Ferry Runtime
//!
//! Loads a script, bootstraps the bridge and drives the script's timers

use anyhow::{Context as _, Result};
use clap::Parser;
use ferry_bridge::{Capabilities, ScriptEnvironment};
use ferry_script::ScriptRuntime;
use ferry_services::{Settings, SETTINGS_FILE};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Longest sleep while waiting with nothing scheduled.
const IDLE_POLL: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(name = "ferry")]
#[command(version, about = "Runs a script with access to host classes", long_about = None)]
struct Cli {
    /// Script to run
    script: PathBuf,

    /// Settings file [default: ferry.json next to the script]
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Stop after this many seconds, even with timers pending
    #[arg(long, value_name = "SECS")]
    run_for: Option<f64>,

    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.script.with_file_name(SETTINGS_FILE));
    let settings = Settings::load(&config)?;
    init_logging(&settings.runtime.log_filter, cli.verbose);

    tracing::info!("Ferry v{}", env!("CARGO_PKG_VERSION"));
    let registry = ferry_services::service_registry().context("registering host classes")?;
    let env = ScriptEnvironment::new(registry, &settings.bridge);
    let runtime = ScriptRuntime::new(env)?;

    runtime
        .load_file(&cli.script, &Capabilities::new())
        .with_context(|| format!("running {}", cli.script.display()))?;

    let deadline = cli
        .run_for
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(|secs| Instant::now() + Duration::from_secs_f64(secs));
    drive_timers(&runtime, deadline, settings.runtime.exit_when_idle)?;

    runtime.teardown()?;
    tracing::info!("Runtime shut down");
    Ok(())
}

/// `RUST_LOG` wins over the settings file; `-v` wins over both.
fn init_logging(default_filter: &str, verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Sleeps until the next timer is due and fires it, one batch at a time.
fn drive_timers(runtime: &ScriptRuntime, deadline: Option<Instant>, exit_when_idle: bool) -> Result<()> {
    loop {
        let now = Instant::now();
        if deadline.is_some_and(|deadline| now >= deadline) {
            tracing::info!("Run time elapsed");
            return Ok(());
        }

        let wake = match runtime.next_timer() {
            Some(due) => due,
            None if exit_when_idle => {
                tracing::info!("No timers pending");
                return Ok(());
            }
            None => now + IDLE_POLL,
        };
        let wake = deadline.map_or(wake, |deadline| wake.min(deadline));
        if wake > now {
            std::thread::sleep(wake - now);
        }

        let fired = runtime.run_due_timers(Instant::now())?;
        if fired > 0 {
            tracing::trace!(fired, "timers fired");
        }
    }
}
