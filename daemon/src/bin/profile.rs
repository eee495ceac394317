use anyhow::{Context, Result};
use clap::Parser;
use minewatch_daemon::{
    collector::LinuxProcessCollector, config::Config, profiler::Profiler, Error,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Profiles one process's resource footprint over a fixed window.
#[derive(Parser)]
#[command(name = "minewatch-profile", version, about)]
struct Cli {
    /// Process to profile.
    pid: u32,

    /// Observation window in seconds.
    duration: u64,

    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Logging verbosity (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print the report as a JSON object.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level)
        .with_context(|| format!("invalid log level: {}", cli.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load_or_default(cli.config.as_deref());
    let profiler = Profiler::new(LinuxProcessCollector::new(), config.profiler);

    let report = match profiler
        .profile(cli.pid, Duration::from_secs(cli.duration))
        .await
    {
        Ok(report) => report,
        Err(e @ Error::ProcessNotFound(_)) => {
            eprintln!("{}", e);
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e).context("profiling failed"),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report);
    }
    Ok(ExitCode::SUCCESS)
}
