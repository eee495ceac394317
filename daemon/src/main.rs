use anyhow::{Context, Result};
use clap::Parser;
use minewatch_daemon::{
    collector::LinuxProcessCollector, config::Config, monitor::Monitor, notifier::Notifier,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Flags process trees whose children together burn unusual amounts of CPU.
#[derive(Parser)]
#[command(name = "minewatch", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Logging verbosity (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Run a single cycle, print the report and exit.
    #[arg(long)]
    once: bool,

    /// Write the default configuration to the config path and exit.
    #[arg(long)]
    write_default_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level)
        .with_context(|| format!("invalid log level: {}", cli.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if cli.write_default_config {
        let path = cli.config.clone().unwrap_or_else(Config::config_path);
        Config::default()
            .save(&path)
            .with_context(|| format!("writing config to {}", path.display()))?;
        println!("{}", path.display());
        return Ok(());
    }

    let config = Config::load_or_default(cli.config.as_deref());
    let notifier = Notifier::new(config.notification.enabled);
    let monitor = Monitor::new(LinuxProcessCollector::new(), config.detector.clone());

    if cli.once {
        let report = monitor.run_cycle().await;
        notifier.notify(&report);
        println!("{}", report);
        return Ok(());
    }

    info!("minewatch starting");
    let (handle, mut reports) = monitor.spawn();
    let mut tick = tokio::time::interval(config.detector.poll_interval());
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                if let Some(report) = reports.try_take() {
                    notifier.notify(&report);
                    println!("{}\n", report);
                } else if reports.is_closed() {
                    break;
                }
            }
            _ = &mut ctrl_c => {
                info!("received SIGINT, shutting down");
                break;
            }
        }
    }

    handle.abort();
    Ok(())
}
