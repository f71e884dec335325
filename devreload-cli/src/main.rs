use anyhow::{Context, Result};
use clap::Parser;
use reload_poller::logging::{init_logging_with_level, is_initialized, LoggingMode};
use reload_poller::{
    ChannelReloader, CommandReloader, Poller, PollerConfig, PollerExit, Reloader, Version,
    DEFAULT_CHECK_PATH,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Development live-reload watcher
///
/// Polls a development server for its current version and runs a reload
/// command as soon as the version differs from the one given on the command
/// line. Exits after the reload.
#[derive(Parser, Debug)]
#[command(name = "devreload")]
#[command(about = "Reload when a development server reports a new version")]
#[command(version)]
pub struct Args {
    /// Base URL of the development server
    #[arg(short, long, default_value = "http://localhost:8000")]
    pub url: String,

    /// Version currently loaded (JSON literal or bare text)
    #[arg(short = 'c', long)]
    pub current_version: String,

    /// Milliseconds between checks
    #[arg(short, long, default_value = "1000")]
    pub interval_ms: u64,

    /// Path of the version endpoint
    #[arg(long, default_value = DEFAULT_CHECK_PATH)]
    pub check_path: String,

    /// Per-request timeout in milliseconds (no timeout when omitted)
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Log level (error, warn, info, debug, trace)
    ///
    /// Takes precedence over DEVRELOAD_LOG_LEVEL and RUST_LOG.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Verbose logging with source locations
    #[arg(long)]
    pub debug: bool,

    /// Command to run when the version changes
    #[arg(last = true)]
    pub command: Vec<String>,
}

impl Args {
    /// Validate command line arguments
    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(anyhow::anyhow!("Interval must be positive"));
        }

        if self.timeout_ms == Some(0) {
            return Err(anyhow::anyhow!("Timeout must be positive"));
        }

        if self.current_version.trim().is_empty() {
            return Err(anyhow::anyhow!("Current version must not be empty"));
        }

        if let Some(level) = &self.log_level {
            match level.to_lowercase().as_str() {
                "error" | "warn" | "info" | "debug" | "trace" => {}
                _ => {
                    return Err(anyhow::anyhow!(
                        "Invalid log level '{}'. Valid levels: error, warn, info, debug, trace",
                        level
                    ));
                }
            }
        }

        Ok(())
    }

    /// Poller configuration derived from the arguments
    pub fn poller_config(&self) -> Result<PollerConfig> {
        let mut config = PollerConfig::new()
            .with_base_url(self.url.clone())
            .with_check_path(self.check_path.clone())
            .with_poll_interval(Duration::from_millis(self.interval_ms));

        if let Some(timeout) = self.timeout_ms {
            config = config.with_request_timeout(Duration::from_millis(timeout));
        }

        config.validate().context("Invalid poller configuration")?;
        Ok(config)
    }

    pub fn current_version(&self) -> Version {
        match self.current_version.parse() {
            Ok(version) => version,
            Err(never) => match never {},
        }
    }

    fn logging_mode(&self) -> LoggingMode {
        if self.debug {
            LoggingMode::Debug
        } else {
            LoggingMode::Development
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    args.validate()?;

    if !is_initialized() {
        let level = args.log_level.as_deref().map(str::to_lowercase);
        init_logging_with_level(args.logging_mode(), level.as_deref())
            .context("Failed to initialize logging")?;
    }

    let config = args.poller_config()?;
    let exit = run(config, args.current_version(), &args.command).await?;

    match exit {
        PollerExit::Reloaded => info!("Reload complete"),
        PollerExit::Stopped => info!("Stopped"),
    }

    Ok(())
}

/// Watch until the version changes or Ctrl-C is pressed
async fn run(
    config: PollerConfig,
    current_version: Version,
    command: &[String],
) -> Result<PollerExit> {
    let mut reload_events = None;
    let reloader: Arc<dyn Reloader> = match CommandReloader::from_argv(command) {
        Some(command) => {
            info!("Reload command: {} {:?}", command.program(), command.args());
            Arc::new(command)
        }
        None => {
            let (reloader, receiver) = ChannelReloader::channel();
            reload_events = Some(receiver);
            Arc::new(reloader)
        }
    };

    let poller =
        Poller::http(config, current_version, reloader).context("Failed to create poller")?;
    let handle = poller.start();

    let stop = handle.stop_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, shutting down...");
            stop.stop();
        }
    });

    let exit = handle.join().await.context("Polling task failed")?;

    if let Some(receiver) = reload_events.as_mut() {
        if let Ok(event) = receiver.try_recv() {
            info!(
                "Server version changed: {} -> {}",
                event.previous, event.current
            );
        }
    }

    info!("{}", poller.stats());
    Ok(exit)
}
