//! Reload actions triggered when the server version changes.

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::error::ReloadError;
use crate::version::Version;

/// A detected version change
#[derive(Debug, Clone, PartialEq)]
pub struct ReloadEvent {
    /// Version the poller was started with
    pub previous: Version,
    /// Version the server reported
    pub current: Version,
}

/// Action performed once the server version differs from the baseline
#[async_trait]
pub trait Reloader: Send + Sync {
    async fn reload(&self, event: &ReloadEvent) -> Result<(), ReloadError>;
}

/// Forwards reload events to a channel.
///
/// Use this when the embedding application decides what a reload means.
#[derive(Debug, Clone)]
pub struct ChannelReloader {
    sender: mpsc::UnboundedSender<ReloadEvent>,
}

impl ChannelReloader {
    pub fn new(sender: mpsc::UnboundedSender<ReloadEvent>) -> Self {
        Self { sender }
    }

    /// Create a reloader together with the receiving end of its channel
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ReloadEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

#[async_trait]
impl Reloader for ChannelReloader {
    async fn reload(&self, event: &ReloadEvent) -> Result<(), ReloadError> {
        self.sender
            .send(event.clone())
            .map_err(|_| ReloadError::ChannelClosed)
    }
}

/// Runs an external command as the reload action and waits for it to exit.
///
/// The previous and current versions are exported to the command as
/// `DEVRELOAD_PREVIOUS_VERSION` and `DEVRELOAD_CURRENT_VERSION`.
#[derive(Debug, Clone)]
pub struct CommandReloader {
    program: String,
    args: Vec<String>,
}

impl CommandReloader {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from a full command line split into words, program first
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

#[async_trait]
impl Reloader for CommandReloader {
    async fn reload(&self, event: &ReloadEvent) -> Result<(), ReloadError> {
        tracing::debug!("Running reload command: {} {:?}", self.program, self.args);

        let status = Command::new(&self.program)
            .args(&self.args)
            .env("DEVRELOAD_PREVIOUS_VERSION", plain(&event.previous))
            .env("DEVRELOAD_CURRENT_VERSION", plain(&event.current))
            .status()
            .await
            .map_err(|e| ReloadError::Spawn(e.to_string()))?;

        if status.success() {
            Ok(())
        } else {
            Err(ReloadError::ExitStatus {
                code: status.code(),
            })
        }
    }
}

/// Version rendered without JSON quoting, for environment variables
fn plain(version: &Version) -> String {
    match version {
        Version::Text(s) => s.clone(),
        Version::Number(n) => n.to_string(),
    }
}
