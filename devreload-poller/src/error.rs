//! Error types for the devreload-poller crate.

/// Failure of a single check cycle.
///
/// Every variant is handled the same way: logged, then retried by the next
/// timer firing.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    /// The request never produced a response
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-success status
    #[error("Server returned HTTP {status}")]
    HttpStatus {
        /// The HTTP status code
        status: u16,
    },

    /// The body was not JSON or did not carry a usable `version` field
    #[error("Failed to parse version response: {0}")]
    Parse(String),

    /// The version changed but the reload action failed
    #[error("Reload failed: {0}")]
    Reload(#[from] ReloadError),
}

/// Errors from reload actions.
#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    /// The reload command could not be started
    #[error("Failed to spawn reload command: {0}")]
    Spawn(String),

    /// The reload command exited unsuccessfully
    #[error("Reload command exited with status {code:?}")]
    ExitStatus {
        /// Exit code, absent when the process was killed by a signal
        code: Option<i32>,
    },

    /// Nobody is listening for reload events anymore
    #[error("Reload channel closed")]
    ChannelClosed,
}

/// Errors from poller setup and lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum PollerError {
    /// Invalid configuration provided
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The polling task panicked or was aborted
    #[error("Polling task failed: {0}")]
    TaskJoin(String),
}

/// Convenience type alias for Results using PollerError.
pub type PollerResult<T> = std::result::Result<T, PollerError>;
