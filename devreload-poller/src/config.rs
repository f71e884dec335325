//! Configuration types for the devreload-poller crate
//!
//! [`PollerConfig`] controls where the poller looks for the server version
//! and how often it asks.

use std::time::Duration;
use url::Url;

use crate::error::PollerError;

/// Path the development server answers version checks on.
pub const DEFAULT_CHECK_PATH: &str = "/__dev_reload_check__";

/// Configuration for a [`Poller`](crate::Poller)
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Base URL of the development server
    /// Default: http://localhost:8000
    pub base_url: String,

    /// Path of the version endpoint
    /// Default: /__dev_reload_check__
    pub check_path: String,

    /// Time between timer firings
    /// Default: 1 second
    pub poll_interval: Duration,

    /// Timeout for a single version request
    /// Default: none (client default)
    pub request_timeout: Option<Duration>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            check_path: DEFAULT_CHECK_PATH.to_string(),
            poll_interval: Duration::from_millis(1000),
            request_timeout: None,
        }
    }
}

impl PollerConfig {
    /// Create a new PollerConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<(), PollerError> {
        if self.poll_interval == Duration::ZERO {
            return Err(PollerError::Configuration(
                "Poll interval must be greater than 0".to_string(),
            ));
        }

        if !self.check_path.starts_with('/') {
            return Err(PollerError::Configuration(format!(
                "Check path must start with '/': {}",
                self.check_path
            )));
        }

        if self.request_timeout == Some(Duration::ZERO) {
            return Err(PollerError::Configuration(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        self.check_url().map(|_| ())
    }

    /// Full URL of the version endpoint
    pub fn check_url(&self) -> Result<Url, PollerError> {
        let base = Url::parse(&self.base_url).map_err(|e| {
            PollerError::Configuration(format!("Invalid base URL '{}': {}", self.base_url, e))
        })?;

        match base.scheme() {
            "http" | "https" => {}
            other => {
                return Err(PollerError::Configuration(format!(
                    "Unsupported URL scheme '{other}', expected http or https"
                )))
            }
        }

        base.join(&self.check_path).map_err(|e| {
            PollerError::Configuration(format!("Invalid check path '{}': {}", self.check_path, e))
        })
    }

    /// Builder pattern methods for fluent configuration

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_check_path(mut self, path: impl Into<String>) -> Self {
        self.check_path = path.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}
