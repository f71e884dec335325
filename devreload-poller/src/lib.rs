//! # devreload-poller
//!
//! Development-time live reload: poll a dev server for its current version and
//! trigger a reload as soon as it differs from the version you started with.
//!
//! The server side is expected to answer `GET /__dev_reload_check__` with a
//! JSON object such as `{"version": "abc123"}` or `{"version": 7}`. Any other
//! fields are ignored.
//!
//! # Example
//!
//! ```no_run
//! use reload_poller::{ChannelReloader, Poller, PollerConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (reloader, mut reloads) = ChannelReloader::channel();
//!     let config = PollerConfig::new().with_base_url("http://localhost:8000");
//!
//!     let poller = Poller::http(config, "abc123", Arc::new(reloader))?;
//!     let _handle = poller.start();
//!
//!     if let Some(event) = reloads.recv().await {
//!         println!("server moved from {} to {}", event.previous, event.current);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Check failures (server down, mid-rebuild HTML, bad JSON) are logged and
//! retried on the next firing; they never stop the timer or trigger a reload.

mod config;
mod error;
pub mod logging;
mod poller;
mod reload;
mod source;
mod version;

pub use config::{PollerConfig, DEFAULT_CHECK_PATH};
pub use error::{CheckError, PollerError, PollerResult, ReloadError};
pub use poller::{
    CheckOutcome, Poller, PollerExit, PollerHandle, PollerState, PollerStats, StopSignal,
};
pub use reload::{ChannelReloader, CommandReloader, ReloadEvent, Reloader};
pub use source::{HttpVersionSource, VersionSource};
pub use version::{Version, VersionResponse, VersionState};
