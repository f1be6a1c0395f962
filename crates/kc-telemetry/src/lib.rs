//! # KC Telemetry
//!
//! Logging setup shared by the contract engine and its tools.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kc_telemetry::{init_logging, TelemetryConfig};
//!
//! fn main() {
//!     init_logging(&TelemetryConfig::from_env()).expect("logging");
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `KC_LOG_LEVEL` | `info` | Log filter, falls back to `RUST_LOG` |
//! | `KC_JSON_LOGS` | `false` | JSON lines instead of pretty output |
//! | `KC_SERVICE_NAME` | `kc-engine` | Service name in the startup line |

#![warn(missing_docs)]

mod config;
mod logging;

pub use config::{TelemetryConfig, DEFAULT_SERVICE_NAME};
pub use logging::init_logging;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// A global subscriber is already installed.
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),

    /// The configuration could not be applied.
    #[error("Invalid configuration: {0}")]
    Config(String),
}
