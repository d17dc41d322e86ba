//! # tickwise core library (`tickwise-core`)
//!
//! Foundational services shared by the tickwise crates:
//!
//! - **Error Handling**: [`CoreError`] and the more specific [`ConfigError`] and
//!   [`LoggingError`].
//! - **Configuration**: TOML configuration with default fallbacks and validation,
//!   through [`ConfigLoader`] and [`CoreConfig`].
//! - **Logging**: a `tracing`-based setup with console and rolling-file output in
//!   text or JSON format.
//!
//! ```rust,ignore
//! use tickwise_core::{ConfigLoader, init_logging};
//!
//! let config = ConfigLoader::load(std::path::Path::new("plugins/tickwise"))?;
//! init_logging(&config.logging, false)?;
//! tracing::info!("tickwise core initialized");
//! ```

pub mod config;
pub mod error;
pub mod logging;

pub use config::{ConfigLoader, CoreConfig, LoggingConfig};
pub use error::{ConfigError, CoreError, LoggingError};
pub use logging::{init_logging, init_minimal_logging};
