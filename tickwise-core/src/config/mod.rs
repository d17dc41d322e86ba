//! Configuration management for tickwise.
//!
//! - [`types`]: the configuration schema ([`CoreConfig`] and its sections).
//! - [`defaults`]: default values used when a file, section, or key is missing.
//! - [`loader`]: [`ConfigLoader`], which reads `config.toml` from the data directory,
//!   applies defaults, and validates the result.
//!
//! ## Loading process
//!
//! 1. `ConfigLoader::load(data_dir)` reads `data_dir/config.toml`.
//! 2. If the file does not exist, a default `CoreConfig` is used.
//! 3. Otherwise its TOML content is parsed; errors map to [`crate::error::ConfigError::ParseError`].
//! 4. The result is validated and normalized (log level/format, relative log path,
//!    command override settings); failures map to [`crate::error::ConfigError::ValidationError`].

pub mod defaults;
pub mod loader;
pub mod types;

pub use loader::{ConfigLoader, CONFIG_FILE_NAME};
pub use types::{
    CommandsConfig, CoreConfig, IntegrationsConfig, LoggingConfig, MessagesConfig, ServerConfigSettings,
};
