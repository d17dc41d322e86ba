//! Configuration loading for tickwise.
//!
//! [`ConfigLoader`] locates `config.toml` inside the bridge's data directory,
//! deserializes it, falls back to defaults when the file is absent, and then
//! validates and normalizes the result.
//!
//! ```rust,ignore
//! use tickwise_core::config::ConfigLoader;
//!
//! let config = ConfigLoader::load(std::path::Path::new("plugins/tickwise"))?;
//! println!("Logging level: {}", config.logging.level);
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::config::{CoreConfig, MessagesConfig};
use crate::error::{ConfigError, CoreError};

/// Name of the configuration file inside the data directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Namespace for configuration loading. The main entry point is [`ConfigLoader::load`].
pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads and validates the configuration stored in `data_dir`.
    ///
    /// 1. Reads `data_dir/config.toml`. A missing file yields [`CoreConfig::default`];
    ///    any other read failure is a [`ConfigError::ReadError`].
    /// 2. Parses the TOML content ([`ConfigError::ParseError`] on failure). An empty
    ///    file is treated like a missing one.
    /// 3. Validates the result with [`Self::validate_config`].
    pub fn load(data_dir: &Path) -> Result<CoreConfig, CoreError> {
        let config_path = data_dir.join(CONFIG_FILE_NAME);

        let mut config = match fs::read_to_string(&config_path) {
            Ok(content) if content.trim().is_empty() => CoreConfig::default(),
            Ok(content) => Self::parse(&content)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %config_path.display(), "No configuration file found, using defaults");
                CoreConfig::default()
            }
            Err(e) => {
                return Err(CoreError::Config(ConfigError::ReadError {
                    path: config_path,
                    source: e,
                }));
            }
        };

        Self::validate_config(&mut config, data_dir)?;
        Ok(config)
    }

    /// Parses and validates configuration from a string, resolving relative paths against `data_dir`.
    pub fn load_from_str(content: &str, data_dir: &Path) -> Result<CoreConfig, CoreError> {
        let mut config = Self::parse(content)?;
        Self::validate_config(&mut config, data_dir)?;
        Ok(config)
    }

    fn parse(content: &str) -> Result<CoreConfig, CoreError> {
        toml::from_str(content).map_err(|e| CoreError::Config(ConfigError::ParseError(e)))
    }

    /// Validates the loaded `CoreConfig` and normalizes it in place.
    ///
    /// - Log level must be one of "trace", "debug", "info", "warn", "error" (lower-cased).
    /// - Log format must be "text" or "json" (lower-cased).
    /// - A relative log file path is made absolute against `data_dir`.
    /// - The override label must be non-empty and contain no whitespace or `:`.
    /// - At least one permission must grant the intercepted command.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] wrapping [`ConfigError::ValidationError`].
    pub fn validate_config(config: &mut CoreConfig, data_dir: &Path) -> Result<(), CoreError> {
        let level_lower = config.logging.level.to_lowercase();
        match level_lower.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {
                config.logging.level = level_lower;
            }
            _ => {
                return Err(CoreError::Config(ConfigError::ValidationError(format!(
                    "Invalid log level: '{}'. Must be one of trace, debug, info, warn, error.",
                    config.logging.level
                ))));
            }
        }

        let format_lower = config.logging.format.to_lowercase();
        match format_lower.as_str() {
            "text" | "json" => {
                config.logging.format = format_lower;
            }
            _ => {
                return Err(CoreError::Config(ConfigError::ValidationError(format!(
                    "Invalid log format: '{}'. Must be one of text, json.",
                    config.logging.format
                ))));
            }
        }

        if let Some(path) = &config.logging.file_path {
            if !path.is_absolute() {
                config.logging.file_path = Some(data_dir.join(path));
            }
        }

        let label = config.commands.override_label.trim();
        if label.is_empty() || label.contains(char::is_whitespace) || label.contains(':') {
            return Err(CoreError::Config(ConfigError::ValidationError(format!(
                "Invalid override_label: '{}'. Must be a single word without ':'.",
                config.commands.override_label
            ))));
        }
        config.commands.override_label = label.to_lowercase();

        config.commands.tps_permissions.retain(|p| !p.trim().is_empty());
        if config.commands.tps_permissions.is_empty() {
            return Err(CoreError::Config(ConfigError::ValidationError(
                "commands.tps_permissions must list at least one permission.".to_string(),
            )));
        }

        config.messages.default_locale = MessagesConfig::normalize_locale(&config.messages.default_locale);
        config.messages.no_permission = std::mem::take(&mut config.messages.no_permission)
            .into_iter()
            .map(|(locale, text)| (MessagesConfig::normalize_locale(&locale), text))
            .collect();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ConfigLoader::load(dir.path()).unwrap();
        assert_eq!(config, CoreConfig::default());
    }

    #[test]
    fn test_load_empty_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "   \n").unwrap();
        let config = ConfigLoader::load(dir.path()).unwrap();
        assert_eq!(config, CoreConfig::default());
    }

    #[test]
    fn test_load_normalizes_values() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"
[logging]
level = "DEBUG"
format = "Json"
file_path = "logs/bridge.log"

[commands]
override_label = "TPS"
"#,
        )
        .unwrap();

        let config = ConfigLoader::load(dir.path()).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.file_path, Some(dir.path().join("logs/bridge.log")));
        assert_eq!(config.commands.override_label, "tps");
    }

    #[test]
    fn test_absolute_log_path_kept() {
        let config = ConfigLoader::load_from_str(
            "[logging]\nfile_path = \"/var/log/tickwise.log\"\n",
            Path::new("/srv/data"),
        )
        .unwrap();
        assert_eq!(config.logging.file_path, Some(PathBuf::from("/var/log/tickwise.log")));
    }

    #[test]
    fn test_invalid_level_rejected() {
        let result = ConfigLoader::load_from_str("[logging]\nlevel = \"supertrace\"\n", Path::new("."));
        match result {
            Err(CoreError::Config(ConfigError::ValidationError(msg))) => {
                assert!(msg.contains("supertrace"));
            }
            other => panic!("Unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_format_rejected() {
        let result = ConfigLoader::load_from_str("[logging]\nformat = \"xml\"\n", Path::new("."));
        assert!(matches!(result, Err(CoreError::Config(ConfigError::ValidationError(_)))));
    }

    #[test]
    fn test_empty_permission_list_rejected() {
        let result = ConfigLoader::load_from_str("[commands]\ntps_permissions = [\"\", \" \"]\n", Path::new("."));
        assert!(matches!(result, Err(CoreError::Config(ConfigError::ValidationError(_)))));
    }

    #[test]
    fn test_namespaced_label_rejected() {
        let result = ConfigLoader::load_from_str("[commands]\noverride_label = \"bukkit:tps\"\n", Path::new("."));
        assert!(matches!(result, Err(CoreError::Config(ConfigError::ValidationError(_)))));
    }

    #[test]
    fn test_message_locales_are_normalized() {
        let config = ConfigLoader::load_from_str(
            r#"
[messages]
default_locale = "EN"

[messages.no_permission]
EN = "No permission."
pt_BR = "Sem permissão."
"de-DE" = "Keine Berechtigung."
"#,
            Path::new("."),
        )
        .unwrap();

        let messages = &config.messages;
        assert_eq!(messages.default_locale, "en");
        assert!(messages.no_permission.contains_key("pt_br"));
        assert!(messages.no_permission.contains_key("de_de"));
        assert_eq!(messages.no_permission_for(Some("pt_BR")), "Sem permissão.");
        assert_eq!(messages.no_permission_for(Some("pt-br")), "Sem permissão.");
        assert_eq!(messages.no_permission_for(Some("de_DE")), "Keine Berechtigung.");
        assert_eq!(messages.no_permission_for(Some("fr_FR")), "No permission.");
        assert_eq!(messages.no_permission_for(None), "No permission.");
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "[logging\nlevel = ").unwrap();
        let result = ConfigLoader::load(dir.path());
        assert!(matches!(result, Err(CoreError::Config(ConfigError::ParseError(_)))));
    }

    #[test]
    fn test_unreadable_config_is_read_error() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be cannot be read as a string.
        fs::create_dir(dir.path().join(CONFIG_FILE_NAME)).unwrap();
        let result = ConfigLoader::load(dir.path());
        assert!(matches!(result, Err(CoreError::Config(ConfigError::ReadError { .. }))));
    }
}
