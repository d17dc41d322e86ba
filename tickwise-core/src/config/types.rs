//! Configuration data structures for tickwise.
//!
//! These structs are populated by deserializing `config.toml`. Every field has a
//! default from [`super::defaults`], and `#[serde(deny_unknown_fields)]` rejects
//! typos instead of silently ignoring them.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use super::defaults;

/// Configuration settings for the logging subsystem.
///
/// # Examples
///
/// ```
/// use tickwise_core::config::LoggingConfig;
/// use std::path::PathBuf;
///
/// let default_log_config = LoggingConfig::default();
/// assert_eq!(default_log_config.level, "info");
/// assert_eq!(default_log_config.file_path, None);
/// assert_eq!(default_log_config.format, "text");
///
/// let toml_str = r#"
/// level = "debug"
/// file_path = "/var/log/tickwise.log"
/// format = "json"
/// "#;
/// let log_config: LoggingConfig = toml::from_str(toml_str).unwrap();
/// assert_eq!(log_config.level, "debug");
/// assert_eq!(log_config.file_path, Some(PathBuf::from("/var/log/tickwise.log")));
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Minimum level to record: "trace", "debug", "info", "warn" or "error" (case-insensitive).
    #[serde(default = "defaults::default_log_level")]
    pub level: String,
    /// Optional log file. Relative paths are resolved against the data directory.
    #[serde(default = "defaults::default_log_file_path")]
    pub file_path: Option<PathBuf>,
    /// "text" or "json".
    #[serde(default = "defaults::default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        defaults::default_logging_config()
    }
}

/// Settings for command routing and the intercepted built-in command.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandsConfig {
    /// Whether the host's built-in tick-rate command is replaced by ours.
    /// The engine configuration key `overrideTpsCommand` takes precedence when present.
    #[serde(default = "defaults::default_override_tps_command")]
    pub override_tps_command: bool,
    /// Equivalent permissions; holding any one of them grants access.
    #[serde(default = "defaults::default_tps_permissions")]
    pub tps_permissions: Vec<String>,
    /// Label of the host command to intercept.
    #[serde(default = "defaults::default_override_label")]
    pub override_label: String,
    /// Namespace used for the fallback `<namespace>:<label>` alias.
    #[serde(default = "defaults::default_namespace")]
    pub namespace: String,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        defaults::default_commands_config()
    }
}

/// User-facing message catalog, keyed by locale.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessagesConfig {
    #[serde(default = "defaults::default_locale")]
    pub default_locale: String,
    #[serde(default = "defaults::default_no_permission_messages")]
    pub no_permission: BTreeMap<String, String>,
}

impl MessagesConfig {
    /// Picks the permission-denied text for a sender's locale.
    ///
    /// Lookup order: exact locale, its language part (`de_DE` → `de`), the
    /// configured default locale, then a built-in English string.
    pub fn no_permission_for(&self, locale: Option<&str>) -> &str {
        if let Some(locale) = locale {
            let normalized = Self::normalize_locale(locale);
            if let Some(text) = self.message_for(&normalized) {
                return text;
            }
            if let Some(language) = normalized.split('_').next() {
                if let Some(text) = self.message_for(language) {
                    return text;
                }
            }
        }
        self.message_for(&Self::normalize_locale(&self.default_locale))
            .unwrap_or(defaults::NO_PERMISSION_FALLBACK)
    }

    /// Canonical form of a locale tag: lower-case, `_` as separator (`pt-BR` → `pt_br`).
    pub fn normalize_locale(locale: &str) -> String {
        locale.trim().to_lowercase().replace('-', "_")
    }

    /// Catalog entry for an already-normalized locale. Keys that were not
    /// normalized at load time still match.
    fn message_for(&self, normalized: &str) -> Option<&str> {
        self.no_permission
            .get(normalized)
            .or_else(|| {
                self.no_permission
                    .iter()
                    .find(|(key, _)| Self::normalize_locale(key) == normalized)
                    .map(|(_, text)| text)
            })
            .map(String::as_str)
    }
}

impl Default for MessagesConfig {
    fn default() -> Self {
        defaults::default_messages_config()
    }
}

/// Controls what server configuration is exposed to the profiling engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfigSettings {
    /// Dotted key paths removed from every config snapshot. `*` matches one path segment
    /// or, inside a segment, any run of characters.
    #[serde(default = "defaults::default_hidden_paths")]
    pub hidden_paths: Vec<String>,
}

impl Default for ServerConfigSettings {
    fn default() -> Self {
        defaults::default_server_config_settings()
    }
}

/// Optional third-party integrations, detected by plugin name at enable time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntegrationsConfig {
    #[serde(default = "defaults::default_placeholder_plugins")]
    pub placeholder_plugins: Vec<String>,
}

impl Default for IntegrationsConfig {
    fn default() -> Self {
        defaults::default_integrations_config()
    }
}

/// Root configuration structure.
///
/// ```
/// use tickwise_core::config::CoreConfig;
///
/// let loaded: CoreConfig = toml::from_str(r#"
/// [commands]
/// override_tps_command = false
/// "#).unwrap();
/// assert!(!loaded.commands.override_tps_command);
/// assert_eq!(loaded.commands.override_label, "tps");
/// assert_eq!(loaded.logging.level, "info");
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoreConfig {
    #[serde(default = "defaults::default_logging_config")]
    pub logging: LoggingConfig,
    #[serde(default = "defaults::default_commands_config")]
    pub commands: CommandsConfig,
    #[serde(default = "defaults::default_messages_config")]
    pub messages: MessagesConfig,
    #[serde(default = "defaults::default_server_config_settings")]
    pub server_config: ServerConfigSettings,
    #[serde(default = "defaults::default_integrations_config")]
    pub integrations: IntegrationsConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            logging: defaults::default_logging_config(),
            commands: defaults::default_commands_config(),
            messages: defaults::default_messages_config(),
            server_config: defaults::default_server_config_settings(),
            integrations: defaults::default_integrations_config(),
        }
    }
}
