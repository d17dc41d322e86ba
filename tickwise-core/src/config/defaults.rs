//! Default configuration values for tickwise.
//!
//! These functions are referenced by `serde`'s `default` attribute in
//! [`super::types`] so that a missing file, section, or field always falls back
//! to a usable value.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::types::{CommandsConfig, IntegrationsConfig, LoggingConfig, MessagesConfig, ServerConfigSettings};

/// Fallback denial text, used when no catalog entry matches at all.
pub const NO_PERMISSION_FALLBACK: &str = "You do not have permission to use this command.";

pub(crate) fn default_logging_config() -> LoggingConfig {
    LoggingConfig {
        level: default_log_level(),
        file_path: default_log_file_path(),
        format: default_log_format(),
    }
}

/// Returns the default log level string (`"info"`).
pub(crate) fn default_log_level() -> String {
    "info".to_string()
}

/// Returns the default log file path (`None`, console only).
pub(crate) fn default_log_file_path() -> Option<PathBuf> {
    None
}

/// Returns the default log format string (`"text"`).
pub(crate) fn default_log_format() -> String {
    "text".to_string()
}

pub(crate) fn default_commands_config() -> CommandsConfig {
    CommandsConfig {
        override_tps_command: default_override_tps_command(),
        tps_permissions: default_tps_permissions(),
        override_label: default_override_label(),
        namespace: default_namespace(),
    }
}

/// The built-in tick-rate command is intercepted unless disabled.
pub(crate) fn default_override_tps_command() -> bool {
    true
}

/// Any one of these grants access to the intercepted command.
pub(crate) fn default_tps_permissions() -> Vec<String> {
    vec![
        "spark".to_string(),
        "spark.tps".to_string(),
        "bukkit.command.tps".to_string(),
    ]
}

pub(crate) fn default_override_label() -> String {
    "tps".to_string()
}

pub(crate) fn default_namespace() -> String {
    "tickwise".to_string()
}

pub(crate) fn default_messages_config() -> MessagesConfig {
    MessagesConfig {
        default_locale: default_locale(),
        no_permission: default_no_permission_messages(),
    }
}

pub(crate) fn default_locale() -> String {
    "en".to_string()
}

pub(crate) fn default_no_permission_messages() -> BTreeMap<String, String> {
    let mut messages = BTreeMap::new();
    messages.insert("en".to_string(), NO_PERMISSION_FALLBACK.to_string());
    messages
}

pub(crate) fn default_server_config_settings() -> ServerConfigSettings {
    ServerConfigSettings {
        hidden_paths: default_hidden_paths(),
    }
}

/// Keys that must never leave the host inside a config snapshot.
pub(crate) fn default_hidden_paths() -> Vec<String> {
    [
        "server-ip",
        "motd",
        "resource-pack",
        "resource-pack-sha1",
        "rcon.password",
        "rcon.port",
        "query.port",
        "level-seed",
        "world-settings.*.feature-seeds",
        "world-settings.*.seed-*",
        "database",
        "settings.bungeecord-addresses",
        "settings.velocity-support.secret",
        "proxies.velocity.secret",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub(crate) fn default_integrations_config() -> IntegrationsConfig {
    IntegrationsConfig {
        placeholder_plugins: default_placeholder_plugins(),
    }
}

pub(crate) fn default_placeholder_plugins() -> Vec<String> {
    vec!["PlaceholderAPI".to_string(), "MVdWPlaceholderAPI".to_string()]
}
