//! Filtered snapshots of the host's configuration files.
//!
//! Files are parsed into JSON values so the engine sees one shape regardless
//! of the on-disk format. Keys matching a hidden path are stripped before the
//! snapshot leaves this module.

use std::collections::BTreeMap;
use std::sync::Arc;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::host::Host;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigFormat {
    Properties,
    Toml,
    Json,
}

/// A raw configuration file as handed over by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub name: String,
    pub format: ConfigFormat,
    pub contents: String,
}

impl ConfigFile {
    pub fn new(name: impl Into<String>, format: ConfigFormat, contents: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            format,
            contents: contents.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServerConfigSnapshot {
    pub files: BTreeMap<String, Value>,
}

impl ServerConfigSnapshot {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn file(&self, name: &str) -> Option<&Value> {
        self.files.get(name)
    }
}

pub trait ServerConfigProvider: Send + Sync {
    /// Never fails; unreadable files are left out.
    fn snapshot(&self) -> ServerConfigSnapshot;
}

/// Dotted-path globs naming keys that must never be reported.
///
/// `*` matches within a single path segment, so `world-settings.*.seed-*`
/// hides `world-settings.default.seed-village` but not deeper keys.
#[derive(Debug, Clone, Default)]
pub struct HiddenPathFilter {
    patterns: Vec<Regex>,
}

impl HiddenPathFilter {
    pub fn new(paths: &[String]) -> Self {
        let patterns = paths
            .iter()
            .filter_map(|path| {
                let body = path
                    .split('*')
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join("[^.]*");
                match Regex::new(&format!("^{}$", body)) {
                    Ok(re) => Some(re),
                    Err(e) => {
                        warn!(path = %path, error = %e, "Ignoring unusable hidden config path");
                        None
                    }
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn is_hidden(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(path))
    }

    /// Removes every hidden key from `value`, recursing into nested tables.
    pub fn apply(&self, value: &mut Value) {
        self.apply_at("", value);
    }

    fn apply_at(&self, prefix: &str, value: &mut Value) {
        if let Value::Object(map) = value {
            map.retain(|key, _| !self.is_hidden(&join_path(prefix, key)));
            for (key, child) in map.iter_mut() {
                self.apply_at(&join_path(prefix, key), child);
            }
        }
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

fn parse_properties(contents: &str) -> Value {
    let mut map = Map::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let (key, raw) = match line.find(|c: char| c == '=' || c == ':') {
            Some(idx) => (line[..idx].trim(), line[idx + 1..].trim()),
            None => (line, ""),
        };
        map.insert(key.to_string(), property_value(raw));
    }
    Value::Object(map)
}

fn property_value(raw: &str) -> Value {
    if let Ok(b) = raw.parse::<bool>() {
        return Value::Bool(b);
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Value::from(n);
    }
    Value::String(raw.to_string())
}

fn parse_file(file: &ConfigFile) -> Result<Value, String> {
    match file.format {
        ConfigFormat::Properties => Ok(parse_properties(&file.contents)),
        ConfigFormat::Toml => {
            let parsed: toml::Value = toml::from_str(&file.contents).map_err(|e| e.to_string())?;
            serde_json::to_value(parsed).map_err(|e| e.to_string())
        }
        ConfigFormat::Json => serde_json::from_str(&file.contents).map_err(|e| e.to_string()),
    }
}

/// Reads [`Host::config_files`] and applies the hidden-path filter.
pub struct HostConfigFiles {
    host: Arc<dyn Host>,
    filter: HiddenPathFilter,
}

impl HostConfigFiles {
    pub fn new(host: Arc<dyn Host>, hidden_paths: &[String]) -> Self {
        Self {
            host,
            filter: HiddenPathFilter::new(hidden_paths),
        }
    }
}

impl ServerConfigProvider for HostConfigFiles {
    fn snapshot(&self) -> ServerConfigSnapshot {
        let files = match self.host.config_files() {
            Ok(files) => files,
            Err(e) => {
                warn!(error = %e, "Server config query failed, reporting an empty snapshot");
                return ServerConfigSnapshot::default();
            }
        };

        let mut snapshot = ServerConfigSnapshot::default();
        for file in files {
            match parse_file(&file) {
                Ok(mut value) => {
                    self.filter.apply(&mut value);
                    snapshot.files.insert(file.name, value);
                }
                Err(reason) => {
                    debug!(file = %file.name, %reason, "Skipping unparsable config file");
                }
            }
        }
        snapshot
    }
}
