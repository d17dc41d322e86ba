//! Static identity of the host platform.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    Server,
    Client,
    Proxy,
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformKind::Server => write!(f, "server"),
            PlatformKind::Client => write!(f, "client"),
            PlatformKind::Proxy => write!(f, "proxy"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformInfo {
    pub kind: PlatformKind,
    /// Platform family, e.g. "bukkit".
    pub name: String,
    /// Concrete distribution, e.g. "Paper".
    pub brand: String,
    pub version: String,
    pub runtime_version: String,
}

impl PlatformInfo {
    pub fn unknown() -> Self {
        Self {
            kind: PlatformKind::Server,
            name: "unknown".to_string(),
            brand: "unknown".to_string(),
            version: "unknown".to_string(),
            runtime_version: "unknown".to_string(),
        }
    }
}

impl Default for PlatformInfo {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for PlatformInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({} {})", self.brand, self.version, self.kind, self.name)
    }
}
