//! Maps class/module identifiers back to the plugin that loaded them.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::error::HostError;
use crate::host::Host;

/// A loaded plugin/module and the package prefixes it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleDescriptor {
    pub name: String,
    pub version: Option<String>,
    pub package_prefixes: Vec<String>,
}

impl ModuleDescriptor {
    pub fn new(name: impl Into<String>, prefixes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            version: None,
            package_prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

pub trait ClassSourceLookup: Send + Sync {
    /// Name of the module that owns `identifier`, if any.
    fn identify(&self, identifier: &str) -> Option<String>;
}

/// Lookup that never attributes anything.
#[derive(Debug, Default)]
pub struct NoopLookup;

impl ClassSourceLookup for NoopLookup {
    fn identify(&self, _identifier: &str) -> Option<String> {
        None
    }
}

/// Longest-prefix index built from the host's loaded-module list at enable.
#[derive(Debug, Default)]
pub struct ModuleIndexLookup {
    // (prefix, module name), longest prefix first
    entries: Vec<(String, String)>,
}

impl ModuleIndexLookup {
    pub fn new(modules: &[ModuleDescriptor]) -> Self {
        let mut entries: Vec<(String, String)> = modules
            .iter()
            .flat_map(|m| {
                m.package_prefixes
                    .iter()
                    .filter(|p| !p.is_empty())
                    .map(move |p| (p.clone(), m.name.clone()))
            })
            .collect();
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        Self { entries }
    }

    pub fn from_host(host: &Arc<dyn Host>) -> Result<Self, HostError> {
        let modules = host.loaded_modules()?;
        debug!(modules = modules.len(), "Indexed loaded modules for class source lookup");
        Ok(Self::new(&modules))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn is_boundary(c: char) -> bool {
    matches!(c, '.' | ':' | '/' | '$')
}

impl ClassSourceLookup for ModuleIndexLookup {
    fn identify(&self, identifier: &str) -> Option<String> {
        self.entries
            .iter()
            .find(|(prefix, _)| {
                identifier.strip_prefix(prefix.as_str()).map_or(false, |rest| {
                    rest.is_empty() || prefix.ends_with(is_boundary) || rest.starts_with(is_boundary)
                })
            })
            .map(|(_, name)| name.clone())
    }
}
