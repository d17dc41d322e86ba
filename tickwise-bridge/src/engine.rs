//! The profiling engine boundary.
//!
//! The engine is an external collaborator: the bridge constructs it through an
//! [`EngineFactory`], hands it the resolved providers in an [`EngineContext`],
//! and forwards commands to it. Everything the bridge needs back is declared in
//! [`ProfilingEngine`].

use std::error::Error;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::capability::CapabilitySet;
use crate::command::bridge::SenderDirectory;
use crate::command::sender::CommandSender;
use crate::host::Host;
use crate::selector::ProviderSet;

/// Error type for engine-side failures, which the bridge only ever reports.
pub type EngineResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Read access to the engine's own configuration.
pub trait EngineConfiguration: Send + Sync {
    fn get_boolean(&self, key: &str, default: bool) -> bool;
}

/// Engine configuration held as a JSON object.
#[derive(Debug, Clone, Default)]
pub struct JsonConfiguration {
    root: Map<String, Value>,
}

impl JsonConfiguration {
    pub fn new(root: Map<String, Value>) -> Self {
        Self { root }
    }

    /// Anything other than a JSON object yields an empty configuration.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(root) => Self { root },
            _ => Self::default(),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.root.insert(key.into(), value.into());
    }
}

impl EngineConfiguration for JsonConfiguration {
    fn get_boolean(&self, key: &str, default: bool) -> bool {
        self.root.get(key).and_then(Value::as_bool).unwrap_or(default)
    }
}

pub trait ProfilingEngine: Send + Sync {
    /// Starts the engine. An error aborts bridge startup.
    fn enable(&self) -> EngineResult<()>;

    fn disable(&self);

    fn execute_command(&self, sender: &dyn CommandSender, args: &[String]);

    /// Completion candidates, in the order they should be shown.
    fn tab_complete_command(&self, sender: &dyn CommandSender, args: &[String]) -> Vec<String>;

    fn configuration(&self) -> &dyn EngineConfiguration;

    /// Text for a placeholder key, for third-party text-substitution integrations.
    fn resolve_placeholder(&self, _key: &str, _sender: Option<&dyn CommandSender>) -> Option<String> {
        None
    }
}

/// What the engine receives at construction.
#[derive(Clone)]
pub struct EngineContext {
    pub host: Arc<dyn Host>,
    pub capabilities: CapabilitySet,
    pub providers: Arc<ProviderSet>,
    pub senders: SenderDirectory,
}

pub trait EngineFactory: Send + Sync {
    fn create(&self, context: EngineContext) -> EngineResult<Arc<dyn ProfilingEngine>>;
}

impl<F> EngineFactory for F
where
    F: Fn(EngineContext) -> EngineResult<Arc<dyn ProfilingEngine>> + Send + Sync,
{
    fn create(&self, context: EngineContext) -> EngineResult<Arc<dyn ProfilingEngine>> {
        self(context)
    }
}
