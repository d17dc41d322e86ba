//! Sender normalization.
//!
//! Host bindings implement [`HostSender`] for their own player/console
//! objects. The engine only ever sees [`CommandSender`], built fresh for every
//! inbound event by wrapping the host sender in a [`NormalizedSender`].

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

/// A host-native command source: a connected client or the console.
pub trait HostSender: Send + Sync {
    fn name(&self) -> String;

    /// Stable id for clients; `None` for the console.
    fn unique_id(&self) -> Option<Uuid>;

    fn is_console(&self) -> bool {
        self.unique_id().is_none()
    }

    fn has_permission(&self, permission: &str) -> bool;

    fn send_message(&self, message: &str);

    /// Client locale tag such as `en` or `de_de`, if known.
    fn locale(&self) -> Option<String> {
        None
    }
}

/// Who issued a command, as reported to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SenderIdentity {
    pub name: String,
    pub unique_id: Option<Uuid>,
    pub is_console: bool,
}

impl fmt::Display for SenderIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unique_id {
            Some(id) => write!(f, "{} ({})", self.name, id),
            None => write!(f, "{}", self.name),
        }
    }
}

/// The sender abstraction the profiling engine consumes.
pub trait CommandSender: Send + Sync {
    fn identity(&self) -> SenderIdentity;
    fn has_permission(&self, permission: &str) -> bool;
    fn send_message(&self, message: &str);
}

fn identity_of(sender: &dyn HostSender) -> SenderIdentity {
    SenderIdentity {
        name: sender.name(),
        unique_id: sender.unique_id(),
        is_console: sender.is_console(),
    }
}

/// Passes permission checks and messages straight through to the host sender.
#[derive(Clone)]
pub struct NormalizedSender {
    inner: Arc<dyn HostSender>,
}

impl NormalizedSender {
    pub fn new(inner: Arc<dyn HostSender>) -> Self {
        Self { inner }
    }

    pub fn host_sender(&self) -> &Arc<dyn HostSender> {
        &self.inner
    }
}

impl fmt::Debug for NormalizedSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NormalizedSender")
            .field("identity", &identity_of(self.inner.as_ref()))
            .finish()
    }
}

impl CommandSender for NormalizedSender {
    fn identity(&self) -> SenderIdentity {
        identity_of(self.inner.as_ref())
    }

    fn has_permission(&self, permission: &str) -> bool {
        self.inner.has_permission(permission)
    }

    fn send_message(&self, message: &str) {
        self.inner.send_message(message)
    }
}

/// A sender whose permission checks always pass.
///
/// Only the intercepted built-in command constructs one, after it has checked
/// the real sender itself, and only to forward its single fixed argument.
pub struct ElevatedSender {
    inner: Arc<dyn HostSender>,
}

impl ElevatedSender {
    pub(crate) fn new(inner: Arc<dyn HostSender>) -> Self {
        Self { inner }
    }
}

impl CommandSender for ElevatedSender {
    fn identity(&self) -> SenderIdentity {
        identity_of(self.inner.as_ref())
    }

    fn has_permission(&self, _permission: &str) -> bool {
        true
    }

    fn send_message(&self, message: &str) {
        self.inner.send_message(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalSender;

    #[test]
    fn test_normalized_sender_delegates() {
        let player = LocalSender::player("Notch");
        player.grant("spark");
        let sender = NormalizedSender::new(player.clone());

        assert!(sender.has_permission("spark"));
        assert!(!sender.has_permission("spark.tps"));
        sender.send_message("hello");
        assert_eq!(player.messages(), vec!["hello".to_string()]);

        let identity = sender.identity();
        assert_eq!(identity.name, "Notch");
        assert!(!identity.is_console);
        assert!(identity.unique_id.is_some());
    }

    #[test]
    fn test_elevated_sender_grants_everything_but_keeps_identity() {
        let player = LocalSender::player("Grumm");
        let elevated = ElevatedSender::new(player.clone());

        assert!(!player.has_permission("spark.tps"));
        assert!(elevated.has_permission("spark.tps"));
        assert!(elevated.has_permission("anything.at.all"));
        assert_eq!(elevated.identity().name, "Grumm");

        elevated.send_message("TPS from last 1m: 20.0");
        assert_eq!(player.messages().len(), 1);
    }

    #[test]
    fn test_console_identity_display() {
        let console = LocalSender::console();
        let identity = NormalizedSender::new(console).identity();
        assert!(identity.is_console);
        assert_eq!(identity.to_string(), "CONSOLE");
    }
}
