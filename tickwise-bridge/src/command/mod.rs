//! Command routing between the host and the profiling engine.
//!
//! - [`sender`]: host sender → engine sender normalization.
//! - [`bridge`]: forwarding of commands and tab completions, plus sender enumeration.
//! - [`override_cmd`]: interception of the host's built-in tick-rate command.

pub mod bridge;
pub mod override_cmd;
pub mod sender;

pub use bridge::{CommandBridge, SenderDirectory};
pub use override_cmd::{CommandExecutor, CommandMap, CommandOverrideRegistration, TpsOverride};
pub use sender::{CommandSender, ElevatedSender, HostSender, NormalizedSender, SenderIdentity};
