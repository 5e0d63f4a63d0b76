//! Command abstractions.

use uuid::Uuid;

/// Trait implemented by every command that mutates progress, whether it
/// originates from the subject's device or from the administrator.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// The type name for this command (for logging/routing).
    fn command_type(&self) -> &'static str;

    /// Correlation ID to trace this command through the system.
    fn correlation_id(&self) -> Uuid;
}
