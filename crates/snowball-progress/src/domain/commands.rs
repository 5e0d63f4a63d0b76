//! Administrative commands against the shared progress record.

use snowball_core::command::Command;
use snowball_core::ids::{RecordKey, SectionId};
use uuid::Uuid;

/// Command to open the gate ahead of its scheduled time.
#[derive(Debug, Clone)]
pub struct UnlockGate {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The record to modify.
    pub key: RecordKey,
}

impl Command for UnlockGate {
    fn command_type(&self) -> &'static str {
        "progress.unlock_gate"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to move the subject to a section.
#[derive(Debug, Clone)]
pub struct Teleport {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The record to modify.
    pub key: RecordKey,
    /// The destination section.
    pub section: SectionId,
}

impl Command for Teleport {
    fn command_type(&self) -> &'static str {
        "progress.teleport"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to delete every riddle attempt while keeping progress.
#[derive(Debug, Clone)]
pub struct ClearHistory {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The record whose attempts are removed.
    pub key: RecordKey,
}

impl Command for ClearHistory {
    fn command_type(&self) -> &'static str {
        "progress.clear_history"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to delete the record and its attempts.
#[derive(Debug, Clone)]
pub struct HardReset {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The record to delete.
    pub key: RecordKey,
}

impl Command for HardReset {
    fn command_type(&self) -> &'static str {
        "progress.hard_reset"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_types_are_namespaced() {
        let key = RecordKey::default();
        let correlation_id = Uuid::new_v4();

        let types = [
            UnlockGate { correlation_id, key: key.clone() }.command_type(),
            Teleport {
                correlation_id,
                key: key.clone(),
                section: SectionId::from("pause"),
            }
            .command_type(),
            ClearHistory { correlation_id, key: key.clone() }.command_type(),
            HardReset { correlation_id, key }.command_type(),
        ];

        assert!(types.iter().all(|t| t.starts_with("progress.")));
    }
}
