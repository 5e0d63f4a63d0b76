//! Command handlers for administrative operations.
//!
//! Each handler validates its command against the section graph where
//! needed and applies it to the shared record. The subject's device picks
//! the change up through its subscription.

use snowball_core::clock::Clock;
use snowball_core::command::Command;
use snowball_core::error::DomainError;
use snowball_core::record::ProgressPatch;
use snowball_core::store::ProgressDocumentStore;
use snowball_story::SectionGraph;
use tracing::info;

use crate::domain::commands::{ClearHistory, HardReset, Teleport, UnlockGate};

/// Writer identity stamped on administrative writes.
pub const ADMIN_WRITER: &str = "admin";

/// Handles the `UnlockGate` command: sets `gateUnlocked` on the record.
/// The last writer is left as it was.
///
/// # Errors
///
/// Returns `DomainError` if the merge-write fails.
pub async fn handle_unlock_gate(
    command: &UnlockGate,
    clock: &dyn Clock,
    store: &dyn ProgressDocumentStore,
) -> Result<(), DomainError> {
    let patch = ProgressPatch::gate_unlock(clock.now(), None);
    store.merge_write(&command.key, &patch).await?;
    info!(
        command = command.command_type(),
        correlation_id = %command.correlation_id,
        "gate unlocked"
    );
    Ok(())
}

/// Handles the `Teleport` command: moves `currentSection` to a known
/// section.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the section is not in the graph.
/// Returns `DomainError` if the merge-write fails.
pub async fn handle_teleport(
    command: &Teleport,
    graph: &SectionGraph,
    clock: &dyn Clock,
    store: &dyn ProgressDocumentStore,
) -> Result<(), DomainError> {
    if graph.get(&command.section).is_none() {
        return Err(DomainError::Validation(format!(
            "unknown section: {}",
            command.section
        )));
    }
    let patch = ProgressPatch::location(
        command.section.clone(),
        clock.now(),
        Some(ADMIN_WRITER.to_owned()),
    );
    store.merge_write(&command.key, &patch).await?;
    info!(
        command = command.command_type(),
        correlation_id = %command.correlation_id,
        section = %command.section,
        "subject teleported"
    );
    Ok(())
}

/// Handles the `ClearHistory` command: deletes every attempt, leaving
/// progress untouched. Returns how many attempts were removed.
///
/// # Errors
///
/// Returns `DomainError` if the deletion fails.
pub async fn handle_clear_history(
    command: &ClearHistory,
    store: &dyn ProgressDocumentStore,
) -> Result<u64, DomainError> {
    let removed = store.clear_attempts(&command.key).await?;
    info!(
        command = command.command_type(),
        correlation_id = %command.correlation_id,
        removed,
        "attempt history cleared"
    );
    Ok(removed)
}

/// Handles the `HardReset` command: deletes the attempts, then the
/// record itself. Returns how many attempts were removed.
///
/// # Errors
///
/// Returns `DomainError` if either deletion fails. Attempts may already
/// be gone when the record deletion fails.
pub async fn handle_hard_reset(
    command: &HardReset,
    store: &dyn ProgressDocumentStore,
) -> Result<u64, DomainError> {
    let removed = store.clear_attempts(&command.key).await?;
    store.delete(&command.key).await?;
    info!(
        command = command.command_type(),
        correlation_id = %command.correlation_id,
        removed,
        "progress hard reset"
    );
    Ok(removed)
}
