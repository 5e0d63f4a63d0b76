//! Remote-command listener.
//!
//! Interprets signals from the shared record into commands for the
//! navigation machine. Pure: it reads the context and never changes it.

use snowball_core::record::ProgressRecord;
use snowball_progress::domain::outcome::RemoteSignal;

use crate::domain::commands::RemoteCommand;
use crate::domain::context::NavigationContext;

/// Commands implied by `signal`, in the order they must be applied.
///
/// `is_own_write` recognises snapshots caused by this device; those never
/// move the subject, since the device already shows what it wrote.
pub fn interpret(
    signal: &RemoteSignal,
    context: &NavigationContext,
    is_own_write: impl Fn(&ProgressRecord) -> bool,
) -> Vec<RemoteCommand> {
    let record = match signal {
        RemoteSignal::HardReset => return vec![RemoteCommand::Reset],
        RemoteSignal::Changed(record) => record,
    };

    let mut commands = Vec::new();
    if record.max_step_reached > context.max_step() {
        commands.push(RemoteCommand::AdoptMaxStep(record.max_step_reached));
    }
    if record.gate_unlocked && !context.gate_unlocked() {
        commands.push(RemoteCommand::UnlockGate);
    }
    if let Some(section) = &record.current_section {
        if context.current() != Some(section) && !is_own_write(record) {
            commands.push(RemoteCommand::Teleport(section.clone()));
        }
    }
    commands
}
