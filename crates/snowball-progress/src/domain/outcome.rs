//! Results of progress operations and signals from the remote record.

use serde::Serialize;
use snowball_core::ids::SectionId;
use snowball_core::record::ProgressRecord;

/// Which side supplied the progress a session starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressSource {
    /// The remote record was at least as far as the cache.
    Remote,
    /// The cache was further ahead, or the remote could not be reached.
    Cache,
    /// Neither side held anything.
    Fresh,
}

/// Reconciled starting point of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitialProgress {
    pub max_step_reached: u32,
    /// Where the subject was last seen. `None` leaves the choice to the
    /// navigation layer.
    pub current_section: Option<SectionId>,
    pub gate_unlocked: bool,
    pub source: ProgressSource,
}

impl InitialProgress {
    /// State of a subject nobody has seen before.
    #[must_use]
    pub fn fresh() -> Self {
        Self {
            max_step_reached: 0,
            current_section: None,
            gate_unlocked: false,
            source: ProgressSource::Fresh,
        }
    }
}

/// Result of trying to advance the furthest step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The remote record now holds the new step.
    Committed,
    /// Another writer got there first with an equal or larger step; the
    /// larger value has been adopted locally.
    Superseded { remote_max: u32 },
    /// The step was not beyond what is already known. Nothing written.
    AlreadyReached,
    /// Only the cache was updated (offline, or the remote write failed).
    LocalOnly,
    /// The remote record was deleted after this device had seen it. The
    /// step is not written; the pending hard reset will clear it locally.
    RecordGone,
}

/// What the subscription reports about the remote record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteSignal {
    /// A snapshot of the record, including echoes of this device's writes.
    Changed(ProgressRecord),
    /// The record was deleted after having existed.
    HardReset,
}
