//! Periodic gate re-check.
//!
//! While the subject waits on the gated section a background task asks
//! the time source whether the unlock instant has passed. The task never
//! touches navigation state itself; it sends a [`GateSignal`] tagged
//! with the visit it was started for, and the machine drops signals from
//! earlier visits.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use snowball_core::clock::Clock;
use snowball_core::time::TimeSource;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::debug;

/// Default interval between gate re-checks.
pub const DEFAULT_GATE_POLL: Duration = Duration::from_secs(30);

/// The unlock instant has passed, as observed during visit `epoch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateSignal {
    pub epoch: u64,
}

pub type GateSender = mpsc::UnboundedSender<GateSignal>;
pub type GateReceiver = mpsc::UnboundedReceiver<GateSignal>;

/// Creates the channel gate watches report on.
#[must_use]
pub fn gate_channel() -> (GateSender, GateReceiver) {
    mpsc::unbounded_channel()
}

/// Current time from `time`, falling back to `clock` when unreachable.
pub async fn trusted_now(time: &dyn TimeSource, clock: &dyn Clock) -> DateTime<Utc> {
    match time.fetch_now().await {
        Ok(now) => now,
        Err(e) => {
            debug!(error = %e, "time source unavailable, using local clock");
            clock.now()
        }
    }
}

/// Inputs of one gate watch.
pub(crate) struct GateWatch {
    pub(crate) epoch: u64,
    pub(crate) unlock_at: DateTime<Utc>,
    pub(crate) poll: Duration,
    pub(crate) time: Arc<dyn TimeSource>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) signals: GateSender,
}

impl GateWatch {
    /// Spawns the watch. The first check runs immediately; the task ends
    /// after reporting, when aborted, or when nobody listens any more.
    pub(crate) fn spawn(self) -> AbortHandle {
        tokio::spawn(async move {
            loop {
                let now = trusted_now(self.time.as_ref(), self.clock.as_ref()).await;
                if now >= self.unlock_at {
                    debug!(epoch = self.epoch, "gate time reached");
                    let _ = self.signals.send(GateSignal { epoch: self.epoch });
                    break;
                }
                if self.signals.is_closed() {
                    break;
                }
                tokio::time::sleep(self.poll).await;
            }
        })
        .abort_handle()
    }
}
