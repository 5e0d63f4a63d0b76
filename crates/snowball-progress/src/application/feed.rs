//! Live feed of remote progress changes.

use std::sync::Arc;

use snowball_core::store::RecordSubscription;
use tracing::info;

use crate::application::progress_store::ProgressStore;
use crate::domain::outcome::RemoteSignal;

/// Turns raw record snapshots into [`RemoteSignal`]s, updating the
/// store's local knowledge on the way.
#[derive(Debug)]
pub struct ProgressFeed {
    store: Arc<ProgressStore>,
    subscription: Option<RecordSubscription>,
}

impl ProgressFeed {
    pub(crate) fn new(store: Arc<ProgressStore>, subscription: RecordSubscription) -> Self {
        Self {
            store,
            subscription: Some(subscription),
        }
    }

    pub(crate) fn closed(store: Arc<ProgressStore>) -> Self {
        Self {
            store,
            subscription: None,
        }
    }

    /// Whether the feed can still deliver signals.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.subscription.is_some()
    }

    /// Waits for the next signal. Returns `None` once the subscription
    /// has ended; the feed stays closed afterwards.
    ///
    /// Cancel safe: dropping the future loses no snapshot.
    pub async fn next(&mut self) -> Option<RemoteSignal> {
        loop {
            let subscription = self.subscription.as_mut()?;
            let Some(snapshot) = subscription.next().await else {
                info!(key = %self.store.key(), "remote subscription ended");
                self.subscription = None;
                return None;
            };
            if let Some(signal) = self.store.observe(snapshot) {
                return Some(signal);
            }
        }
    }
}
