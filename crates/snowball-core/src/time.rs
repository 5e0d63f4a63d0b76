//! External time source port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DomainError;

/// Best-effort source of real-world time that does not depend on the
/// device clock. Callers fall back to a [`crate::clock::Clock`] on error.
#[async_trait]
pub trait TimeSource: Send + Sync {
    /// Fetches the current time.
    async fn fetch_now(&self) -> Result<DateTime<Utc>, DomainError>;
}
