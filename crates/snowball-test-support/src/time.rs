//! Test time sources.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use snowball_core::error::DomainError;
use snowball_core::time::TimeSource;

/// A time source that always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource(pub DateTime<Utc>);

#[async_trait]
impl TimeSource for FixedTimeSource {
    async fn fetch_now(&self) -> Result<DateTime<Utc>, DomainError> {
        Ok(self.0)
    }
}

/// A time source that is never reachable.
#[derive(Debug, Clone, Copy)]
pub struct FailingTimeSource;

#[async_trait]
impl TimeSource for FailingTimeSource {
    async fn fetch_now(&self) -> Result<DateTime<Utc>, DomainError> {
        Err(DomainError::Infrastructure("time source unreachable".into()))
    }
}
