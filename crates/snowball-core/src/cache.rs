//! Device-local progress cache port.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Wire shape of the local cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedProgress {
    /// Furthest step this device has confirmed.
    pub max_step_reached: u32,
}

/// Advisory device-local mirror of the furthest step.
///
/// Never authoritative: it is reconciled against the remote record by
/// taking the maximum, and cleared when the remote record is deleted.
pub trait LocalCache: Send + Sync {
    /// Reads the cached step, `None` when nothing is cached.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the backing storage fails.
    fn load(&self) -> Result<Option<u32>, DomainError>;

    /// Overwrites the cached step.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the backing storage fails.
    fn store(&self, max_step_reached: u32) -> Result<(), DomainError>;

    /// Removes the cached entry.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the backing storage fails.
    fn clear(&self) -> Result<(), DomainError>;
}
