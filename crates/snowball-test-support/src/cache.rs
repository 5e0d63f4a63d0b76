//! Test caches: in-memory `LocalCache` implementations.

use std::sync::Mutex;

use snowball_core::cache::LocalCache;
use snowball_core::error::DomainError;

/// A cache held in memory; share it through `Arc` to inspect it after use.
#[derive(Debug, Default)]
pub struct MemoryCache {
    value: Mutex<Option<u32>>,
}

impl MemoryCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache already holding `max_step_reached`.
    #[must_use]
    pub fn holding(max_step_reached: u32) -> Self {
        Self {
            value: Mutex::new(Some(max_step_reached)),
        }
    }

    /// Returns the cached value without going through the trait.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn peek(&self) -> Option<u32> {
        *self.value.lock().unwrap()
    }
}

impl LocalCache for MemoryCache {
    fn load(&self) -> Result<Option<u32>, DomainError> {
        Ok(*self.value.lock().unwrap())
    }

    fn store(&self, max_step_reached: u32) -> Result<(), DomainError> {
        *self.value.lock().unwrap() = Some(max_step_reached);
        Ok(())
    }

    fn clear(&self) -> Result<(), DomainError> {
        *self.value.lock().unwrap() = None;
        Ok(())
    }
}

/// A cache whose storage always fails.
#[derive(Debug, Default)]
pub struct FailingCache;

impl LocalCache for FailingCache {
    fn load(&self) -> Result<Option<u32>, DomainError> {
        Err(DomainError::Infrastructure("storage unavailable".into()))
    }

    fn store(&self, _max_step_reached: u32) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("storage unavailable".into()))
    }

    fn clear(&self) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("storage unavailable".into()))
    }
}
