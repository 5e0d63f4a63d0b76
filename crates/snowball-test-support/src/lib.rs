//! Shared test mocks and utilities for Snowball.

mod cache;
mod clock;
mod store;
mod time;

pub use cache::{FailingCache, MemoryCache};
pub use clock::FixedClock;
pub use store::{
    FailingDocumentStore, FlakyDocumentStore, HangingDocumentStore, InterferingDocumentStore,
    Interference,
};
pub use time::{FailingTimeSource, FixedTimeSource};
