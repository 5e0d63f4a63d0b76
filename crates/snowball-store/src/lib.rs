//! Snowball storage adapters.
//!
//! Implementations of the ports declared in `snowball-core`: the shared
//! document store (PostgreSQL and in-memory), the device-local cache and
//! the external time source.

pub mod file_cache;
pub mod http_time;
pub mod memory_store;
pub mod pg_document_store;
