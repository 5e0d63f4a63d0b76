//! Snowball Core: shared domain vocabulary.
//!
//! This crate defines the identifiers, the persisted progress shapes and
//! the ports (document store, local cache, clock, time source) that every
//! other crate depends on. It contains no infrastructure code.

pub mod cache;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod ids;
pub mod record;
pub mod store;
pub mod time;
