//! Progress application services.

pub mod admin;
pub mod command_handlers;
pub mod feed;
pub mod progress_store;
pub mod query_handlers;
