//! Navigation domain types.

pub mod commands;
pub mod context;
pub mod events;
pub mod ports;
