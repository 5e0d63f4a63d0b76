//! Progress domain types.

pub mod commands;
pub mod outcome;
