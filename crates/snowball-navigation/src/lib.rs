//! Snowball: navigation.
//!
//! The state machine that decides which section the subject sees, the
//! listener that turns remote record changes into commands, the
//! address-bar router and the session loop tying them together.

pub mod application;
pub mod domain;

#[cfg(test)]
pub(crate) mod testing;
