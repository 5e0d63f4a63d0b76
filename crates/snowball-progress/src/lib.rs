//! Snowball: progress store and administrative operations.
//!
//! The progress store is the only writer of the device-local cache and
//! of the shared remote record. It reconciles the two by maximum, guards
//! step writes with a read-compare-write, and turns the remote
//! subscription into signals for the navigation layer. The administrative
//! side steers the same record from outside the subject's device.

pub mod application;
pub mod domain;
