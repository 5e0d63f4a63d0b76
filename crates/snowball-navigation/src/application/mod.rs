//! Navigation application services.

pub mod gate;
pub mod listener;
pub mod machine;
pub mod router;
pub mod session;
