//! Snowball: section graph.
//!
//! Static, read-only description of every narrative section: its step,
//! branch membership and forward transitions. Loaded once at startup
//! from a YAML manifest and validated before use.

pub mod error;
pub mod graph;
pub mod path;
pub mod section;

pub use error::StoryError;
pub use graph::SectionGraph;
pub use section::{Branch, Presentation, Section, SectionKind, StoryManifest, Transition};
