//! Manifest loading and validation errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading a story manifest.
#[derive(Debug, Error)]
pub enum StoryError {
    /// The manifest file could not be read.
    #[error("failed to read manifest {path}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The manifest is not valid YAML for the expected shape.
    #[error("invalid manifest: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Two sections share an id.
    #[error("duplicate section id: {0}")]
    DuplicateSection(String),

    /// The declared start section does not exist.
    #[error("start section {0} is not defined")]
    UnknownStart(String),

    /// A transition points at an undefined section.
    #[error("section {from} transitions to undefined section {to}")]
    DanglingTransition {
        /// Section declaring the transition.
        from: String,
        /// Missing target.
        to: String,
    },

    /// More than one section is marked gated.
    #[error("only one gated section is allowed, found {first} and {second}")]
    MultipleGates {
        /// First gated section.
        first: String,
        /// Second gated section.
        second: String,
    },

    /// Two sections on the same branch claim the same step.
    #[error("sections {first} and {second} share step {step} on one branch")]
    StepCollision {
        /// The shared step.
        step: u32,
        /// First section.
        first: String,
        /// Second section.
        second: String,
    },

    /// A riddle section has no riddle key to judge answers against.
    #[error("riddle section {0} has no riddle key")]
    MissingRiddleKey(String),
}
