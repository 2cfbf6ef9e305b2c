//! Artifact persistence
//!
//! Fitted models and preprocessors are written as versioned JSON envelopes
//! and reloaded into equivalent in-memory state.

mod artifact;

pub use artifact::{load_artifact, save_artifact, ArtifactKind, ARTIFACT_FORMAT_VERSION};
