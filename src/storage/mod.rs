//! Encrypted local persistence for trained model artifacts.

mod encrypted;

pub use encrypted::{ArtifactStore, StoredArtifact};
