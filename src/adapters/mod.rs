//! Adapter interfaces for external systems.
//!
//! The emotion classifier is the only external collaborator; it is reached
//! through the [`TagProvider`] trait.

pub mod classifier;

pub use classifier::{FileTagProvider, TagProvider};
