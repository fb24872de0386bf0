//! Module containing concrete implementations from the [core](crate::core) module.

/// Embedding cache on the local file system.
pub mod cache;

/// Embedder selection.
pub mod embedder;

/// [Generator](crate::core::generator::Generator) implementations.
pub mod generator;

/// Engine construction from configuration.
pub mod state;

/// Vector store implementations.
pub mod vector;
