//! The core module defines the business logic of ragkit.
//! It provides the traits and models upstream adapters need to implement.

pub mod chunk;
pub mod document;
pub mod engine;
pub mod generator;
pub mod vector;
