/// Concrete implementations of the [core] module.
pub mod app;

/// Command line interface.
pub mod cli;

/// Application configuration.
pub mod config;

/// Core business logic.
pub mod core;

/// Error types.
pub mod error;

/// Subscriber setup and log file rotation.
pub mod logging;
