//! Embeddable core library for projfix.
//!
//! Provides a clap-free, I/O-abstracted entry point suitable for linking
//! into another host process.
//!
//! # Port traits
//!
//! All I/O is abstracted behind port traits in [`ports`]:
//! - [`ProjectSource`](ports::ProjectSource): discover and read project files
//! - [`WritePort`](ports::WritePort): write files and create directories
//!
//! The [`adapters`] module provides default filesystem-backed implementations.
//!
//! # Entry points
//!
//! - [`run_fix`](pipeline::run_fix): normalize every discovered project, report + patch
//! - [`normalize_text`](pipeline::normalize_text): normalize one project held in memory

pub mod adapters;
pub mod pipeline;
pub mod ports;
pub mod settings;

// Re-export the engine options so callers don't need projfix-domain directly.
pub use projfix_domain::NormalizeOptions;
