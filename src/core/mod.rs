//! Cutlist Core Engine
//!
//! Timeline compilation and segment-based export. Compiles a declarative
//! project into a linear edit plan, resolves interactive clip placement,
//! and renders plans to files through external ffmpeg binaries.

pub mod ffmpeg;
pub mod project;
pub mod render;
pub mod sources;
pub mod timeline;

// Re-export common types
mod types;
pub use types::*;

mod error;
pub use error::*;
