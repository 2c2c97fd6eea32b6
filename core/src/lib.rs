//! scratchbuild Core - Foundational Types
//!
//! Error taxonomy, configuration, and diagnostics shared by the stack
//! resolver and the CLI.

pub mod config;
pub mod error;
pub mod event;

// Re-export commonly used types
pub use config::{LibraryConfig, LogLevel, ScratchConfig, DEFAULT_MAX_DEPTH};
pub use error::{Result, ScratchError};
pub use event::{Diagnostic, DiagnosticKind, DiagnosticSink, TracingSink};
