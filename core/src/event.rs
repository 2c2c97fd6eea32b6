//! Structured diagnostics emitted while resolving an image stack.
//!
//! Degraded resolution paths (an upstream source that cannot be found or
//! parsed) never fail the build; they are reported to a [`DiagnosticSink`]
//! supplied by the caller instead.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Kind of diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Base image is not an official library image; no source lookup
    NotLibraryImage,
    /// Library resolver could not provide a source directory
    ResolverFailed,
    /// Source directory has no readable Dockerfile
    DockerfileMissing,
    /// Upstream Dockerfile failed to parse
    DockerfileInvalid,
}

impl DiagnosticKind {
    /// Stable event key.
    pub fn key(&self) -> &'static str {
        match self {
            DiagnosticKind::NotLibraryImage => events::NOT_LIBRARY_IMAGE,
            DiagnosticKind::ResolverFailed => events::RESOLVER_FAILED,
            DiagnosticKind::DockerfileMissing => events::DOCKERFILE_MISSING,
            DiagnosticKind::DockerfileInvalid => events::DOCKERFILE_INVALID,
        }
    }

    /// Whether the diagnostic means the stack is shallower than it could be.
    pub fn is_warning(&self) -> bool {
        !matches!(self, DiagnosticKind::NotLibraryImage)
    }
}

/// A single diagnostic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,

    /// Image name the diagnostic is about (e.g. "library/golang")
    pub image: String,

    /// Filesystem path involved, if any
    pub path: Option<PathBuf>,

    pub message: String,

    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl Diagnostic {
    /// Create a new diagnostic
    pub fn new(kind: DiagnosticKind, image: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            image: image.into(),
            path: None,
            message: message.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    /// Attach a path
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Receiver for diagnostics.
pub trait DiagnosticSink {
    fn emit(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn emit(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    fn emit(&mut self, diagnostic: Diagnostic) {
        (**self).emit(diagnostic);
    }
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&mut self, diagnostic: Diagnostic) {
        let path = diagnostic
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        if diagnostic.kind.is_warning() {
            tracing::warn!(
                image = %diagnostic.image,
                event = diagnostic.kind.key(),
                path = %path,
                "{}",
                diagnostic.message
            );
        } else {
            tracing::debug!(
                image = %diagnostic.image,
                event = diagnostic.kind.key(),
                "{}",
                diagnostic.message
            );
        }
    }
}

/// Event catalog - diagnostic keys
pub mod events {
    pub const NOT_LIBRARY_IMAGE: &str = "stack.layer.not_library";
    pub const RESOLVER_FAILED: &str = "stack.library.resolve_failed";
    pub const DOCKERFILE_MISSING: &str = "stack.dockerfile.missing";
    pub const DOCKERFILE_INVALID: &str = "stack.dockerfile.invalid";
}
