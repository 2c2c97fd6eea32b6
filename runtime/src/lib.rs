//! scratchbuild runtime - image stack resolution.
//!
//! Resolves the `FROM` ancestry of an image into an [`ImageStack`], rebases
//! it on architecture-specific base images and renders it back to
//! Dockerfile text.

#![allow(clippy::result_large_err)]

pub mod arch;
pub mod library;
pub mod oci;
pub mod stack;

// Re-export common types
pub use arch::{Arch, ArchTable, OfficialArchTable};
pub use library::{
    resolver_from_config, DirectoryResolver, LibraryResolver, ManifestResolver, NoLibrary,
};
pub use oci::{Dockerfile, ImageReference, Instruction, Keyword};
pub use stack::{
    ImageLayer, ImageStack, LayerKind, LayerReport, ResolveOptions, StackBuilder, StackReport,
};
