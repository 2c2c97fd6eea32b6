//! Image references and Dockerfile parsing.

pub mod dockerfile;
pub mod reference;

pub use dockerfile::{Dockerfile, Instruction, Keyword};
pub use reference::ImageReference;
