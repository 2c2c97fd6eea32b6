//! Image stacks: the ancestry of an image as an ordered list of layers.
//!
//! Index 0 is the image being built; each following layer is the base of
//! the one before it, down to `scratch` or to an image that has to be
//! pulled because no Dockerfile source is available for it.
//!
//! ```text
//! myapp:1.0            (built from ./Dockerfile)
//!   └── golang:1.18    (built from library source)
//!         └── scratch
//! ```

mod rebase;
mod resolve;

use std::path::{Path, PathBuf};

use serde::Serialize;

use scratchbuild_core::error::Result;
use scratchbuild_core::event::TracingSink;

use crate::library::LibraryResolver;
use crate::oci::dockerfile::Dockerfile;
use crate::oci::reference::ImageReference;

pub use resolve::{ResolveOptions, StackBuilder};

/// Separator line between layers in the multi-document Dockerfile form.
pub const LAYER_SEPARATOR: &str = "---";

/// A layer in a stack.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageLayer {
    /// Name/tag/digest of this image
    pub reference: ImageReference,
    /// Parsed Dockerfile, present when source was found and parsed
    pub dockerfile: Option<Dockerfile>,
    /// Directory the Dockerfile was loaded from
    pub path: Option<PathBuf>,
}

impl ImageLayer {
    pub fn new(reference: ImageReference) -> Self {
        Self {
            reference,
            dockerfile: None,
            path: None,
        }
    }

    /// Parse `source` and attach it as this layer's Dockerfile.
    pub fn parse_dockerfile(&mut self, source: &str) -> Result<()> {
        self.dockerfile = Some(Dockerfile::parse(source)?);
        Ok(())
    }

    /// Whether the layer has to be pulled from a registry instead of built.
    pub fn is_pull(&self) -> bool {
        self.dockerfile.is_none() && !self.reference.is_scratch()
    }

    /// Point the first `FROM` of this layer's Dockerfile at `reference`.
    pub fn rewrite_from(&mut self, reference: &ImageReference) {
        let Some(from) = self.dockerfile.as_mut().and_then(Dockerfile::first_from_mut) else {
            return;
        };
        from.set_argument(reference.to_string());
    }

    /// Dockerfile text equivalent to the original source.
    pub fn to_dockerfile(&self) -> String {
        self.dockerfile
            .as_ref()
            .map(Dockerfile::render)
            .unwrap_or_default()
    }

    fn kind(&self) -> LayerKind {
        if self.reference.is_scratch() {
            LayerKind::Scratch
        } else if self.dockerfile.is_some() {
            LayerKind::Build
        } else {
            LayerKind::Pull
        }
    }
}

/// An image represented as a stack of layers.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageStack {
    /// Reference of the originally requested image
    pub reference: ImageReference,
    /// Layers, from top to bottom
    pub layers: Vec<ImageLayer>,
}

impl ImageStack {
    /// Resolve the full stack of `target` built from Dockerfile `source`.
    ///
    /// Degraded lookups are logged through `tracing`.
    pub fn build<R: LibraryResolver>(
        target: ImageReference,
        source: &str,
        resolver: R,
    ) -> Result<Self> {
        StackBuilder::new(resolver, TracingSink).build(target, source)
    }

    /// Resolve the stack of the image built in `build_dir`.
    ///
    /// A relative `dockerfile_path` is taken relative to `build_dir`.
    pub fn from_path<R: LibraryResolver>(
        build_dir: &Path,
        dockerfile_path: &Path,
        target_tag: &str,
        resolver: R,
    ) -> Result<Self> {
        StackBuilder::new(resolver, TracingSink).build_from_path(
            build_dir,
            dockerfile_path,
            target_tag,
        )
    }

    /// Produce the layer Dockerfiles as one document, separated by `---`.
    ///
    /// Layers without a Dockerfile contribute nothing.
    pub fn to_dockerfile(&self) -> String {
        self.layers
            .iter()
            .map(ImageLayer::to_dockerfile)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(&format!("{}\n", LAYER_SEPARATOR))
    }

    /// Structured description of the stack.
    pub fn describe(&self) -> StackReport {
        StackReport {
            reference: self.reference.to_string(),
            layers: self
                .layers
                .iter()
                .map(|layer| LayerReport {
                    reference: layer.reference.to_string(),
                    name: layer.reference.name(),
                    tag: layer.reference.tag.clone(),
                    kind: layer.kind(),
                    path: layer.path.clone(),
                    instructions: layer
                        .dockerfile
                        .as_ref()
                        .map_or(0, |df| df.instructions.len()),
                })
                .collect(),
        }
    }
}

impl std::fmt::Display for ImageStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for layer in &self.layers {
            write!(f, "{}", layer.reference)?;
            if layer.is_pull() {
                f.write_str(" [pull]")?;
            }
            f.write_str(" ")?;
        }
        Ok(())
    }
}

/// How a layer is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    /// Built from a Dockerfile
    Build,
    /// Pulled from a registry
    Pull,
    /// The empty base
    Scratch,
}

/// Serializable summary of a stack.
#[derive(Debug, Clone, Serialize)]
pub struct StackReport {
    pub reference: String,
    pub layers: Vec<LayerReport>,
}

/// Serializable summary of one layer.
#[derive(Debug, Clone, Serialize)]
pub struct LayerReport {
    pub reference: String,
    pub name: String,
    pub tag: Option<String>,
    pub kind: LayerKind,
    pub path: Option<PathBuf>,
    pub instructions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(reference: &str, source: Option<&str>) -> ImageLayer {
        let mut layer = ImageLayer::new(ImageReference::parse(reference).unwrap());
        if let Some(source) = source {
            layer.parse_dockerfile(source).unwrap();
        }
        layer
    }

    fn stack(layers: Vec<ImageLayer>) -> ImageStack {
        ImageStack {
            reference: layers[0].reference.clone(),
            layers,
        }
    }

    #[test]
    fn test_layer_to_dockerfile_empty_without_source() {
        assert_eq!(layer("alpine:3.19", None).to_dockerfile(), "");
    }

    #[test]
    fn test_layer_to_dockerfile_flattens_continuations() {
        let l = layer(
            "myapp:1.0",
            Some("# app\nFROM golang:1.18\nRUN go build \\\n    ./...\nCMD [\"/app\"]\n"),
        );
        assert_eq!(
            l.to_dockerfile(),
            "FROM golang:1.18\nRUN go build ./...\nCMD [\"/app\"]\n"
        );
    }

    #[test]
    fn test_stack_to_dockerfile_joins_non_empty_layers() {
        let s = stack(vec![
            layer("myapp:1.0", Some("FROM golang:1.18\nRUN make\n")),
            layer("golang:1.18", Some("FROM scratch\nADD go.tar /\n")),
            layer("scratch", None),
        ]);
        assert_eq!(
            s.to_dockerfile(),
            "FROM golang:1.18\nRUN make\n---\nFROM scratch\nADD go.tar /\n"
        );
    }

    #[test]
    fn test_stack_to_dockerfile_skips_pull_layer_in_middle() {
        let s = stack(vec![
            layer("myapp:1.0", Some("FROM alpine\n")),
            layer("alpine", None),
        ]);
        assert_eq!(s.to_dockerfile(), "FROM alpine\n");
    }

    #[test]
    fn test_summary_marks_pull_layers() {
        let s = stack(vec![
            layer("myapp:1.0", Some("FROM arm64v8/golang:1.18\n")),
            layer("arm64v8/golang:1.18", None),
        ]);
        assert_eq!(s.to_string(), "myapp:1.0 arm64v8/golang:1.18 [pull] ");
    }

    #[test]
    fn test_summary_scratch_is_not_pull() {
        let s = stack(vec![
            layer("myapp:1.0", Some("FROM golang:1.18\n")),
            layer("golang:1.18", Some("FROM scratch\n")),
            layer("scratch", None),
        ]);
        assert_eq!(s.to_string(), "myapp:1.0 golang:1.18 scratch ");
    }

    #[test]
    fn test_rewrite_from() {
        let mut l = layer("myapp:1.0", Some("ARG X=1\nFROM golang:1.18 AS build\nFROM build\n"));
        l.rewrite_from(&ImageReference::parse("arm64v8/golang:1.18").unwrap());
        let df = l.dockerfile.as_ref().unwrap();
        assert_eq!(df.instructions[1].original, "FROM arm64v8/golang:1.18");
        assert_eq!(df.instructions[2].original, "FROM build");
    }

    #[test]
    fn test_rewrite_from_without_dockerfile_is_noop() {
        let mut l = layer("alpine", None);
        l.rewrite_from(&ImageReference::parse("arm64v8/alpine").unwrap());
        assert!(l.dockerfile.is_none());
    }

    #[test]
    fn test_describe() {
        let mut top = layer("myapp:1.0", Some("FROM node:18\nRUN npm ci\n"));
        top.path = Some(PathBuf::from("/src/app"));
        let s = stack(vec![top, layer("node:18", None)]);

        let report = s.describe();
        assert_eq!(report.reference, "myapp:1.0");
        assert_eq!(report.layers[0].kind, LayerKind::Build);
        assert_eq!(report.layers[0].instructions, 2);
        assert_eq!(report.layers[1].kind, LayerKind::Pull);
        assert_eq!(report.layers[1].name, "library/node");

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["layers"][1]["kind"], "pull");
        assert_eq!(json["layers"][0]["path"], "/src/app");
    }
}
