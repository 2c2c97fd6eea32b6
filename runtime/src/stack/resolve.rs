//! FROM-chain resolution.
//!
//! Walks the `FROM` references of a Dockerfile down to `scratch` or to the
//! first image whose source cannot be found. Structural problems in a
//! Dockerfile (no `FROM`, empty `FROM`, unparsable reference) abort the
//! walk; an upstream source that cannot be located, read or parsed only
//! turns that layer into a pull leaf and is reported as a diagnostic.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use scratchbuild_core::config::DEFAULT_MAX_DEPTH;
use scratchbuild_core::error::{Result, ScratchError};
use scratchbuild_core::event::{Diagnostic, DiagnosticKind, DiagnosticSink};

use super::{ImageLayer, ImageStack};
use crate::library::LibraryResolver;
use crate::oci::dockerfile::{expand_args, Dockerfile};
use crate::oci::reference::ImageReference;

/// Tag assumed for library images referenced without one.
const DEFAULT_TAG: &str = "latest";

/// Options for a resolution.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Maximum number of layers in the stack
    pub max_depth: usize,
    /// Build arguments applied to the target Dockerfile's `FROM`
    pub build_args: HashMap<String, String>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            build_args: HashMap::new(),
        }
    }
}

/// Resolves image stacks against a library resolver.
pub struct StackBuilder<R, S> {
    resolver: R,
    sink: S,
    options: ResolveOptions,
}

/// Outcome of looking up the source of a freshly appended layer.
enum Lookup {
    /// Source parsed; keep walking
    Continue,
    /// Layer is a leaf
    Done,
}

impl<R: LibraryResolver, S: DiagnosticSink> StackBuilder<R, S> {
    pub fn new(resolver: R, sink: S) -> Self {
        Self {
            resolver,
            sink,
            options: ResolveOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    /// Give back the diagnostic sink.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Resolve the full stack of `target` built from Dockerfile `source`.
    pub fn build(&mut self, target: ImageReference, source: &str) -> Result<ImageStack> {
        self.build_layer(ImageLayer::new(target), source)
    }

    /// Resolve the stack of the image built in `build_dir`.
    ///
    /// A relative `dockerfile_path` is taken relative to `build_dir`, which
    /// is recorded as the path of the top layer.
    pub fn build_from_path(
        &mut self,
        build_dir: &Path,
        dockerfile_path: &Path,
        target_tag: &str,
    ) -> Result<ImageStack> {
        let target: ImageReference = target_tag.parse()?;

        let dockerfile_path = if dockerfile_path.is_absolute() {
            dockerfile_path.to_path_buf()
        } else {
            build_dir.join(dockerfile_path)
        };
        let source = std::fs::read_to_string(&dockerfile_path).map_err(|e| {
            ScratchError::DockerfileParse(format!(
                "Failed to read Dockerfile at {}: {}",
                dockerfile_path.display(),
                e
            ))
        })?;

        let mut top = ImageLayer::new(target);
        top.path = Some(build_dir.to_path_buf());
        self.build_layer(top, &source)
    }

    fn build_layer(&mut self, mut top: ImageLayer, source: &str) -> Result<ImageStack> {
        top.parse_dockerfile(source)?;

        let mut stack = ImageStack {
            reference: top.reference.clone(),
            layers: vec![top],
        };
        self.resolve(&mut stack)?;
        Ok(stack)
    }

    /// Extend the stack from its last layer until a leaf is reached.
    fn resolve(&mut self, stack: &mut ImageStack) -> Result<()> {
        loop {
            let Some(last) = stack.layers.last() else {
                return Ok(());
            };
            let Some(dockerfile) = last.dockerfile.as_ref() else {
                return Ok(());
            };
            if last.reference.is_scratch() {
                return Ok(());
            }

            let args = if stack.layers.len() == 1 {
                Some(&self.options.build_args)
            } else {
                None
            };
            let reference = base_reference(dockerfile, args)?;

            // Layer 0 comes from the build directory, so only library layers count
            if stack.layers[1..].iter().any(|l| l.reference == reference) {
                return Err(ScratchError::CycleDetected {
                    reference: reference.to_string(),
                });
            }
            if stack.layers.len() >= self.options.max_depth {
                return Err(ScratchError::DepthExceeded {
                    max_depth: self.options.max_depth,
                });
            }

            stack.layers.push(ImageLayer::new(reference));
            let index = stack.layers.len() - 1;
            match self.lookup_source(&mut stack.layers[index]) {
                Lookup::Continue => continue,
                Lookup::Done => return Ok(()),
            }
        }
    }

    /// Find and parse the Dockerfile source of a newly appended layer.
    fn lookup_source(&mut self, layer: &mut ImageLayer) -> Lookup {
        if layer.reference.is_scratch() {
            return Lookup::Done;
        }

        let image = layer.reference.name();
        if !layer.reference.is_library() {
            self.sink.emit(Diagnostic::new(
                DiagnosticKind::NotLibraryImage,
                image,
                "Not a library image, cannot determine Dockerfile source",
            ));
            return Lookup::Done;
        }

        let tagged = match layer.reference.tag {
            Some(_) => layer.reference.clone(),
            None => {
                tracing::debug!(image = %image, "No tag given, assuming latest");
                layer.reference.with_tag(DEFAULT_TAG)
            }
        };

        let src_path = match self.resolver.library_source(&tagged) {
            Ok(path) => path,
            Err(e) => {
                self.sink.emit(Diagnostic::new(
                    DiagnosticKind::ResolverFailed,
                    image,
                    format!("Unable to resolve library source: {}", e),
                ));
                return Lookup::Done;
            }
        };
        layer.path = Some(src_path.clone());

        let df_path: PathBuf = src_path.join("Dockerfile");
        let source = match std::fs::read_to_string(&df_path) {
            Ok(source) => source,
            Err(e) => {
                self.sink.emit(
                    Diagnostic::new(
                        DiagnosticKind::DockerfileMissing,
                        image,
                        format!("Unable to find Dockerfile: {}", e),
                    )
                    .with_path(df_path),
                );
                return Lookup::Done;
            }
        };

        match Dockerfile::parse(&source) {
            Ok(dockerfile) => {
                layer.dockerfile = Some(dockerfile);
                Lookup::Continue
            }
            Err(e) => {
                self.sink.emit(
                    Diagnostic::new(
                        DiagnosticKind::DockerfileInvalid,
                        image,
                        format!("Unable to parse library Dockerfile: {}", e),
                    )
                    .with_path(df_path),
                );
                Lookup::Done
            }
        }
    }
}

/// Reference named by the first `FROM` of `dockerfile`.
///
/// `ARG` defaults declared before the `FROM` are substituted, with
/// `build_args` taking precedence over them.
fn base_reference(
    dockerfile: &Dockerfile,
    build_args: Option<&HashMap<String, String>>,
) -> Result<ImageReference> {
    let index = dockerfile.first_from_index().ok_or(ScratchError::MissingFrom)?;
    let from = &dockerfile.instructions[index];

    let image = match from.argument() {
        Some(arg) if !arg.trim().is_empty() => arg,
        _ => {
            return Err(ScratchError::InvalidFrom {
                original: from.original.clone(),
            })
        }
    };

    let mut args = dockerfile.args_before(index);
    if let Some(build_args) = build_args {
        args.extend(build_args.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    let image = expand_args(image, &args);

    ImageReference::parse(&image).map_err(|e| {
        let detail = match e {
            ScratchError::InvalidReference(message) => message,
            other => other.to_string(),
        };
        ScratchError::InvalidReference(format!(
            "Error parsing FROM line '{}': {}",
            from.original, detail
        ))
    })
}
