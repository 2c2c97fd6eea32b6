//! Library resolvers: locate Dockerfile sources for official images.
//!
//! A resolver maps a tagged `library/` reference to a local directory that
//! contains the image's `Dockerfile`. Sources are expected to be checked out
//! already; nothing here touches the network.

use std::collections::HashMap;
use std::path::PathBuf;

use scratchbuild_core::config::LibraryConfig;
use scratchbuild_core::error::{Result, ScratchError};

use crate::oci::reference::ImageReference;

/// Resolves Dockerfile source directories for library images.
pub trait LibraryResolver {
    /// Directory holding the Dockerfile for `reference`.
    ///
    /// `reference` always carries a tag.
    fn library_source(&self, reference: &ImageReference) -> Result<PathBuf>;
}

impl<R: LibraryResolver + ?Sized> LibraryResolver for &R {
    fn library_source(&self, reference: &ImageReference) -> Result<PathBuf> {
        (**self).library_source(reference)
    }
}

impl<R: LibraryResolver + ?Sized> LibraryResolver for Box<R> {
    fn library_source(&self, reference: &ImageReference) -> Result<PathBuf> {
        (**self).library_source(reference)
    }
}

/// Build the resolver described by the configuration.
pub fn resolver_from_config(config: &LibraryConfig) -> Box<dyn LibraryResolver> {
    match config {
        LibraryConfig::None => Box::new(NoLibrary),
        LibraryConfig::Directory { root } => Box::new(DirectoryResolver::new(root.clone())),
        LibraryConfig::Manifest { manifests, sources } => {
            Box::new(ManifestResolver::new(manifests.clone(), sources.clone()))
        }
    }
}

fn source_error(reference: &ImageReference, message: impl Into<String>) -> ScratchError {
    ScratchError::LibrarySource {
        image: reference.name(),
        message: message.into(),
    }
}

fn tag_of(reference: &ImageReference) -> Result<&str> {
    reference
        .tag
        .as_deref()
        .ok_or_else(|| source_error(reference, "reference has no tag"))
}

/// Resolver with no sources; every lookup fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLibrary;

impl LibraryResolver for NoLibrary {
    fn library_source(&self, reference: &ImageReference) -> Result<PathBuf> {
        Err(source_error(reference, "no library source configured"))
    }
}

/// Sources laid out as `<root>/<image>/<tag>/`.
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    root: PathBuf,
}

impl DirectoryResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl LibraryResolver for DirectoryResolver {
    fn library_source(&self, reference: &ImageReference) -> Result<PathBuf> {
        let tag = tag_of(reference)?;
        let dir = self.root.join(reference.familiar_name()).join(tag);
        if !dir.is_dir() {
            return Err(source_error(
                reference,
                format!("source directory {} does not exist", dir.display()),
            ));
        }
        tracing::debug!(image = %reference, path = %dir.display(), "Resolved library source");
        Ok(dir)
    }
}

/// Sources described by docker-library official-images manifests.
///
/// `manifests/<image>` lists tag entries; each names a `GitRepo` and a
/// `Directory` within it. Repositories are checked out under
/// `sources/<repo name>/`.
#[derive(Debug, Clone)]
pub struct ManifestResolver {
    manifests: PathBuf,
    sources: PathBuf,
}

impl ManifestResolver {
    pub fn new(manifests: impl Into<PathBuf>, sources: impl Into<PathBuf>) -> Self {
        Self {
            manifests: manifests.into(),
            sources: sources.into(),
        }
    }

    fn manifest_path(&self, reference: &ImageReference) -> PathBuf {
        self.manifests.join(reference.familiar_name())
    }
}

impl LibraryResolver for ManifestResolver {
    fn library_source(&self, reference: &ImageReference) -> Result<PathBuf> {
        let tag = tag_of(reference)?;
        let path = self.manifest_path(reference);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            source_error(
                reference,
                format!("cannot read manifest {}: {}", path.display(), e),
            )
        })?;

        let manifest = Manifest::parse(&content);
        let entry = manifest
            .entry_for_tag(tag)
            .ok_or_else(|| source_error(reference, format!("no manifest entry for tag {}", tag)))?;

        let repo = entry
            .get("GitRepo")
            .and_then(|url| repo_dir_name(url))
            .ok_or_else(|| {
                source_error(reference, format!("entry for tag {} has no GitRepo", tag))
            })?;
        let directory = entry.get("Directory").map(String::as_str).unwrap_or(".");

        let dir = self.sources.join(repo).join(directory);
        tracing::debug!(
            image = %reference,
            path = %dir.display(),
            "Resolved library source from manifest"
        );
        Ok(dir)
    }
}

/// Last path segment of a git URL, without `.git`.
fn repo_dir_name(url: &str) -> Option<&str> {
    let trimmed = url.trim().trim_end_matches('/');
    let last = trimmed.rsplit(['/', ':']).next()?;
    let name = last.strip_suffix(".git").unwrap_or(last);
    (!name.is_empty()).then_some(name)
}

/// Parsed official-images manifest (RFC 2822-style paragraphs).
#[derive(Debug, Default)]
struct Manifest {
    /// Fields of the first paragraph, inherited by every entry
    global: HashMap<String, String>,
    entries: Vec<HashMap<String, String>>,
}

impl Manifest {
    fn parse(content: &str) -> Self {
        let mut paragraphs: Vec<HashMap<String, String>> = Vec::new();
        let mut current: HashMap<String, String> = HashMap::new();
        let mut last_key: Option<String> = None;

        for line in content.lines() {
            if line.trim_start().starts_with('#') {
                continue;
            }
            if line.trim().is_empty() {
                if !current.is_empty() {
                    paragraphs.push(std::mem::take(&mut current));
                }
                last_key = None;
                continue;
            }

            if line.starts_with(char::is_whitespace) {
                // Continuation of the previous field
                if let Some(value) = last_key.as_ref().and_then(|k| current.get_mut(k)) {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            }

            if let Some((key, value)) = line.split_once(':') {
                let key = key.trim().to_string();
                current.insert(key.clone(), value.trim().to_string());
                last_key = Some(key);
            }
        }
        if !current.is_empty() {
            paragraphs.push(current);
        }

        let mut paragraphs = paragraphs.into_iter();
        let global = paragraphs.next().unwrap_or_default();
        Manifest {
            global,
            entries: paragraphs.collect(),
        }
    }

    /// Entry listing `tag` in `Tags` or `SharedTags`, merged over the globals.
    fn entry_for_tag(&self, tag: &str) -> Option<HashMap<String, String>> {
        let has_tag = |entry: &HashMap<String, String>| {
            ["Tags", "SharedTags"].iter().any(|field| {
                entry
                    .get(*field)
                    .map(|tags| tags.split(',').any(|t| t.trim() == tag))
                    .unwrap_or(false)
            })
        };

        let entry = self.entries.iter().find(|e| has_tag(*e))?;
        let mut merged = self.global.clone();
        merged.extend(entry.iter().map(|(k, v)| (k.clone(), v.clone())));
        Some(merged)
    }
}
