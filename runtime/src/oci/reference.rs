//! OCI image reference parsing.
//!
//! Parses image references like `golang:1.18` or `ghcr.io/org/app:v1` into
//! structured components. Docker Hub references are normalized the way the
//! Docker CLI does it: single-component names live in the `library/`
//! namespace, and the familiar form hides both the registry and that prefix.

use scratchbuild_core::error::{Result, ScratchError};

/// Default registry when none is specified.
pub const DEFAULT_REGISTRY: &str = "docker.io";

/// Namespace of official images on Docker Hub.
pub const LIBRARY_NAMESPACE: &str = "library/";

/// The "no base image" pseudo-image.
pub const SCRATCH: &str = "scratch";

/// Maximum tag length accepted by registries.
const MAX_TAG_LEN: usize = 128;

/// Parsed OCI image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Registry hostname (e.g., "ghcr.io", "docker.io")
    pub registry: String,
    /// Repository path (e.g., "library/nginx", "arm64v8/golang")
    pub repository: String,
    /// Tag (e.g., "latest", "1.18")
    pub tag: Option<String>,
    /// Digest (e.g., "sha256:abc123...")
    pub digest: Option<String>,
}

impl ImageReference {
    /// Parse an image reference string.
    ///
    /// Supports formats:
    /// - `scratch` → scratch (sentinel, never namespaced)
    /// - `nginx` → docker.io/library/nginx
    /// - `nginx:1.25` → docker.io/library/nginx:1.25
    /// - `myuser/myimage` → docker.io/myuser/myimage
    /// - `ghcr.io/org/image:tag` → ghcr.io/org/image:tag
    /// - `ghcr.io/org/image@sha256:abc...` → ghcr.io/org/image@sha256:abc...
    ///
    /// No default tag is applied.
    pub fn parse(reference: &str) -> Result<Self> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(ScratchError::InvalidReference(
                "Empty image reference".to_string(),
            ));
        }

        // Split off digest first (@ separator)
        let (name_tag, digest) = match reference.rsplit_once('@') {
            Some((name_tag, digest)) => {
                Self::validate_digest(reference, digest)?;
                (name_tag, Some(digest.to_string()))
            }
            None => (reference, None),
        };

        // Tag is after the last colon, but only if that colon follows the last
        // slash; otherwise the colon belongs to a registry port.
        let last_slash = name_tag.rfind('/');
        let (name, tag) = match name_tag.rfind(':') {
            Some(colon_pos) if last_slash.map_or(true, |s| colon_pos > s) => (
                &name_tag[..colon_pos],
                Some(name_tag[colon_pos + 1..].to_string()),
            ),
            _ => (name_tag, None),
        };

        if let Some(ref tag) = tag {
            Self::validate_tag(reference, tag)?;
        }

        let (registry, repository) = Self::split_registry_repository(name)?;
        Self::validate_repository(reference, &repository)?;

        Ok(ImageReference {
            registry,
            repository,
            tag,
            digest,
        })
    }

    /// Split a name into registry and repository components.
    fn split_registry_repository(name: &str) -> Result<(String, String)> {
        if name == SCRATCH {
            return Ok((DEFAULT_REGISTRY.to_string(), SCRATCH.to_string()));
        }

        // Check if the first component looks like a registry hostname
        // (contains a dot or colon, or is "localhost")
        if let Some((first, rest)) = name.split_once('/') {
            if first.contains('.') || first.contains(':') || first == "localhost" {
                if rest.is_empty() {
                    return Err(ScratchError::InvalidReference(format!(
                        "Empty repository in reference '{}'",
                        name
                    )));
                }
                if first == DEFAULT_REGISTRY || first == "index.docker.io" {
                    return Ok((DEFAULT_REGISTRY.to_string(), Self::hub_repository(rest)));
                }
                return Ok((first.to_string(), rest.to_string()));
            }
        }

        Ok((DEFAULT_REGISTRY.to_string(), Self::hub_repository(name)))
    }

    /// Single name like "nginx" → "library/nginx" for Docker Hub.
    fn hub_repository(name: &str) -> String {
        if name.contains('/') {
            name.to_string()
        } else {
            format!("{}{}", LIBRARY_NAMESPACE, name)
        }
    }

    fn validate_repository(reference: &str, repository: &str) -> Result<()> {
        for component in repository.split('/') {
            let valid = !component.is_empty()
                && component
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "._-".contains(c))
                && component.starts_with(|c: char| c.is_ascii_alphanumeric())
                && component.ends_with(|c: char| c.is_ascii_alphanumeric());
            if !valid {
                return Err(ScratchError::InvalidReference(format!(
                    "Invalid repository component '{}' in reference '{}'",
                    component, reference
                )));
            }
        }
        Ok(())
    }

    fn validate_tag(reference: &str, tag: &str) -> Result<()> {
        let valid = !tag.is_empty()
            && tag.len() <= MAX_TAG_LEN
            && tag.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_')
            && tag
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "_.-".contains(c));
        if !valid {
            return Err(ScratchError::InvalidReference(format!(
                "Invalid tag '{}' in reference '{}'",
                tag, reference
            )));
        }
        Ok(())
    }

    fn validate_digest(reference: &str, digest: &str) -> Result<()> {
        match digest.split_once(':') {
            Some((algorithm, hex))
                if !algorithm.is_empty()
                    && !hex.is_empty()
                    && hex.chars().all(|c| c.is_ascii_hexdigit()) =>
            {
                Ok(())
            }
            _ => Err(ScratchError::InvalidReference(format!(
                "Invalid digest format in reference '{}': expected algorithm:hex",
                reference
            ))),
        }
    }

    /// Image name without tag or digest.
    ///
    /// Docker Hub images omit the registry (`library/golang`,
    /// `arm64v8/golang`); other registries keep it (`ghcr.io/org/app`).
    pub fn name(&self) -> String {
        if self.registry == DEFAULT_REGISTRY {
            self.repository.clone()
        } else {
            format!("{}/{}", self.registry, self.repository)
        }
    }

    /// Name in the form a user would type it (`golang`, `arm64v8/golang`).
    pub fn familiar_name(&self) -> String {
        if self.registry == DEFAULT_REGISTRY {
            self.repository
                .strip_prefix(LIBRARY_NAMESPACE)
                .unwrap_or(&self.repository)
                .to_string()
        } else {
            self.name()
        }
    }

    /// Whether this is the `scratch` sentinel.
    pub fn is_scratch(&self) -> bool {
        self.name() == SCRATCH
    }

    /// Whether this is an official Docker Hub library image.
    pub fn is_library(&self) -> bool {
        self.registry == DEFAULT_REGISTRY && self.repository.starts_with(LIBRARY_NAMESPACE)
    }

    /// Copy of this reference carrying `tag`.
    pub fn with_tag(&self, tag: impl Into<String>) -> Self {
        ImageReference {
            tag: Some(tag.into()),
            ..self.clone()
        }
    }

    fn push_suffix(&self, s: &mut String) {
        if let Some(ref tag) = self.tag {
            s.push(':');
            s.push_str(tag);
        }
        if let Some(ref digest) = self.digest {
            s.push('@');
            s.push_str(digest);
        }
    }
}

impl std::fmt::Display for ImageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = self.familiar_name();
        self.push_suffix(&mut s);
        f.write_str(&s)
    }
}

impl std::str::FromStr for ImageReference {
    type Err = ScratchError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_name() {
        let r = ImageReference::parse("nginx").unwrap();
        assert_eq!(r.registry, "docker.io");
        assert_eq!(r.repository, "library/nginx");
        assert_eq!(r.tag, None);
        assert_eq!(r.digest, None);
        assert_eq!(r.name(), "library/nginx");
        assert!(r.is_library());
    }

    #[test]
    fn test_parse_name_with_tag() {
        let r = ImageReference::parse("nginx:1.25").unwrap();
        assert_eq!(r.repository, "library/nginx");
        assert_eq!(r.tag, Some("1.25".to_string()));
    }

    #[test]
    fn test_parse_numeric_tag() {
        let r = ImageReference::parse("node:18").unwrap();
        assert_eq!(r.repository, "library/node");
        assert_eq!(r.tag, Some("18".to_string()));
    }

    #[test]
    fn test_parse_scratch() {
        let r = ImageReference::parse("scratch").unwrap();
        assert!(r.is_scratch());
        assert!(!r.is_library());
        assert_eq!(r.name(), "scratch");
        assert_eq!(r.to_string(), "scratch");
    }

    #[test]
    fn test_parse_user_repo() {
        let r = ImageReference::parse("arm64v8/golang:1.18").unwrap();
        assert_eq!(r.registry, "docker.io");
        assert_eq!(r.repository, "arm64v8/golang");
        assert_eq!(r.tag, Some("1.18".to_string()));
        assert!(!r.is_library());
        assert_eq!(r.to_string(), "arm64v8/golang:1.18");
    }

    #[test]
    fn test_parse_explicit_docker_hub() {
        let r = ImageReference::parse("docker.io/golang:1.18").unwrap();
        assert_eq!(r.repository, "library/golang");
        assert!(r.is_library());
        assert_eq!(r.to_string(), "golang:1.18");

        let r = ImageReference::parse("index.docker.io/library/alpine").unwrap();
        assert_eq!(r.registry, "docker.io");
        assert_eq!(r.repository, "library/alpine");
    }

    #[test]
    fn test_parse_custom_registry() {
        let r = ImageReference::parse("ghcr.io/org/code:v0.1.0").unwrap();
        assert_eq!(r.registry, "ghcr.io");
        assert_eq!(r.repository, "org/code");
        assert_eq!(r.tag, Some("v0.1.0".to_string()));
        assert_eq!(r.name(), "ghcr.io/org/code");
        assert!(!r.is_library());
    }

    #[test]
    fn test_parse_digest_only() {
        let r = ImageReference::parse("ghcr.io/org/code@sha256:abcdef1234567890").unwrap();
        assert_eq!(r.tag, None);
        assert_eq!(r.digest, Some("sha256:abcdef1234567890".to_string()));
    }

    #[test]
    fn test_parse_tag_and_digest() {
        let r = ImageReference::parse("ghcr.io/org/code:v0.1.0@sha256:abcdef1234567890").unwrap();
        assert_eq!(r.tag, Some("v0.1.0".to_string()));
        assert_eq!(r.digest, Some("sha256:abcdef1234567890".to_string()));
        assert_eq!(r.to_string(), "ghcr.io/org/code:v0.1.0@sha256:abcdef1234567890");
    }

    #[test]
    fn test_parse_localhost_registry() {
        let r = ImageReference::parse("localhost/myimage:test").unwrap();
        assert_eq!(r.registry, "localhost");
        assert_eq!(r.repository, "myimage");
        assert_eq!(r.tag, Some("test".to_string()));
    }

    #[test]
    fn test_parse_registry_with_port() {
        let r = ImageReference::parse("myregistry.io:5000/myimage:v1").unwrap();
        assert_eq!(r.registry, "myregistry.io:5000");
        assert_eq!(r.repository, "myimage");
        assert_eq!(r.tag, Some("v1".to_string()));

        let r = ImageReference::parse("myregistry.io:5000/myimage").unwrap();
        assert_eq!(r.registry, "myregistry.io:5000");
        assert_eq!(r.tag, None);
    }

    #[test]
    fn test_parse_rejects_invalid() {
        assert!(ImageReference::parse("").is_err());
        assert!(ImageReference::parse("nginx@invaliddigest").is_err());
        assert!(ImageReference::parse("nginx@sha256:xyz").is_err());
        assert!(ImageReference::parse("Nginx").is_err());
        assert!(ImageReference::parse("golang:${VERSION}").is_err());
        assert!(ImageReference::parse("golang:").is_err());
        assert!(ImageReference::parse("org//image").is_err());
        assert!(ImageReference::parse("ghcr.io/").is_err());
    }

    #[test]
    fn test_parse_whitespace_reference() {
        let r = ImageReference::parse("  nginx  ").unwrap();
        assert_eq!(r.repository, "library/nginx");
    }

    #[test]
    fn test_with_tag() {
        let r = ImageReference::parse("golang").unwrap().with_tag("latest");
        assert_eq!(r.tag, Some("latest".to_string()));
        assert_eq!(r.to_string(), "golang:latest");
    }

    #[test]
    fn test_display_is_familiar_form() {
        let r = ImageReference::parse("docker.io/library/golang:1.18").unwrap();
        assert_eq!(format!("{}", r), "golang:1.18");
    }

    #[test]
    fn test_from_str() {
        let r: ImageReference = "alpine:3.19".parse().unwrap();
        assert_eq!(r.familiar_name(), "alpine");
    }
}
