use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Result, ScratchError};

/// Default bound on the number of layers a stack may resolve to.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// scratchbuild configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScratchConfig {
    /// Where official library Dockerfile sources are found
    #[serde(default)]
    pub library: LibraryConfig,

    /// Maximum number of layers in a resolved stack
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Extra substitutions per architecture: arch -> (image name -> substitute)
    #[serde(default)]
    pub arch_overrides: HashMap<String, HashMap<String, String>>,

    /// Log level used when RUST_LOG is not set
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            library: LibraryConfig::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            arch_overrides: HashMap::new(),
            log_level: LogLevel::default(),
        }
    }
}

impl ScratchConfig {
    /// Default config file location (~/.scratchbuild/config.yaml).
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".scratchbuild"))
            .unwrap_or_else(|| PathBuf::from(".scratchbuild"))
            .join("config.yaml")
    }

    /// Load configuration from a YAML file.
    ///
    /// A missing file yields the default configuration.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ScratchError::ConfigError(format!(
                "Failed to read config at {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: ScratchConfig = serde_yaml::from_str(content)?;
        if config.max_depth == 0 {
            return Err(ScratchError::ConfigError(
                "max_depth must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }
}

/// Library source location
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum LibraryConfig {
    /// No library sources; every library base becomes a pull leaf
    #[default]
    None,

    /// `<root>/<image>/<tag>/Dockerfile`
    Directory { root: PathBuf },

    /// Official-images manifests plus checked-out source repositories
    Manifest {
        /// Directory holding one manifest file per image (e.g. `library/`)
        manifests: PathBuf,
        /// Directory holding one checkout per source repository
        sources: PathBuf,
    },
}

/// Log level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string usable as an env filter.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ScratchConfig::default();
        assert_eq!(config.library, LibraryConfig::None);
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
        assert!(config.arch_overrides.is_empty());
        assert_eq!(config.log_level, LogLevel::Warn);
    }

    #[test]
    fn test_from_yaml_directory_library() {
        let yaml = r#"
library:
  kind: directory
  root: /srv/library
max_depth: 10
log_level: debug
"#;
        let config = ScratchConfig::from_yaml(yaml).unwrap();
        assert_eq!(
            config.library,
            LibraryConfig::Directory {
                root: PathBuf::from("/srv/library")
            }
        );
        assert_eq!(config.max_depth, 10);
        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_from_yaml_manifest_library_and_overrides() {
        let yaml = r#"
library:
  kind: manifest
  manifests: /srv/official-images/library
  sources: /srv/sources
arch_overrides:
  arm64v8:
    library/myapp: registry.local/arm64/myapp
"#;
        let config = ScratchConfig::from_yaml(yaml).unwrap();
        assert!(matches!(config.library, LibraryConfig::Manifest { .. }));
        assert_eq!(
            config.arch_overrides["arm64v8"]["library/myapp"],
            "registry.local/arm64/myapp"
        );
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_from_yaml_zero_depth_rejected() {
        let err = ScratchConfig::from_yaml("max_depth: 0").unwrap_err();
        assert!(matches!(err, ScratchError::ConfigError(_)));
    }

    #[test]
    fn test_from_yaml_unknown_library_kind() {
        let yaml = "library:\n  kind: git\n";
        assert!(ScratchConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_load_missing_file_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ScratchConfig::load(&dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config.library, LibraryConfig::None);
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "log_level: error\n").unwrap();
        let config = ScratchConfig::load(&path).unwrap();
        assert_eq!(config.log_level, LogLevel::Error);
    }

    #[test]
    fn test_log_level_as_filter_directive() {
        assert_eq!(LogLevel::Info.as_str(), "info");
        assert_eq!(LogLevel::Trace.as_str(), "trace");
        assert_eq!(LogLevel::default().as_str(), "warn");
    }
}
