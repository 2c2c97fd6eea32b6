//! Target architectures and the base-image compatibility table.
//!
//! Docker Hub publishes every official image a second time under a
//! per-architecture namespace (`arm64v8/golang`, `ppc64le/alpine`, ...).
//! Rebasing a stack swaps a `library/` base for its namespaced twin.

use std::collections::HashMap;

use scratchbuild_core::error::{Result, ScratchError};

use crate::oci::reference::LIBRARY_NAMESPACE;

/// Known target architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    Amd64,
    Arm32v5,
    Arm32v6,
    Arm32v7,
    Arm64v8,
    I386,
    Ppc64le,
    S390x,
    Riscv64,
    Mips64le,
}

impl Arch {
    /// All known architectures.
    pub const ALL: [Arch; 10] = [
        Arch::Amd64,
        Arch::Arm32v5,
        Arch::Arm32v6,
        Arch::Arm32v7,
        Arch::Arm64v8,
        Arch::I386,
        Arch::Ppc64le,
        Arch::S390x,
        Arch::Riscv64,
        Arch::Mips64le,
    ];

    /// Docker Hub namespace holding this architecture's official images.
    pub fn namespace(&self) -> &'static str {
        match self {
            Arch::Amd64 => "amd64",
            Arch::Arm32v5 => "arm32v5",
            Arch::Arm32v6 => "arm32v6",
            Arch::Arm32v7 => "arm32v7",
            Arch::Arm64v8 => "arm64v8",
            Arch::I386 => "i386",
            Arch::Ppc64le => "ppc64le",
            Arch::S390x => "s390x",
            Arch::Riscv64 => "riscv64",
            Arch::Mips64le => "mips64le",
        }
    }

    /// OCI platform string (`linux/arm64/v8`).
    pub fn platform(&self) -> &'static str {
        match self {
            Arch::Amd64 => "linux/amd64",
            Arch::Arm32v5 => "linux/arm/v5",
            Arch::Arm32v6 => "linux/arm/v6",
            Arch::Arm32v7 => "linux/arm/v7",
            Arch::Arm64v8 => "linux/arm64/v8",
            Arch::I386 => "linux/386",
            Arch::Ppc64le => "linux/ppc64le",
            Arch::S390x => "linux/s390x",
            Arch::Riscv64 => "linux/riscv64",
            Arch::Mips64le => "linux/mips64le",
        }
    }

    /// Architecture of the running host, if known.
    pub fn host() -> Option<Self> {
        std::env::consts::ARCH.parse().ok()
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.namespace())
    }
}

impl std::str::FromStr for Arch {
    type Err = ScratchError;

    /// Accepts Docker namespaces, GOARCH names, uname names and platforms.
    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_lowercase();
        let name = lowered.strip_prefix("linux/").unwrap_or(&lowered);
        let arch = match name {
            "amd64" | "x86_64" | "x86-64" => Arch::Amd64,
            "arm32v5" | "armv5" | "armel" | "arm/v5" => Arch::Arm32v5,
            "arm32v6" | "armv6" | "armv6l" | "arm/v6" => Arch::Arm32v6,
            "arm32v7" | "armv7" | "armv7l" | "armhf" | "arm" | "arm/v7" => Arch::Arm32v7,
            "arm64v8" | "arm64" | "aarch64" | "arm64/v8" => Arch::Arm64v8,
            "i386" | "386" | "x86" | "i686" => Arch::I386,
            "ppc64le" | "ppc64el" | "powerpc64le" => Arch::Ppc64le,
            "s390x" => Arch::S390x,
            "riscv64" => Arch::Riscv64,
            "mips64le" | "mips64el" => Arch::Mips64le,
            other => {
                return Err(ScratchError::ConfigError(format!(
                    "unknown architecture: '{}' (supported: {})",
                    other,
                    Arch::ALL.map(|a| a.namespace()).join(", ")
                )))
            }
        };
        Ok(arch)
    }
}

/// Lookup of architecture-specific substitutes for base images.
pub trait ArchTable {
    /// Substitute image name for `image_name` on `arch`, if any.
    fn compatible_base_image(&self, arch: Arch, image_name: &str) -> Option<String>;
}

impl<F> ArchTable for F
where
    F: Fn(Arch, &str) -> Option<String>,
{
    fn compatible_base_image(&self, arch: Arch, image_name: &str) -> Option<String> {
        self(arch, image_name)
    }
}

/// Official images published under the per-architecture namespaces.
const OFFICIAL_IMAGES: &[&str] = &[
    "alpine",
    "amazonlinux",
    "bash",
    "buildpack-deps",
    "busybox",
    "centos",
    "debian",
    "docker",
    "fedora",
    "gcc",
    "golang",
    "haproxy",
    "httpd",
    "memcached",
    "mongo",
    "mysql",
    "nginx",
    "node",
    "openjdk",
    "perl",
    "php",
    "postgres",
    "python",
    "rabbitmq",
    "redis",
    "ruby",
    "rust",
    "traefik",
    "ubuntu",
];

/// Compatibility table for Docker Hub official images.
///
/// Configured overrides take precedence over the built-in mapping.
#[derive(Debug, Clone, Default)]
pub struct OfficialArchTable {
    overrides: HashMap<Arch, HashMap<String, String>>,
}

impl OfficialArchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table with overrides keyed by architecture name.
    pub fn with_overrides(overrides: &HashMap<String, HashMap<String, String>>) -> Result<Self> {
        let mut table = Self::new();
        for (arch, images) in overrides {
            let arch: Arch = arch.parse()?;
            table
                .overrides
                .entry(arch)
                .or_default()
                .extend(images.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        Ok(table)
    }
}

impl ArchTable for OfficialArchTable {
    fn compatible_base_image(&self, arch: Arch, image_name: &str) -> Option<String> {
        if let Some(substitute) = self.overrides.get(&arch).and_then(|m| m.get(image_name)) {
            return Some(substitute.clone());
        }

        let short = image_name.strip_prefix(LIBRARY_NAMESPACE)?;
        OFFICIAL_IMAGES
            .contains(&short)
            .then(|| format!("{}/{}", arch.namespace(), short))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("arm64".parse::<Arch>().unwrap(), Arch::Arm64v8);
        assert_eq!("aarch64".parse::<Arch>().unwrap(), Arch::Arm64v8);
        assert_eq!("x86_64".parse::<Arch>().unwrap(), Arch::Amd64);
        assert_eq!("linux/arm/v7".parse::<Arch>().unwrap(), Arch::Arm32v7);
        assert_eq!("armhf".parse::<Arch>().unwrap(), Arch::Arm32v7);
        assert_eq!("PPC64LE".parse::<Arch>().unwrap(), Arch::Ppc64le);
    }

    #[test]
    fn test_parse_unknown() {
        let err = "sparc".parse::<Arch>().unwrap_err();
        assert!(err.to_string().contains("sparc"));
        assert!(err.to_string().contains("arm64v8"));
    }

    #[test]
    fn test_display_round_trips_all() {
        for arch in Arch::ALL {
            assert_eq!(arch.to_string().parse::<Arch>().unwrap(), arch);
        }
    }

    #[test]
    fn test_official_table_maps_library_images() {
        let table = OfficialArchTable::new();
        assert_eq!(
            table.compatible_base_image(Arch::Arm64v8, "library/golang"),
            Some("arm64v8/golang".to_string())
        );
        assert_eq!(
            table.compatible_base_image(Arch::Ppc64le, "library/alpine"),
            Some("ppc64le/alpine".to_string())
        );
    }

    #[test]
    fn test_official_table_ignores_unknown() {
        let table = OfficialArchTable::new();
        assert_eq!(table.compatible_base_image(Arch::Arm64v8, "library/myapp"), None);
        assert_eq!(table.compatible_base_image(Arch::Arm64v8, "arm64v8/golang"), None);
        assert_eq!(table.compatible_base_image(Arch::Arm64v8, "ghcr.io/org/golang"), None);
        assert_eq!(table.compatible_base_image(Arch::Arm64v8, "scratch"), None);
    }

    #[test]
    fn test_overrides_take_precedence() {
        let overrides = HashMap::from([(
            "arm64".to_string(),
            HashMap::from([
                ("library/golang".to_string(), "registry.local/arm64/go".to_string()),
                ("library/myapp".to_string(), "registry.local/arm64/myapp".to_string()),
            ]),
        )]);
        let table = OfficialArchTable::with_overrides(&overrides).unwrap();
        assert_eq!(
            table.compatible_base_image(Arch::Arm64v8, "library/golang"),
            Some("registry.local/arm64/go".to_string())
        );
        assert_eq!(
            table.compatible_base_image(Arch::Arm64v8, "library/myapp"),
            Some("registry.local/arm64/myapp".to_string())
        );
        assert_eq!(
            table.compatible_base_image(Arch::Amd64, "library/golang"),
            Some("amd64/golang".to_string())
        );
    }

    #[test]
    fn test_overrides_reject_unknown_arch() {
        let overrides = HashMap::from([("vax".to_string(), HashMap::new())]);
        assert!(OfficialArchTable::with_overrides(&overrides).is_err());
    }

    #[test]
    fn test_closure_table() {
        let table =
            |arch: Arch, name: &str| (name == "library/debian").then(|| format!("{arch}/debian"));
        assert_eq!(
            table.compatible_base_image(Arch::S390x, "library/debian"),
            Some("s390x/debian".to_string())
        );
    }
}
