// gkeg-common/src/dependency/definition.rs
use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::platform::HostPlatform;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct DependencyTag: u8 {
        const RUNTIME     = 0b00000001;
        const BUILD       = 0b00000010;
        const TEST        = 0b00000100;
        const OPTIONAL    = 0b00001000;
        const RECOMMENDED = 0b00010000;
    }
}

impl Default for DependencyTag {
    fn default() -> Self {
        Self::RUNTIME
    }
}

impl fmt::Display for DependencyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl DependencyTag {
    /// Needed while building but absent from the linked artifact's runtime requirements.
    pub fn is_build_only(&self) -> bool {
        self.contains(Self::BUILD) && !self.is_runtime()
    }

    pub fn is_runtime(&self) -> bool {
        self.intersects(Self::RUNTIME | Self::RECOMMENDED | Self::OPTIONAL)
    }
}

/// Which host platforms a dependency declaration applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformScope {
    #[default]
    All,
    MacOsOnly,
    LinuxOnly,
}

impl PlatformScope {
    pub fn applies_to(&self, platform: HostPlatform) -> bool {
        match self {
            Self::All => true,
            Self::MacOsOnly => platform == HostPlatform::MacOs,
            Self::LinuxOnly => platform == HostPlatform::Linux,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    #[serde(default)]
    pub tags: DependencyTag,
    #[serde(default)]
    pub scope: PlatformScope,
    /// Satisfied by the operating system on macOS, managed everywhere else.
    #[serde(default)]
    pub uses_from_macos: bool,
}

impl Dependency {
    pub fn new_runtime(name: impl Into<String>) -> Self {
        Self::new_with_tags(name, DependencyTag::RUNTIME)
    }

    pub fn new_build(name: impl Into<String>) -> Self {
        Self::new_with_tags(name, DependencyTag::BUILD)
    }

    pub fn new_with_tags(name: impl Into<String>, tags: DependencyTag) -> Self {
        Self {
            name: name.into(),
            tags,
            scope: PlatformScope::All,
            uses_from_macos: false,
        }
    }

    pub fn uses_from_macos(name: impl Into<String>) -> Self {
        Self {
            uses_from_macos: true,
            ..Self::new_runtime(name)
        }
    }

    pub fn on(mut self, scope: PlatformScope) -> Self {
        self.scope = scope;
        self
    }
}
