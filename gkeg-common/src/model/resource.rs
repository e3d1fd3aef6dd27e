// gkeg-common/src/model/resource.rs
use serde::{Deserialize, Serialize};

/// A pinned external archive. Immutable; verified against `sha256` before use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub name: String,
    pub url: String,
    pub sha256: String,
}

/// A unified diff carried with the formula and applied before bootstrap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchSpec {
    pub name: String,
    /// Leading path components to strip, as in `patch -pN`.
    pub strip: u32,
    pub sha256: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub body: String,
}

impl PatchSpec {
    /// Files the diff touches, taken from its `+++` headers with `strip` applied.
    pub fn touched_files(&self) -> Vec<String> {
        self.body
            .lines()
            .filter_map(|line| line.strip_prefix("+++ "))
            .map(|path| {
                let path = path.split('\t').next().unwrap_or(path).trim();
                path.splitn(self.strip as usize + 1, '/')
                    .last()
                    .unwrap_or(path)
                    .to_string()
            })
            .collect()
    }
}
