// gkeg-core/src/install/receipt.rs
use std::path::Path;

use gkeg_aio::fs::atomic_write_file;
use gkeg_common::error::Result;
use gkeg_common::model::{Formula, SourceOrigin};
use gkeg_common::platform::HostPlatform;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const RECEIPT_FILE: &str = "INSTALL_RECEIPT.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltOn {
    pub os: String,
    pub arch: String,
    pub platform: HostPlatform,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReceipt {
    pub name: String,
    pub version: String,
    pub time: String,
    pub source: SourceOrigin,
    pub built_on: BuiltOn,
}

pub fn write_receipt(
    formula: &Formula,
    version: &str,
    origin: &SourceOrigin,
    platform: HostPlatform,
    keg: &Path,
) -> Result<InstallReceipt> {
    let receipt = InstallReceipt {
        name: formula.name.clone(),
        version: version.to_string(),
        time: chrono::Utc::now().to_rfc3339(),
        source: origin.clone(),
        built_on: BuiltOn {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            platform,
        },
    };
    let receipt_json = serde_json::to_string_pretty(&receipt)?;
    let path = keg.join(RECEIPT_FILE);
    atomic_write_file(&path, receipt_json.as_bytes())?;
    debug!("Wrote {}", path.display());
    Ok(receipt)
}
