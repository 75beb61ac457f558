//! Emulator configuration, persisted as `emulator.json`.

use crate::error::{Error, Result};
use crate::formats::FormatKind;
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current schema version.
pub const CONFIG_VERSION: u32 = 1;

/// Settings shared by every rebuild an emulator performs.
///
/// # JSON format
///
/// ```json
/// {
///   "version": 1,
///   "alignmentOverrides": { "afs": 32 },
///   "mergeRegions": true,
///   "enabledFormats": ["afs"]
/// }
/// ```
///
/// Missing fields take their defaults. An empty `enabledFormats` enables every
/// format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmulatorConfig {
    pub version: u32,

    /// Per-format alignment replacing the format's default.
    pub alignment_overrides: BTreeMap<FormatKind, u64>,

    /// Coalesce untouched original regions. Turning this off produces the same
    /// bytes with more bindings.
    pub merge_regions: bool,

    pub enabled_formats: Vec<FormatKind>,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            alignment_overrides: BTreeMap::new(),
            merge_regions: true,
            enabled_formats: Vec::new(),
        }
    }
}

impl EmulatorConfig {
    /// Load and validate a config file.
    ///
    /// Returns `Ok(None)` if the file doesn't exist.
    pub fn load(path: &Utf8Path) -> Result<Option<Self>> {
        if !path.as_std_path().exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(path.as_std_path())?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(Some(config))
    }

    /// Save the config, creating parent directories if needed.
    pub fn save(&self, path: &Utf8Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent.as_std_path())?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_std_path(), contents)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.version != CONFIG_VERSION {
            return Err(Error::InvalidConfig(format!(
                "unsupported version {} (expected {})",
                self.version, CONFIG_VERSION
            )));
        }
        for (kind, alignment) in &self.alignment_overrides {
            if *alignment == 0 {
                return Err(Error::InvalidConfig(format!(
                    "alignment for {kind} must be non-zero"
                )));
            }
        }
        Ok(())
    }

    /// Alignment to rebuild `kind` with.
    pub fn alignment_for(&self, kind: FormatKind) -> u64 {
        self.alignment_overrides
            .get(&kind)
            .copied()
            .unwrap_or_else(|| kind.default_alignment())
    }

    pub fn is_enabled(&self, kind: FormatKind) -> bool {
        self.enabled_formats.is_empty() || self.enabled_formats.contains(&kind)
    }
}
