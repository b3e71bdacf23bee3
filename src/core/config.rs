//! Generator configuration with documented constants
//!
//! All tunable numbers of the pipeline are collected here with explanations
//! of their purpose and how they interact with each other.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, TownError};

/// Smallest town that can hold a citadel
///
/// The citadel is carved out of the outermost city patch and needs at least
/// two more patches around the plaza to leave a wall-able town behind.
pub const MIN_CITADEL_PATCHES: usize = 3;

/// Configuration for a town generation run
///
/// The defaults reproduce the classic layout: a walled town of 15 patches
/// whose plaza and citadel are decided by the random stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    // === LAYOUT ===
    /// Number of patches inside the city
    ///
    /// The Voronoi diagram is built from eight times as many sites, so the
    /// countryside around the town gets roughly seven patches per city patch.
    pub patch_count: usize,

    /// Number of Lloyd relaxation rounds applied to the central sites
    pub relax_iterations: usize,

    /// Patch edges shorter than this are collapsed into a single junction
    ///
    /// At 8.0 the tiny slivers between Voronoi cells disappear without
    /// visibly distorting the larger wards.
    pub junction_threshold: f64,

    // === FEATURES ===
    /// Force a plaza on or off (None = decided by the random stream)
    ///
    /// The random draw is consumed either way so the rest of the stream
    /// stays aligned with an unconfigured run.
    pub plaza: Option<bool>,

    /// Force a citadel on or off (None = decided by the random stream)
    ///
    /// Towns smaller than `MIN_CITADEL_PATCHES` never draw a citadel, and
    /// forcing one on them is a config error.
    pub citadel: Option<bool>,

    /// Force curtain walls on or off (None = walls are raised)
    ///
    /// A draw is still taken from the stream for alignment, but an
    /// unconfigured town is always walled.
    pub walls: Option<bool>,

    // === LIMITS ===
    /// Construction attempts before generation gives up
    pub max_attempts: u32,

    /// Upper bound on polygon cuts while subdividing one ward into buildings
    pub max_subdivision_steps: usize,

    /// How often an orthogonal slice may come back empty before the ward fails
    pub max_ortho_retries: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            patch_count: 15,
            relax_iterations: 3,
            junction_threshold: 8.0,

            plaza: None,
            citadel: None,
            walls: None,

            max_attempts: 1000,
            max_subdivision_steps: 20_000,
            max_ortho_retries: 64,
        }
    }
}

impl GeneratorConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_patches(mut self, patch_count: usize) -> Self {
        self.patch_count = patch_count;
        self
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: GeneratorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.patch_count == 0 {
            return Err(TownError::Config("patch_count must be at least 1".into()));
        }

        if self.max_attempts == 0 {
            return Err(TownError::Config("max_attempts must be at least 1".into()));
        }

        if self.junction_threshold < 0.0 {
            return Err(TownError::Config(format!(
                "junction_threshold ({}) must not be negative",
                self.junction_threshold
            )));
        }

        if self.citadel == Some(true) && self.patch_count < MIN_CITADEL_PATCHES {
            return Err(TownError::Config(format!(
                "a citadel needs at least {} patches, got {}",
                MIN_CITADEL_PATCHES, self.patch_count
            )));
        }

        if self.max_subdivision_steps == 0 || self.max_ortho_retries == 0 {
            return Err(TownError::Config("subdivision limits must be positive".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = GeneratorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.patch_count, 15);
        assert_eq!(config.walls, None);
    }

    #[test]
    fn test_zero_patches_rejected() {
        let config = GeneratorConfig::default().with_patches(0);
        assert!(matches!(config.validate(), Err(TownError::Config(_))));
    }

    #[test]
    fn test_small_town_cannot_force_citadel() {
        let mut config = GeneratorConfig::default().with_patches(2);
        config.citadel = Some(true);
        assert!(matches!(config.validate(), Err(TownError::Config(_))));

        config.citadel = None;
        assert!(config.validate().is_ok());
        config.patch_count = MIN_CITADEL_PATCHES;
        config.citadel = Some(true);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = GeneratorConfig::from_toml_str(
            r#"
            patch_count = 30
            citadel = false
            "#,
        )
        .unwrap();
        assert_eq!(config.patch_count, 30);
        assert_eq!(config.citadel, Some(false));
        assert_eq!(config.plaza, None);
        assert_eq!(config.max_attempts, 1000);
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        let result = GeneratorConfig::from_toml_str("patch_count = \"many\"");
        assert!(matches!(result, Err(TownError::TomlError(_))));
    }
}
