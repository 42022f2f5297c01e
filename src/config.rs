//! TOML-backed run configuration: every field defaults to the same fixed
//! constants the core uses internally, so the CLI runs with zero
//! configuration and a config file only overrides what it names.

use std::path::Path;

use serde::Deserialize;

use crate::error::LoadError;
use crate::optimizer::{JitParams, MinLatenessParams};
use crate::scheduler::LatePartDelay;

/// Root configuration: deserialized with every field defaulting, then
/// merged over [`Config::default`] rather than requiring a complete file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Late-part on-dock delay Δ in calendar days, truncated to whole days
    /// since the axis is minute-granular but the delay is always applied as
    /// a day count.
    pub late_part_delay_days: i64,
    pub jit: JitConfig,
    pub min_lateness: MinLatenessConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            late_part_delay_days: 1,
            jit: JitConfig::default(),
            min_lateness: MinLatenessConfig::default(),
        }
    }
}

impl Config {
    /// Loads a config from a TOML file, falling back to every unspecified
    /// field's default. A missing file is not an error at this layer; the
    /// CLI decides whether "no config given" means "use defaults".
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&text)?)
    }

    pub fn late_part_delay(&self) -> LatePartDelay {
        LatePartDelay(self.late_part_delay_days)
    }

    pub fn jit_params(&self) -> JitParams {
        JitParams {
            min_mechanics: self.jit.min_mechanics,
            max_mechanics: self.jit.max_mechanics,
            min_quality: self.jit.min_quality,
            max_quality: self.jit.max_quality,
            target_lateness: self.jit.target_lateness,
            tolerance: self.jit.tolerance,
            max_iterations: self.jit.max_iterations,
        }
    }

    pub fn min_lateness_params(&self) -> MinLatenessParams {
        MinLatenessParams {
            min_mechanics: self.min_lateness.min_mechanics,
            max_mechanics: self.min_lateness.max_mechanics,
            min_quality: self.min_lateness.min_quality,
            max_quality: self.min_lateness.max_quality,
            max_iterations: self.min_lateness.max_iterations,
        }
    }
}

/// Just-in-time optimizer bounds and tolerance.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct JitConfig {
    pub min_mechanics: u32,
    pub max_mechanics: u32,
    pub min_quality: u32,
    pub max_quality: u32,
    pub target_lateness: i64,
    pub tolerance: i64,
    pub max_iterations: u32,
}

impl Default for JitConfig {
    fn default() -> Self {
        let d = JitParams::default();
        Self {
            min_mechanics: d.min_mechanics,
            max_mechanics: d.max_mechanics,
            min_quality: d.min_quality,
            max_quality: d.max_quality,
            target_lateness: d.target_lateness,
            tolerance: d.tolerance,
            max_iterations: d.max_iterations,
        }
    }
}

/// Minimum-lateness optimizer bounds.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct MinLatenessConfig {
    pub min_mechanics: u32,
    pub max_mechanics: u32,
    pub min_quality: u32,
    pub max_quality: u32,
    pub max_iterations: u32,
}

impl Default for MinLatenessConfig {
    fn default() -> Self {
        let d = MinLatenessParams::default();
        Self {
            min_mechanics: d.min_mechanics,
            max_mechanics: d.max_mechanics,
            min_quality: d.min_quality,
            max_quality: d.max_quality,
            max_iterations: d.max_iterations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_fixed_constants() {
        let config = Config::default();
        assert_eq!(config.late_part_delay_days, 1);
        assert_eq!(config.jit.target_lateness, -1);
        assert_eq!(config.min_lateness.max_mechanics, 20);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let text = "late_part_delay_days = 2\n\n[jit]\ntarget_lateness = -3\n";
        let config: Config = toml::from_str(text).unwrap();
        assert_eq!(config.late_part_delay_days, 2);
        assert_eq!(config.jit.target_lateness, -3);
        // Unspecified jit fields keep their defaults.
        assert_eq!(config.jit.max_mechanics, 30);
        assert_eq!(config.min_lateness.max_mechanics, 20);
    }
}
