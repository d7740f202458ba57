//! Engine configuration.

use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::errors::{ConfigError, ConfigResult};

/// Default number of invocations per workgroup in every kernel.
pub const DEFAULT_WORKGROUP_SIZE: u32 = 64;

/// Adapter preference forwarded to `wgpu::RequestAdapterOptions`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerPreference {
    #[default]
    LowPower,
    HighPerformance,
}

impl From<PowerPreference> for wgpu::PowerPreference {
    fn from(value: PowerPreference) -> Self {
        match value {
            PowerPreference::LowPower => wgpu::PowerPreference::LowPower,
            PowerPreference::HighPerformance => wgpu::PowerPreference::HighPerformance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    workgroup_size: u32,
    power_preference: PowerPreference,
    force_fallback_adapter: bool,
    /// Seeds the host generator that feeds the weight initializer. `None` seeds
    /// from entropy.
    seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workgroup_size: DEFAULT_WORKGROUP_SIZE,
            power_preference: PowerPreference::default(),
            force_fallback_adapter: false,
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON configuration file, falling back to defaults when the file
    /// does not exist.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.display().to_string(),
                source: e,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "Config file '{}' not found, using default engine configuration",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(e) => Err(ConfigError::Io {
                path: path.display().to_string(),
                source: e,
            }),
        }
    }

    pub fn with_workgroup_size(mut self, workgroup_size: u32) -> Self {
        self.workgroup_size = workgroup_size.max(1);
        self
    }

    pub fn with_power_preference(mut self, power_preference: PowerPreference) -> Self {
        self.power_preference = power_preference;
        self
    }

    pub fn with_fallback_adapter(mut self, force: bool) -> Self {
        self.force_fallback_adapter = force;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn workgroup_size(&self) -> u32 {
        self.workgroup_size.max(1)
    }

    pub fn power_preference(&self) -> PowerPreference {
        self.power_preference
    }

    pub fn force_fallback_adapter(&self) -> bool {
        self.force_fallback_adapter
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.workgroup_size(), DEFAULT_WORKGROUP_SIZE);
        assert_eq!(config.power_preference(), PowerPreference::LowPower);
        assert!(!config.force_fallback_adapter());
        assert_eq!(config.seed(), None);
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::new()
            .with_workgroup_size(0)
            .with_power_preference(PowerPreference::HighPerformance)
            .with_seed(7);
        assert_eq!(config.workgroup_size(), 1);
        assert_eq!(config.power_preference(), PowerPreference::HighPerformance);
        assert_eq!(config.seed(), Some(7));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "seed": 42, "power_preference": "high_performance" }}"#).unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.seed(), Some(42));
        assert_eq!(config.power_preference(), PowerPreference::HighPerformance);
        assert_eq!(config.workgroup_size(), DEFAULT_WORKGROUP_SIZE);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load(dir.path().join("absent.json")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            EngineConfig::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }
}
