use anyhow::{Context, Result};
use phaseloop::orchestrator::DEFAULT_PHASE_DELAY;
use phaseloop::sandbox;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Name of the optional config file in the package directory
pub const CONFIG_FILE_NAME: &str = "pkgexec.toml";

// ============================================================================
// Executor Config
// ============================================================================

/// Settings read from `<package dir>/pkgexec.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Pause after each continuing phase, in milliseconds
    pub phase_delay_ms: u64,
    /// File name of the worker binary inside the sandbox
    pub worker: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            phase_delay_ms: u64::try_from(DEFAULT_PHASE_DELAY.as_millis()).unwrap_or(2000),
            worker: sandbox::default_worker_name(),
        }
    }
}

impl ExecutorConfig {
    /// Load the config of a package directory, or defaults if there is none
    pub fn load(package_dir: &Path) -> Result<Self> {
        let path = package_dir.join(CONFIG_FILE_NAME);

        if !path.exists() {
            log::debug!("Config file does not exist, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn phase_delay(&self) -> Duration {
        Duration::from_millis(self.phase_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = ExecutorConfig::load(temp_dir.path()).unwrap();
        assert_eq!(config, ExecutorConfig::default());
        assert_eq!(config.phase_delay(), Duration::from_millis(2000));
        assert!(config.worker.starts_with("pkgexec-worker"));
    }

    #[test]
    fn test_load_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(CONFIG_FILE_NAME), "phase_delay_ms = 250\n").unwrap();

        let config = ExecutorConfig::load(temp_dir.path()).unwrap();
        assert_eq!(config.phase_delay(), Duration::from_millis(250));
        assert_eq!(config.worker, sandbox::default_worker_name());
    }

    #[test]
    fn test_load_full_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            "phase_delay_ms = 0\nworker = \"custom-worker\"\n",
        )
        .unwrap();

        let config = ExecutorConfig::load(temp_dir.path()).unwrap();
        assert_eq!(config.phase_delay(), Duration::ZERO);
        assert_eq!(config.worker, "custom-worker");
    }

    #[test]
    fn test_load_malformed_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(CONFIG_FILE_NAME), "phase_delay_ms = \"soon\"").unwrap();

        let err = ExecutorConfig::load(temp_dir.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_roundtrip_serialization() {
        let config = ExecutorConfig {
            phase_delay_ms: 10,
            worker: "w".to_string(),
        };
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: ExecutorConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
