use serde::Deserialize;
use std::path::Path;

use crate::error::EngineError;

/// Engine settings, usually read from a `gradus.toml` file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Run the naming heuristics on overly general candidates.
    pub use_heuristics: bool,
    /// Consult the similarity oracle on overly general candidates.
    pub use_oracle: bool,
    /// Log and skip per-entity failures instead of returning them.
    pub continue_on_errors: bool,
    /// Upper limit on fixed-point passes.
    pub max_passes: usize,
    pub oracle: OracleConfig,
}

/// The `[oracle]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OracleConfig {
    pub endpoint: String,
    pub timeout_ms: u64,
    /// How many ranked candidates to request.
    pub top_n: usize,
    /// Let constraints settle for one pass before asking the oracle.
    pub skip_first_pass: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            use_heuristics: true,
            use_oracle: false,
            continue_on_errors: true,
            max_passes: 100,
            oracle: OracleConfig::default(),
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        OracleConfig {
            endpoint: "http://127.0.0.1:5000/".to_string(),
            timeout_ms: 2000,
            top_n: 5,
            skip_first_pass: false,
        }
    }
}

impl EngineConfig {
    /// Read and parse a configuration file.
    pub fn from_file(path: &Path) -> Result<EngineConfig, EngineError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_str(&content)
    }

    /// Parse a configuration from TOML text.
    pub fn from_str(content: &str) -> Result<EngineConfig, EngineError> {
        let config: EngineConfig =
            toml::from_str(content).map_err(|e| EngineError::Config(format!("failed to parse config: {}", e)))?;
        if config.max_passes == 0 {
            return Err(EngineError::Config("max_passes must be at least 1".to_string()));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let toml = r#"
use_heuristics = false
use_oracle = true
continue_on_errors = false
max_passes = 12

[oracle]
endpoint = "http://localhost:7000/"
timeout_ms = 500
top_n = 3
skip_first_pass = true
"#;
        let config = EngineConfig::from_str(toml).unwrap();
        assert!(!config.use_heuristics);
        assert!(config.use_oracle);
        assert!(!config.continue_on_errors);
        assert_eq!(config.max_passes, 12);
        assert_eq!(config.oracle.endpoint, "http://localhost:7000/");
        assert_eq!(config.oracle.timeout_ms, 500);
        assert_eq!(config.oracle.top_n, 3);
        assert!(config.oracle.skip_first_pass);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = EngineConfig::from_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(config.use_heuristics);
        assert!(!config.use_oracle);
        assert_eq!(config.oracle.top_n, 5);
    }

    #[test]
    fn partial_oracle_section() {
        let config = EngineConfig::from_str("[oracle]\ntop_n = 10\n").unwrap();
        assert_eq!(config.oracle.top_n, 10);
        assert_eq!(config.oracle.timeout_ms, 2000);
    }

    #[test]
    fn rejects_unknown_keys_and_zero_passes() {
        assert!(matches!(
            EngineConfig::from_str("use_twin = true"),
            Err(EngineError::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_str("max_passes = 0"),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = EngineConfig::from_file(Path::new("/nonexistent/gradus.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
