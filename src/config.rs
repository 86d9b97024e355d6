//! Engine configuration.
//!
//! Loaded from an optional TOML file; every key has a default.
//!
//! ```toml
//! scan_period_ms = 100
//! timer_period_ms = 100
//! inputs = ["I0.0", "I0.1"]
//! outputs = ["Q0.0"]
//! default_input_type = "NO"
//! ```

use crate::il::{Address, Domain};
use crate::plc::InputType;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Timing and I/O layout of the simulated controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlcConfig {
    /// Period between two scan cycles.
    pub scan_period_ms: u64,
    /// Resolution of the timer tick.
    pub timer_period_ms: u64,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub default_input_type: InputType,
}

impl Default for PlcConfig {
    fn default() -> Self {
        Self {
            scan_period_ms: 100,
            timer_period_ms: 100,
            inputs: bit_range('I'),
            outputs: bit_range('Q'),
            default_input_type: InputType::Switch,
        }
    }
}

/// `X0.0` .. `X1.7`.
fn bit_range(prefix: char) -> Vec<String> {
    (0..2)
        .flat_map(|byte| (0..8).map(move |bit| format!("{prefix}{byte}.{bit}")))
        .collect()
}

impl PlcConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
        Self::from_toml(&text)
    }

    /// Parse and validate TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let mut config: PlcConfig =
            toml::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.normalize()?;
        Ok(config)
    }

    /// Canonicalise I/O addresses and check timing.
    pub fn normalize(&mut self) -> Result<(), ConfigError> {
        if self.scan_period_ms == 0 || self.timer_period_ms == 0 {
            return Err(ConfigError::Invalid("periods must be non-zero".into()));
        }
        if self.timer_period_ms > self.scan_period_ms {
            return Err(ConfigError::Invalid(format!(
                "timer_period_ms ({}) exceeds scan_period_ms ({})",
                self.timer_period_ms, self.scan_period_ms
            )));
        }
        self.inputs = canonical(&self.inputs, Domain::Input)?;
        self.outputs = canonical(&self.outputs, Domain::Output)?;
        Ok(())
    }
}

fn canonical(addresses: &[String], domain: Domain) -> Result<Vec<String>, ConfigError> {
    let mut out: Vec<String> = Vec::with_capacity(addresses.len());
    for raw in addresses {
        let address = Address::parse(raw)
            .map_err(|err| ConfigError::Invalid(format!("{domain} address {raw}: {err}")))?;
        if address.domain != domain {
            return Err(ConfigError::Invalid(format!(
                "{raw} is not an {domain} address"
            )));
        }
        let key = address.key();
        if out.contains(&key) {
            return Err(ConfigError::Invalid(format!("duplicate {domain} address {key}")));
        }
        out.push(key);
    }
    Ok(out)
}

/// Errors that can occur while loading a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(String),
    #[error("config parse error: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlcConfig::default();
        assert_eq!(config.inputs.len(), 16);
        assert_eq!(config.inputs[0], "I0.0");
        assert_eq!(config.outputs[15], "Q1.7");
        assert_eq!(config.scan_period_ms, config.timer_period_ms);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = PlcConfig::from_toml("scan_period_ms = 500\ndefault_input_type = \"NC\"").unwrap();
        assert_eq!(config.scan_period_ms, 500);
        assert_eq!(config.timer_period_ms, 100);
        assert_eq!(config.default_input_type, InputType::Nc);
        assert_eq!(config.outputs.len(), 16);
    }

    #[test]
    fn test_addresses_are_canonicalised() {
        let config = PlcConfig::from_toml("inputs = [\"i0.0\", \"I2.3\"]").unwrap();
        assert_eq!(config.inputs, vec!["I0.0", "I2.3"]);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            PlcConfig::from_toml("timer_period_ms = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            PlcConfig::from_toml("scan_period_ms = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            PlcConfig::from_toml("timer_period_ms = 200"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            PlcConfig::from_toml("outputs = [\"I0.0\"]"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            PlcConfig::from_toml("inputs = [\"I0.0\", \"i0.0\"]"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            PlcConfig::from_toml("scan_period = 10"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plc.toml");
        std::fs::write(&path, "outputs = [\"Q0.0\", \"Q0.1\"]\n").unwrap();
        let config = PlcConfig::load(&path).unwrap();
        assert_eq!(config.outputs, vec!["Q0.0", "Q0.1"]);

        assert!(matches!(
            PlcConfig::load(dir.path().join("missing.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
