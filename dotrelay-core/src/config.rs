use crate::{DotrelayError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Read-only startup settings, loaded once and passed explicitly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Name or path of the tool-chain driver.
    pub executable: String,
    /// Ceiling applied to every execution that does not carry its own timeout.
    pub default_timeout_secs: u64,
    /// How long to keep reading output after the process has exited.
    pub drain_grace_ms: u64,
    pub bind: String,
    pub debug: bool,
    /// Extra environment variables for every child process.
    pub env: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        let mut env = BTreeMap::new();
        env.insert("DOTNET_NOLOGO".to_string(), "1".to_string());
        env.insert("DOTNET_CLI_TELEMETRY_OPTOUT".to_string(), "1".to_string());

        Self {
            executable: "dotnet".to_string(),
            default_timeout_secs: 600,
            drain_grace_ms: 2000,
            bind: "127.0.0.1:3000".to_string(),
            debug: false,
            env,
        }
    }
}

impl Settings {
    /// Load settings from an optional TOML file; missing keys keep their defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                Self::from_toml(&content)?
            }
            None => Self::default(),
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| DotrelayError::InvalidConfiguration(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.executable.trim().is_empty() {
            return Err(DotrelayError::InvalidConfiguration(
                "executable must not be empty".to_string(),
            ));
        }
        if self.default_timeout_secs == 0 {
            return Err(DotrelayError::InvalidConfiguration(
                "default_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    pub fn drain_grace(&self) -> Duration {
        Duration::from_millis(self.drain_grace_ms)
    }
}
