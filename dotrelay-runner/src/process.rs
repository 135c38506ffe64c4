use dotrelay_core::Settings;
use std::collections::BTreeMap;
use std::time::Duration;

/// Process-wide execution settings, fixed at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessConfig {
    /// Applied when a request carries no timeout of its own.
    pub default_timeout: Duration,
    /// How long to keep draining output once the process has ended.
    pub drain_grace: Duration,
    pub env: BTreeMap<String, String>,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for ProcessConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            default_timeout: settings.default_timeout(),
            drain_grace: settings.drain_grace(),
            env: settings.env.clone(),
        }
    }
}

impl ProcessConfig {
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_drain_grace(mut self, grace: Duration) -> Self {
        self.drain_grace = grace;
        self
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }
}
