use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Runtime options for a [`State`](crate::State).
///
/// Every field has a default, so a TOML document only needs the keys it
/// changes:
///
/// ```
/// use tree_state::StateConfig;
///
/// let config = StateConfig::from_toml_str("log_emissions = true").unwrap();
/// assert!(config.log_emissions);
/// assert_eq!(config.thread_name, "tree-state-dispatcher");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StateConfig {
    /// Name given to the dispatcher thread.
    pub thread_name: String,
    /// Log every emission and its payload at `trace` level.
    pub log_emissions: bool,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            thread_name: "tree-state-dispatcher".to_string(),
            log_emissions: false,
        }
    }
}

impl StateConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on malformed TOML, unknown keys or invalid
    /// values.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn with_log_emissions(mut self, enabled: bool) -> Self {
        self.log_emissions = enabled;
        self
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::ThreadName`] when the thread name is empty or
    /// contains a NUL byte.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thread_name.is_empty() || self.thread_name.contains('\0') {
            return Err(ConfigError::ThreadName(self.thread_name.clone()));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid state configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid dispatcher thread name {0:?}")]
    ThreadName(String),
}
