use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use ocfl_types::VersionAuthor;

use crate::error::ConfigError;

/// Configuration for a session factory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long a commit waits for the object's commit lock.
    pub lock_timeout_ms: u64,
    /// Idle time after which an open session may be reaped. `None` keeps
    /// sessions until they are committed or aborted.
    pub session_lease_secs: Option<u64>,
    /// Author stamped on versions whose session did not set one.
    pub default_author: Option<VersionAuthor>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 30_000,
            session_lease_secs: None,
            default_author: None,
        }
    }
}

impl SessionConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn session_lease(&self) -> Option<Duration> {
        self.session_lease_secs.map(Duration::from_secs)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Load from a TOML file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}
