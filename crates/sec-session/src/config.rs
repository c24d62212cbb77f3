//! Security manager configuration.
//!
//! # Config File Format
//!
//! ```toml
//! rsa_key_bits = 2048
//! validation_timeout_ms = 5000
//! max_session_id_attempts = 64
//! require_trust_anchor = true
//! enforce_access_control = false
//! ```
//!
//! Missing keys take their defaults.

use sec_crypto::MIN_KEY_BITS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Tunables of a [`SecurityManager`](crate::SecurityManager).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Size of identity keys minted by the manager
    pub rsa_key_bits: usize,
    /// Bound on the wait for session validation in encrypt/decrypt
    pub validation_timeout_ms: u64,
    /// Draws allowed when picking a session id
    pub max_session_id_attempts: u32,
    /// Peer chains must end at a configured trust anchor
    pub require_trust_anchor: bool,
    /// Check callers of policy-mutating operations
    pub enforce_access_control: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            rsa_key_bits: 2048,
            validation_timeout_ms: 5000,
            max_session_id_attempts: 64,
            require_trust_anchor: true,
            enforce_access_control: false,
        }
    }
}

impl SecurityConfig {
    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::from_toml_str(&content)
    }

    /// Reject values the manager cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rsa_key_bits < MIN_KEY_BITS {
            return Err(ConfigError::Invalid(format!(
                "rsa_key_bits must be at least {MIN_KEY_BITS}, got {}",
                self.rsa_key_bits
            )));
        }
        if self.max_session_id_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_session_id_attempts must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Validation wait as a duration.
    pub fn validation_timeout(&self) -> Duration {
        Duration::from_millis(self.validation_timeout_ms)
    }
}

/// Errors that can occur during config loading.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// File I/O error.
    #[error("Failed to read {path}: {error}")]
    Io {
        /// Path of the file that failed to load.
        path: String,
        /// Error message from the I/O operation.
        error: String,
    },
    /// TOML parsing error.
    #[error("Failed to parse config: {0}")]
    Parse(String),
    /// Value out of range.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_document_gives_defaults() {
        assert_eq!(
            SecurityConfig::from_toml_str("").unwrap(),
            SecurityConfig::default()
        );
    }

    #[test]
    fn test_partial_override() {
        let config = SecurityConfig::from_toml_str(
            "validation_timeout_ms = 250\nenforce_access_control = true\n",
        )
        .unwrap();

        assert_eq!(config.validation_timeout(), Duration::from_millis(250));
        assert!(config.enforce_access_control);
        assert_eq!(config.rsa_key_bits, 2048);
    }

    #[test]
    fn test_small_keys_rejected() {
        let err = SecurityConfig::from_toml_str("rsa_key_bits = 512").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let err = SecurityConfig::from_toml_str("max_session_id_attempts = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_malformed_toml() {
        let err = SecurityConfig::from_toml_str("rsa_key_bits = \"big\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "require_trust_anchor = false").unwrap();

        let config = SecurityConfig::load(file.path()).unwrap();
        assert!(!config.require_trust_anchor);

        assert!(matches!(
            SecurityConfig::load("/nonexistent/security.toml"),
            Err(ConfigError::Io { .. })
        ));
    }
}
