//! Processor configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Processor configuration (external payment processor + circuit breaker)
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorConfig {
    /// Processor API key
    pub api_key: String,

    /// Request timeout for processor calls in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Consecutive transient failures before the breaker opens
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Seconds the breaker stays open before a half-open trial
    #[serde(default = "default_recovery_timeout")]
    pub recovery_timeout_secs: u64,
}

impl ProcessorConfig {
    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Get recovery timeout as Duration
    pub fn recovery_timeout(&self) -> Duration {
        Duration::from_secs(self.recovery_timeout_secs)
    }

    /// Validate processor configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.api_key.is_empty() {
            return Err(ValidationError::MissingRequired("PROCESSOR_API_KEY"));
        }
        if !self.api_key.starts_with("pk_") {
            return Err(ValidationError::InvalidProcessorKey);
        }
        if self.request_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            request_timeout_secs: default_request_timeout(),
            failure_threshold: default_failure_threshold(),
            recovery_timeout_secs: default_recovery_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    10
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_recovery_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProcessorConfig::default();
        assert_eq!(config.failure_threshold, 5);
        assert_eq!(config.recovery_timeout(), Duration::from_secs(30));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_validation_missing_api_key() {
        let config = ProcessorConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_key_prefix() {
        let config = ProcessorConfig {
            api_key: "sk_wrong".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_zero_timeout() {
        let config = ProcessorConfig {
            api_key: "pk_test_abc".to_string(),
            request_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_valid_config() {
        let config = ProcessorConfig {
            api_key: "pk_test_abc".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
