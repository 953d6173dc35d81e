//! Webhook delivery configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Webhook configuration (signing, delivery, retry schedule)
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// HMAC signing secret shared with subscribers
    pub signing_secret: String,

    /// Subscriber endpoint receiving lifecycle events
    pub endpoint: String,

    /// Retry budget per webhook
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay after the first failed attempt, in seconds
    #[serde(default = "default_base_delay")]
    pub base_delay_secs: u64,

    /// Upper bound on any retry delay, in seconds
    #[serde(default = "default_max_delay")]
    pub max_delay_secs: u64,

    /// Request timeout for delivery POSTs in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum accepted age of inbound signatures in seconds
    #[serde(default = "default_signature_max_age")]
    pub signature_max_age_secs: u64,

    /// How often the retry scheduler sweeps, in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Maximum webhooks claimed per sweep
    #[serde(default = "default_sweep_batch_size")]
    pub sweep_batch_size: u32,
}

impl WebhookConfig {
    /// Get base delay as Duration
    pub fn base_delay(&self) -> Duration {
        Duration::from_secs(self.base_delay_secs)
    }

    /// Get max delay as Duration
    pub fn max_delay(&self) -> Duration {
        Duration::from_secs(self.max_delay_secs)
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Get signature max age as Duration
    pub fn signature_max_age(&self) -> Duration {
        Duration::from_secs(self.signature_max_age_secs)
    }

    /// Get sweep interval as Duration
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Validate webhook configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.signing_secret.is_empty() {
            return Err(ValidationError::MissingRequired("WEBHOOK_SIGNING_SECRET"));
        }
        if !self.signing_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidSigningSecret);
        }
        if self.endpoint.is_empty() {
            return Err(ValidationError::MissingRequired("WEBHOOK_ENDPOINT"));
        }
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(ValidationError::InvalidWebhookEndpoint);
        }
        if self.request_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.base_delay_secs > self.max_delay_secs {
            return Err(ValidationError::InvalidBackoffBounds);
        }
        Ok(())
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            signing_secret: String::new(),
            endpoint: String::new(),
            max_retries: default_max_retries(),
            base_delay_secs: default_base_delay(),
            max_delay_secs: default_max_delay(),
            request_timeout_secs: default_request_timeout(),
            signature_max_age_secs: default_signature_max_age(),
            sweep_interval_secs: default_sweep_interval(),
            sweep_batch_size: default_sweep_batch_size(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay() -> u64 {
    5 * 60
}

fn default_max_delay() -> u64 {
    60 * 60
}

fn default_request_timeout() -> u64 {
    15
}

fn default_signature_max_age() -> u64 {
    300
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_sweep_batch_size() -> u32 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> WebhookConfig {
        WebhookConfig {
            signing_secret: "whsec_abc123".to_string(),
            endpoint: "https://subscriber.example.com/hooks".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_match_backoff_schedule() {
        let config = WebhookConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.base_delay(), Duration::from_secs(300));
        assert_eq!(config.max_delay(), Duration::from_secs(3600));
        assert_eq!(config.sweep_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_validation_missing_secret() {
        let config = WebhookConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_secret_prefix() {
        let mut config = valid_config();
        config.signing_secret = "secret_abc".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_endpoint() {
        let mut config = valid_config();
        config.endpoint = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_backoff_bounds() {
        let mut config = valid_config();
        config.base_delay_secs = 7200;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_valid_config() {
        assert!(valid_config().validate().is_ok());
    }
}
