//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid webhook signing secret format")]
    InvalidSigningSecret,

    #[error("Webhook endpoint must be an http(s) URL")]
    InvalidWebhookEndpoint,

    #[error("Invalid processor API key format")]
    InvalidProcessorKey,

    #[error("Amount ceiling must be positive")]
    InvalidAmountCeiling,

    #[error("Backoff base delay must not exceed max delay")]
    InvalidBackoffBounds,
}
