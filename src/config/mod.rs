//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment
//! variables using the `config` and `dotenvy` crates. Configuration is
//! loaded with the `PAYGATE` prefix and nested values use double
//! underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use paygate::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod ledger;
mod processor;
mod webhook;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use ledger::LedgerLimitsConfig;
pub use processor::ProcessorConfig;
pub use webhook::WebhookConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Contains all configuration sections for the paygate backend.
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Processor configuration (API key, timeouts, circuit breaker)
    pub processor: ProcessorConfig,

    /// Webhook configuration (signing, delivery, retry schedule)
    pub webhook: WebhookConfig,

    /// Ledger configuration (validation bounds)
    #[serde(default)]
    pub ledger: LedgerLimitsConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with the `PAYGATE` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `PAYGATE__DATABASE__URL=...` -> `database.url = ...`
    /// - `PAYGATE__WEBHOOK__SIGNING_SECRET=...` -> `webhook.signing_secret = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Required environment variables are missing
    /// - Values cannot be parsed into expected types
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("PAYGATE")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// Performs semantic validation of configuration:
    /// - URL formats
    /// - Pool size constraints
    /// - Required secret prefixes
    /// - Backoff bounds
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.database.validate()?;
        self.processor.validate()?;
        self.webhook.validate()?;
        self.ledger.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Helper to set environment variables for testing
    /// Uses double underscores to separate nested config values
    fn set_minimal_env() {
        env::set_var("PAYGATE__DATABASE__URL", "postgresql://test@localhost/paygate");
        env::set_var("PAYGATE__PROCESSOR__API_KEY", "pk_test_xxx");
        env::set_var("PAYGATE__WEBHOOK__SIGNING_SECRET", "whsec_xxx");
        env::set_var(
            "PAYGATE__WEBHOOK__ENDPOINT",
            "https://subscriber.example.com/hooks",
        );
    }

    fn clear_env() {
        env::remove_var("PAYGATE__DATABASE__URL");
        env::remove_var("PAYGATE__PROCESSOR__API_KEY");
        env::remove_var("PAYGATE__WEBHOOK__SIGNING_SECRET");
        env::remove_var("PAYGATE__WEBHOOK__ENDPOINT");
        env::remove_var("PAYGATE__WEBHOOK__MAX_RETRIES");
    }

    #[test]
    fn load_reads_prefixed_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();

        let config = AppConfig::load().expect("config should load");

        assert_eq!(config.database.url, "postgresql://test@localhost/paygate");
        assert_eq!(config.processor.api_key, "pk_test_xxx");
        assert_eq!(config.webhook.signing_secret, "whsec_xxx");
        assert!(config.validate().is_ok());

        clear_env();
    }

    #[test]
    fn load_applies_section_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();

        let config = AppConfig::load().expect("config should load");

        assert_eq!(config.webhook.max_retries, 3);
        assert_eq!(config.webhook.sweep_interval_secs, 60);
        assert_eq!(config.processor.failure_threshold, 5);

        clear_env();
    }

    #[test]
    fn nested_overrides_take_effect() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("PAYGATE__WEBHOOK__MAX_RETRIES", "5");

        let config = AppConfig::load().expect("config should load");

        assert_eq!(config.webhook.max_retries, 5);

        clear_env();
    }
}
