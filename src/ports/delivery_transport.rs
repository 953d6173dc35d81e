//! Delivery transport port.
//!
//! Abstracts the outbound HTTP POST used for webhook delivery so the
//! engine and its tests never touch a real socket. The transport performs
//! its own outcome classification; a non-2xx response is data, not an
//! error.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::webhook::AttemptOutcome;

/// Port for posting webhook payloads to subscriber endpoints.
///
/// Implementations must enforce a bounded request timeout; a hung
/// subscriber must never block the worker pool indefinitely.
#[async_trait]
pub trait DeliveryTransport: Send + Sync {
    /// Sends one HTTP POST and classifies the outcome.
    async fn post(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: &str,
    ) -> AttemptOutcome;
}
