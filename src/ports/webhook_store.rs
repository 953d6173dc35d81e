//! Webhook store port.
//!
//! Persistence boundary for `WebhookDelivery` records: keyed by id,
//! unique on `event_id` for idempotent creation, and filterable by
//! `(status, next_retry_at)` for the retry scheduler's sweep.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventId, Timestamp, WebhookId};
use crate::domain::webhook::WebhookDelivery;

/// Result of attempting to insert a webhook record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Record was inserted (first time seeing this event id).
    Inserted,
    /// A record with this event id already exists (duplicate event).
    AlreadyExists,
}

/// Port for persisting webhook delivery records.
#[async_trait]
pub trait WebhookStore: Send + Sync {
    /// Attempts to insert a webhook record.
    ///
    /// Uses `ON CONFLICT DO NOTHING` semantics on `event_id` so that
    /// concurrent creation of the same event cannot produce a duplicate
    /// deliverable record.
    async fn insert(&self, webhook: &WebhookDelivery) -> Result<InsertOutcome, DomainError>;

    /// Persists the current state of a webhook record.
    ///
    /// # Errors
    ///
    /// Returns `WebhookNotFound` if no such record exists.
    async fn update(&self, webhook: &WebhookDelivery) -> Result<(), DomainError>;

    /// Finds a record by its id.
    async fn find_by_id(&self, id: &WebhookId) -> Result<Option<WebhookDelivery>, DomainError>;

    /// Finds a record by its event id.
    async fn find_by_event_id(
        &self,
        event_id: &EventId,
    ) -> Result<Option<WebhookDelivery>, DomainError>;

    /// Atomically claims up to `limit` records due for redelivery.
    ///
    /// Claimed records are moved from `Retrying` back to `Pending` (with
    /// `next_retry_at` cleared) before being returned, so two concurrent
    /// sweeps can never dispatch the same webhook. Implementations back
    /// this with `SELECT ... FOR UPDATE SKIP LOCKED` or an equivalent.
    async fn claim_due(
        &self,
        now: Timestamp,
        limit: u32,
    ) -> Result<Vec<WebhookDelivery>, DomainError>;
}
