//! In-memory implementation of WebhookStore.
//!
//! Used by tests and local development; mirrors the PostgreSQL adapter's
//! semantics, including idempotent insertion and atomic claiming.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, EventId, Timestamp, WebhookId};
use crate::domain::webhook::WebhookDelivery;
use crate::ports::{InsertOutcome, WebhookStore};

/// In-memory webhook store.
#[derive(Default)]
pub struct InMemoryWebhookStore {
    webhooks: RwLock<HashMap<WebhookId, WebhookDelivery>>,
}

impl InMemoryWebhookStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records (test helper).
    pub async fn len(&self) -> usize {
        self.webhooks.read().await.len()
    }

    /// True when no records are stored (test helper).
    pub async fn is_empty(&self) -> bool {
        self.webhooks.read().await.is_empty()
    }

    /// Snapshot of every stored record (test helper).
    pub async fn all(&self) -> Vec<WebhookDelivery> {
        self.webhooks.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl WebhookStore for InMemoryWebhookStore {
    async fn insert(&self, webhook: &WebhookDelivery) -> Result<InsertOutcome, DomainError> {
        let mut webhooks = self.webhooks.write().await;
        if webhooks.values().any(|w| w.event_id == webhook.event_id) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        webhooks.insert(webhook.id, webhook.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn update(&self, webhook: &WebhookDelivery) -> Result<(), DomainError> {
        let mut webhooks = self.webhooks.write().await;
        let stored = webhooks.get_mut(&webhook.id).ok_or_else(|| {
            DomainError::new(ErrorCode::WebhookNotFound, "Webhook not found")
        })?;
        *stored = webhook.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: &WebhookId) -> Result<Option<WebhookDelivery>, DomainError> {
        Ok(self.webhooks.read().await.get(id).cloned())
    }

    async fn find_by_event_id(
        &self,
        event_id: &EventId,
    ) -> Result<Option<WebhookDelivery>, DomainError> {
        Ok(self
            .webhooks
            .read()
            .await
            .values()
            .find(|w| &w.event_id == event_id)
            .cloned())
    }

    async fn claim_due(
        &self,
        now: Timestamp,
        limit: u32,
    ) -> Result<Vec<WebhookDelivery>, DomainError> {
        let mut webhooks = self.webhooks.write().await;

        let mut due_ids: Vec<(Timestamp, WebhookId)> = webhooks
            .values()
            .filter(|w| w.is_due(now))
            .filter_map(|w| w.next_retry_at.map(|at| (at, w.id)))
            .collect();
        due_ids.sort_by(|a, b| a.0.cmp(&b.0));
        due_ids.truncate(limit as usize);

        let mut claimed = Vec::with_capacity(due_ids.len());
        for (_, id) in due_ids {
            if let Some(webhook) = webhooks.get_mut(&id) {
                webhook.claim(now)?;
                claimed.push(webhook.clone());
            }
        }
        Ok(claimed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::PaymentId;
    use crate::domain::payment::PaymentEventType;
    use crate::domain::webhook::{AttemptOutcome, RetryBackoff, WebhookStatus};
    use serde_json::json;
    use std::collections::HashMap as StdHashMap;

    fn test_webhook(event_id: &str) -> WebhookDelivery {
        WebhookDelivery::create(
            WebhookId::new(),
            EventId::new(event_id).unwrap(),
            PaymentEventType::Captured,
            Some(PaymentId::new()),
            "https://subscriber.example.com/hooks".to_string(),
            StdHashMap::new(),
            json!({}),
            3,
        )
    }

    fn failed_once(event_id: &str, now: Timestamp) -> WebhookDelivery {
        let mut webhook = test_webhook(event_id);
        webhook
            .record_failure(
                &AttemptOutcome::Responded {
                    status_code: 500,
                    body: String::new(),
                },
                &RetryBackoff::default(),
                now,
            )
            .unwrap();
        webhook
    }

    #[tokio::test]
    async fn insert_is_idempotent_on_event_id() {
        let store = InMemoryWebhookStore::new();
        let first = test_webhook("evt_1");
        let duplicate = test_webhook("evt_1");

        assert_eq!(store.insert(&first).await.unwrap(), InsertOutcome::Inserted);
        assert_eq!(
            store.insert(&duplicate).await.unwrap(),
            InsertOutcome::AlreadyExists
        );
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn find_by_event_id_works() {
        let store = InMemoryWebhookStore::new();
        let webhook = test_webhook("evt_find");
        store.insert(&webhook).await.unwrap();

        let found = store
            .find_by_event_id(&EventId::new("evt_find").unwrap())
            .await
            .unwrap();

        assert_eq!(found.unwrap().id, webhook.id);
    }

    #[tokio::test]
    async fn claim_due_returns_only_due_records() {
        let store = InMemoryWebhookStore::new();
        let now = Timestamp::from_unix_secs(1_700_000_000);

        let due = failed_once("evt_due", now);
        let pending = test_webhook("evt_pending");
        store.insert(&due).await.unwrap();
        store.insert(&pending).await.unwrap();

        let after_delay = now.plus_secs(5 * 60);
        let claimed = store.claim_due(after_delay, 10).await.unwrap();

        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].id, due.id);
        assert_eq!(claimed[0].status, WebhookStatus::Pending);
    }

    #[tokio::test]
    async fn claim_due_does_not_return_records_before_their_time() {
        let store = InMemoryWebhookStore::new();
        let now = Timestamp::from_unix_secs(1_700_000_000);
        store.insert(&failed_once("evt_1", now)).await.unwrap();

        let claimed = store.claim_due(now.plus_secs(60), 10).await.unwrap();

        assert!(claimed.is_empty());
    }

    #[tokio::test]
    async fn second_claim_cannot_take_the_same_record() {
        let store = InMemoryWebhookStore::new();
        let now = Timestamp::from_unix_secs(1_700_000_000);
        store.insert(&failed_once("evt_1", now)).await.unwrap();

        let after_delay = now.plus_secs(5 * 60);
        let first_sweep = store.claim_due(after_delay, 10).await.unwrap();
        let second_sweep = store.claim_due(after_delay, 10).await.unwrap();

        assert_eq!(first_sweep.len(), 1);
        assert!(second_sweep.is_empty());
    }

    #[tokio::test]
    async fn claim_due_respects_limit_and_orders_by_due_time() {
        let store = InMemoryWebhookStore::new();
        let now = Timestamp::from_unix_secs(1_700_000_000);

        let early = failed_once("evt_early", now.minus_secs(120));
        let late = failed_once("evt_late", now);
        store.insert(&late).await.unwrap();
        store.insert(&early).await.unwrap();

        let after_delay = now.plus_secs(5 * 60);
        let claimed = store.claim_due(after_delay, 1).await.unwrap();

        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].id, early.id);
    }

    #[tokio::test]
    async fn update_unknown_webhook_is_not_found() {
        let store = InMemoryWebhookStore::new();
        let err = store.update(&test_webhook("evt_x")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::WebhookNotFound);
    }
}
