//! RetryScheduler - Background service driving webhook redelivery.
//!
//! A recurring sweep selects webhooks with `status = Retrying` and
//! `next_retry_at <= now`, claims them atomically at the store, and
//! resubmits each to the delivery engine. One webhook's failure never
//! aborts the rest of the batch; every outcome flows through the same
//! classification logic the immediate delivery path uses.
//!
//! ## Graceful Shutdown
//!
//! The service listens for a shutdown signal and completes the current
//! batch before stopping. An in-flight delivery cancelled by process death
//! leaves its record in `Pending`, never partially `Delivered`; the claim
//! is re-issued by a later sweep once the record fails back to `Retrying`
//! or is recovered operationally.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use crate::domain::foundation::{Clock, DomainError, SystemClock};
use crate::domain::webhook::WebhookStatus;
use crate::ports::WebhookStore;

use super::WebhookDeliveryEngine;

/// Configuration for the RetryScheduler service.
#[derive(Debug, Clone)]
pub struct RetrySchedulerConfig {
    /// How often to sweep for due webhooks.
    pub sweep_interval: Duration,

    /// Maximum webhooks to claim per sweep.
    pub batch_size: u32,
}

impl Default for RetrySchedulerConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(60),
            batch_size: 100,
        }
    }
}

impl RetrySchedulerConfig {
    /// Create config with custom sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Create config with custom batch size.
    pub fn with_batch_size(mut self, size: u32) -> Self {
        self.batch_size = size;
        self
    }
}

/// Background service that redelivers webhooks on schedule.
pub struct RetryScheduler {
    store: Arc<dyn WebhookStore>,
    engine: Arc<WebhookDeliveryEngine>,
    config: RetrySchedulerConfig,
    clock: Arc<dyn Clock>,
}

impl RetryScheduler {
    /// Create a scheduler with default configuration.
    pub fn new(store: Arc<dyn WebhookStore>, engine: Arc<WebhookDeliveryEngine>) -> Self {
        Self::with_config(store, engine, RetrySchedulerConfig::default())
    }

    /// Create a scheduler with custom configuration.
    pub fn with_config(
        store: Arc<dyn WebhookStore>,
        engine: Arc<WebhookDeliveryEngine>,
        config: RetrySchedulerConfig,
    ) -> Self {
        Self::with_clock(store, engine, config, Arc::new(SystemClock))
    }

    /// Create a scheduler with an injected clock (deterministic tests).
    pub fn with_clock(
        store: Arc<dyn WebhookStore>,
        engine: Arc<WebhookDeliveryEngine>,
        config: RetrySchedulerConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            engine,
            config,
            clock,
        }
    }

    /// Run the sweep loop until shutdown signal is received.
    ///
    /// # Arguments
    ///
    /// * `shutdown` - Watch channel that signals when to stop
    ///
    /// # Returns
    ///
    /// Returns `Ok(())` on graceful shutdown, or error if claiming fails
    /// fatally.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), DomainError> {
        let mut interval = time::interval(self.config.sweep_interval);

        loop {
            tokio::select! {
                // Check for shutdown signal
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        // Shutdown requested - finish one final sweep then exit
                        self.process_batch().await?;
                        return Ok(());
                    }
                }

                // Sweep interval elapsed
                _ = interval.tick() => {
                    self.process_batch().await?;
                }
            }
        }
    }

    /// Process a single batch of due webhooks.
    ///
    /// Returns the number of webhooks that reached `Delivered` this sweep.
    /// This method is also useful for testing without running the full
    /// loop.
    pub async fn process_batch(&self) -> Result<usize, DomainError> {
        let claimed = self
            .store
            .claim_due(self.clock.now(), self.config.batch_size)
            .await?;

        if claimed.is_empty() {
            return Ok(0);
        }

        tracing::debug!(count = claimed.len(), "Claimed webhooks for redelivery");

        // Deliveries to distinct endpoints are independent; run the whole
        // batch concurrently.
        let results =
            futures::future::join_all(claimed.iter().map(|w| self.engine.deliver(&w.id))).await;

        let mut delivered_count = 0;
        for (webhook, result) in claimed.iter().zip(results) {
            match result {
                Ok(updated) => {
                    if updated.status == WebhookStatus::Delivered {
                        delivered_count += 1;
                    }
                }
                Err(e) => {
                    // One webhook's problem must not abort the batch.
                    tracing::warn!(
                        webhook_id = %webhook.id,
                        error = %e,
                        "Redelivery attempt errored"
                    );
                }
            }
        }

        Ok(delivered_count)
    }

    /// Run exactly one sweep (for testing).
    pub async fn sweep_once(&self) -> Result<usize, DomainError> {
        self.process_batch().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryWebhookStore;
    use crate::application::DeliveryConfig;
    use crate::domain::foundation::{ManualClock, PaymentId};
    use crate::domain::payment::{Payment, PaymentEvent, PaymentEventType};
    use crate::domain::webhook::{AttemptOutcome, WebhookSigner};
    use crate::ports::DeliveryTransport;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const URL: &str = "https://subscriber.example.com/hooks";

    /// Transport whose outcome can be flipped mid-test.
    struct SwitchableTransport {
        fail: Mutex<bool>,
        posts: Mutex<usize>,
    }

    impl SwitchableTransport {
        fn failing() -> Arc<Self> {
            Arc::new(Self {
                fail: Mutex::new(true),
                posts: Mutex::new(0),
            })
        }

        fn set_fail(&self, fail: bool) {
            *self.fail.lock().unwrap() = fail;
        }

        fn post_count(&self) -> usize {
            *self.posts.lock().unwrap()
        }
    }

    #[async_trait]
    impl DeliveryTransport for SwitchableTransport {
        async fn post(
            &self,
            _url: &str,
            _headers: &HashMap<String, String>,
            _body: &str,
        ) -> AttemptOutcome {
            *self.posts.lock().unwrap() += 1;
            if *self.fail.lock().unwrap() {
                AttemptOutcome::Responded {
                    status_code: 500,
                    body: "boom".to_string(),
                }
            } else {
                AttemptOutcome::Responded {
                    status_code: 200,
                    body: "ok".to_string(),
                }
            }
        }
    }

    struct Harness {
        scheduler: RetryScheduler,
        engine: Arc<WebhookDeliveryEngine>,
        store: Arc<InMemoryWebhookStore>,
        transport: Arc<SwitchableTransport>,
        clock: Arc<ManualClock>,
    }

    fn harness() -> Harness {
        let store = Arc::new(InMemoryWebhookStore::new());
        let clock = ManualClock::starting_at(1_700_000_000);
        let transport = SwitchableTransport::failing();
        let engine = Arc::new(WebhookDeliveryEngine::with_clock(
            store.clone(),
            transport.clone(),
            WebhookSigner::with_clock("whsec_test", clock.clone()),
            DeliveryConfig::default(),
            clock.clone(),
        ));
        let scheduler = RetryScheduler::with_clock(
            store.clone(),
            engine.clone(),
            RetrySchedulerConfig::default().with_batch_size(10),
            clock.clone(),
        );
        Harness {
            scheduler,
            engine,
            store,
            transport,
            clock,
        }
    }

    fn sample_event() -> PaymentEvent {
        let payment = Payment::create(
            PaymentId::new(),
            crate::domain::foundation::ExternalId::new("order-1").unwrap(),
            crate::domain::foundation::Money::new(
                "10.00".parse().unwrap(),
                crate::domain::foundation::Currency::USD,
            ),
            crate::domain::payment::PaymentMethod::CreditCard,
            None,
            HashMap::new(),
        );
        PaymentEvent::for_payment(PaymentEventType::Captured, &payment)
    }

    /// Creates a webhook, fails its first delivery, and returns it in
    /// `Retrying`.
    async fn retrying_webhook(h: &Harness) -> crate::domain::webhook::WebhookDelivery {
        let webhook = h.engine.create_event(sample_event(), None, URL).await.unwrap();
        h.engine.deliver(&webhook.id).await.unwrap()
    }

    #[tokio::test]
    async fn sweep_with_nothing_due_returns_zero() {
        let h = harness();

        assert_eq!(h.scheduler.sweep_once().await.unwrap(), 0);
        assert_eq!(h.transport.post_count(), 0);
    }

    #[tokio::test]
    async fn sweep_skips_webhooks_not_yet_due() {
        let h = harness();
        retrying_webhook(&h).await;
        let posts_after_first_attempt = h.transport.post_count();

        // Only one minute has passed; the first retry is due after five.
        h.clock.advance_secs(60);

        assert_eq!(h.scheduler.sweep_once().await.unwrap(), 0);
        assert_eq!(h.transport.post_count(), posts_after_first_attempt);
    }

    #[tokio::test]
    async fn sweep_redelivers_due_webhook() {
        let h = harness();
        let webhook = retrying_webhook(&h).await;

        h.clock.advance_secs(5 * 60);
        h.transport.set_fail(false);

        assert_eq!(h.scheduler.sweep_once().await.unwrap(), 1);
        let stored = h.store.find_by_id(&webhook.id).await.unwrap().unwrap();
        assert_eq!(stored.status, WebhookStatus::Delivered);
    }

    #[tokio::test]
    async fn failed_redelivery_goes_back_to_retrying() {
        let h = harness();
        let webhook = retrying_webhook(&h).await;

        h.clock.advance_secs(5 * 60);

        assert_eq!(h.scheduler.sweep_once().await.unwrap(), 0);
        let stored = h.store.find_by_id(&webhook.id).await.unwrap().unwrap();
        assert_eq!(stored.status, WebhookStatus::Retrying);
        assert_eq!(stored.retry_count, 2);
    }

    #[tokio::test]
    async fn one_bad_webhook_does_not_abort_the_batch() {
        let h = harness();
        let first = retrying_webhook(&h).await;
        let second = {
            let webhook = h.engine.create_event(sample_event(), None, URL).await.unwrap();
            h.engine.deliver(&webhook.id).await.unwrap()
        };

        h.clock.advance_secs(5 * 60);
        h.transport.set_fail(false);

        let delivered = h.scheduler.sweep_once().await.unwrap();

        assert_eq!(delivered, 2);
        for id in [first.id, second.id] {
            let stored = h.store.find_by_id(&id).await.unwrap().unwrap();
            assert_eq!(stored.status, WebhookStatus::Delivered);
        }
    }

    #[tokio::test]
    async fn exhausted_webhook_expires_through_sweeps() {
        let h = harness();
        let webhook = retrying_webhook(&h).await;

        // Keep failing through all three retries.
        for _ in 0..3 {
            let stored = h.store.find_by_id(&webhook.id).await.unwrap().unwrap();
            let due = stored.next_retry_at.expect("retrying webhook has a due time");
            h.clock.set(due.as_unix_secs());
            h.scheduler.sweep_once().await.unwrap();
        }

        let stored = h.store.find_by_id(&webhook.id).await.unwrap().unwrap();
        assert_eq!(stored.status, WebhookStatus::Expired);
        assert_eq!(stored.retry_count, 3);

        // Nothing further to claim.
        h.clock.advance_secs(24 * 60 * 60);
        assert_eq!(h.scheduler.sweep_once().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown_signal() {
        let h = harness();
        retrying_webhook(&h).await;
        h.clock.advance_secs(5 * 60);
        h.transport.set_fail(false);

        let scheduler = RetryScheduler::with_clock(
            h.store.clone(),
            h.engine.clone(),
            RetrySchedulerConfig::default()
                .with_sweep_interval(Duration::from_millis(10))
                .with_batch_size(10),
            h.clock.clone(),
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

        // Give it time to sweep at least once.
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();

        let result = handle.await.unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn config_defaults_are_reasonable() {
        let config = RetrySchedulerConfig::default();

        assert_eq!(config.sweep_interval, Duration::from_secs(60));
        assert_eq!(config.batch_size, 100);
    }

    #[tokio::test]
    async fn sweep_respects_batch_size() {
        let h = harness();
        for _ in 0..3 {
            retrying_webhook(&h).await;
        }
        h.clock.advance_secs(5 * 60);
        h.transport.set_fail(false);

        let scheduler = RetryScheduler::with_clock(
            h.store.clone(),
            h.engine.clone(),
            RetrySchedulerConfig::default().with_batch_size(2),
            h.clock.clone(),
        );

        assert_eq!(scheduler.sweep_once().await.unwrap(), 2);
        assert_eq!(scheduler.sweep_once().await.unwrap(), 1);
    }
}
