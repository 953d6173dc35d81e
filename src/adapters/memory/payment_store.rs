//! In-memory implementation of PaymentStore.
//!
//! Used by tests and local development; mirrors the semantics of the
//! PostgreSQL adapter, including the optimistic version check.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, ExternalId, PaymentId};
use crate::domain::payment::Payment;
use crate::ports::PaymentStore;

/// In-memory payment store.
#[derive(Default)]
pub struct InMemoryPaymentStore {
    payments: RwLock<HashMap<PaymentId, Payment>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored payments (test helper).
    pub async fn len(&self) -> usize {
        self.payments.read().await.len()
    }

    /// True when no payments are stored (test helper).
    pub async fn is_empty(&self) -> bool {
        self.payments.read().await.is_empty()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn insert(&self, payment: &Payment) -> Result<(), DomainError> {
        let mut payments = self.payments.write().await;
        if payments
            .values()
            .any(|p| p.external_id == payment.external_id)
        {
            return Err(DomainError::conflict(format!(
                "Payment with external id '{}' already exists",
                payment.external_id
            )));
        }
        payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn update(&self, payment: &Payment) -> Result<(), DomainError> {
        let mut payments = self.payments.write().await;
        let stored = payments.get_mut(&payment.id).ok_or_else(|| {
            DomainError::new(ErrorCode::PaymentNotFound, "Payment not found")
        })?;
        if stored.version != payment.version {
            return Err(DomainError::conflict(format!(
                "Payment {} was modified concurrently (expected version {}, found {})",
                payment.id, payment.version, stored.version
            )));
        }
        let mut updated = payment.clone();
        updated.version += 1;
        *stored = updated;
        Ok(())
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError> {
        Ok(self.payments.read().await.get(id).cloned())
    }

    async fn find_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<Payment>, DomainError> {
        Ok(self
            .payments
            .read()
            .await
            .values()
            .find(|p| &p.external_id == external_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Currency, Money};
    use crate::domain::payment::PaymentMethod;
    use std::collections::HashMap as StdHashMap;

    fn test_payment(external: &str) -> Payment {
        Payment::create(
            PaymentId::new(),
            ExternalId::new(external).unwrap(),
            Money::new("10.00".parse().unwrap(), Currency::USD),
            PaymentMethod::CreditCard,
            None,
            StdHashMap::new(),
        )
    }

    #[tokio::test]
    async fn insert_and_find_by_id() {
        let store = InMemoryPaymentStore::new();
        let payment = test_payment("order-1");

        store.insert(&payment).await.unwrap();

        let found = store.find_by_id(&payment.id).await.unwrap().unwrap();
        assert_eq!(found.external_id.as_str(), "order-1");
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_external_id() {
        let store = InMemoryPaymentStore::new();
        store.insert(&test_payment("order-1")).await.unwrap();

        let err = store.insert(&test_payment("order-1")).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn find_by_external_id_works() {
        let store = InMemoryPaymentStore::new();
        let payment = test_payment("order-7");
        store.insert(&payment).await.unwrap();

        let found = store
            .find_by_external_id(&ExternalId::new("order-7").unwrap())
            .await
            .unwrap();

        assert_eq!(found.unwrap().id, payment.id);
    }

    #[tokio::test]
    async fn update_bumps_version() {
        let store = InMemoryPaymentStore::new();
        let mut payment = test_payment("order-1");
        store.insert(&payment).await.unwrap();

        payment.charge("txn_1".to_string()).unwrap();
        store.update(&payment).await.unwrap();

        let stored = store.find_by_id(&payment.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn stale_update_loses_with_conflict() {
        let store = InMemoryPaymentStore::new();
        let payment = test_payment("order-1");
        store.insert(&payment).await.unwrap();

        // Two workers load the same version.
        let mut first = store.find_by_id(&payment.id).await.unwrap().unwrap();
        let mut second = store.find_by_id(&payment.id).await.unwrap().unwrap();

        first.charge("txn_1".to_string()).unwrap();
        store.update(&first).await.unwrap();

        second.void().unwrap();
        let err = store.update(&second).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::Conflict);
        // The winner's state stands.
        let stored = store.find_by_id(&payment.id).await.unwrap().unwrap();
        assert_eq!(stored.status, first.status);
    }

    #[tokio::test]
    async fn update_unknown_payment_is_not_found() {
        let store = InMemoryPaymentStore::new();
        let payment = test_payment("order-1");

        let err = store.update(&payment).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::PaymentNotFound);
    }
}
