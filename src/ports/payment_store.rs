//! Payment store port.
//!
//! Persistence boundary for `Payment` aggregates: keyed by id and by the
//! unique caller-facing external id. Concurrent mutations of the same
//! payment are serialized with optimistic version checks; the loser of a
//! race receives `Conflict` and may retry the whole operation.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ExternalId, PaymentId};
use crate::domain::payment::Payment;

/// Port for persisting payments.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Inserts a new payment.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if a payment with the same `external_id` already
    /// exists.
    async fn insert(&self, payment: &Payment) -> Result<(), DomainError>;

    /// Updates an existing payment, using `payment.version` as the
    /// expected version and bumping it by one.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the stored version differs (a concurrent mutation
    ///   won the race)
    /// - `PaymentNotFound` if no such payment exists
    async fn update(&self, payment: &Payment) -> Result<(), DomainError>;

    /// Finds a payment by its internal id.
    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError>;

    /// Finds a payment by its caller-facing external id.
    async fn find_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<Payment>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trait object safety test
    #[test]
    fn payment_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn PaymentStore) {}
    }
}
