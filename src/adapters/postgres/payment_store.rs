//! PostgreSQL implementation of PaymentStore.
//!
//! Provides persistent storage for Payment aggregates using PostgreSQL.
//! Per-payment serialization is enforced with an optimistic version check:
//! updates match on `(id, version)` and losers receive a Conflict error.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    Currency, DomainError, ErrorCode, ExternalId, Money, PaymentId, Timestamp,
};
use crate::domain::payment::{Payment, PaymentMethod, PaymentStatus};
use crate::ports::PaymentStore;

/// PostgreSQL implementation of the PaymentStore port.
///
/// Uses sqlx for type-safe database operations with connection pooling.
pub struct PostgresPaymentStore {
    pool: PgPool,
}

impl PostgresPaymentStore {
    /// Creates a new PostgresPaymentStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a payment.
#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    external_id: String,
    amount: Decimal,
    currency: String,
    status: String,
    payment_method: String,
    processor_transaction_id: Option<String>,
    refunded_amount: Decimal,
    refund_count: i32,
    customer_email: Option<String>,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
    settled_at: Option<DateTime<Utc>>,
    version: i64,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let currency = Currency::from_code(&row.currency).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid currency: {}", e))
        })?;
        let status = parse_status(&row.status)?;
        let payment_method = PaymentMethod::parse(&row.payment_method).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid method: {}", e))
        })?;
        let external_id = ExternalId::new(row.external_id).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid external_id: {}", e))
        })?;
        let metadata: HashMap<String, String> =
            serde_json::from_value(row.metadata).unwrap_or_default();

        Ok(Payment {
            id: PaymentId::from_uuid(row.id),
            external_id,
            amount: Money::new(row.amount, currency),
            status,
            payment_method,
            processor_transaction_id: row.processor_transaction_id,
            refunded_amount: Money::new(row.refunded_amount, currency),
            refund_count: row.refund_count.max(0) as u32,
            customer_email: row.customer_email,
            metadata,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
            processed_at: row.processed_at.map(Timestamp::from_datetime),
            settled_at: row.settled_at.map(Timestamp::from_datetime),
            version: row.version,
        })
    }
}

fn parse_status(s: &str) -> Result<PaymentStatus, DomainError> {
    match s {
        "pending" => Ok(PaymentStatus::Pending),
        "authorized" => Ok(PaymentStatus::Authorized),
        "captured" => Ok(PaymentStatus::Captured),
        "settled" => Ok(PaymentStatus::Settled),
        "refunded" => Ok(PaymentStatus::Refunded),
        "partially_refunded" => Ok(PaymentStatus::PartiallyRefunded),
        "voided" => Ok(PaymentStatus::Voided),
        "failed" => Ok(PaymentStatus::Failed),
        "declined" => Ok(PaymentStatus::Declined),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid status value: {}", s),
        )),
    }
}

fn status_to_string(status: &PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Pending => "pending",
        PaymentStatus::Authorized => "authorized",
        PaymentStatus::Captured => "captured",
        PaymentStatus::Settled => "settled",
        PaymentStatus::Refunded => "refunded",
        PaymentStatus::PartiallyRefunded => "partially_refunded",
        PaymentStatus::Voided => "voided",
        PaymentStatus::Failed => "failed",
        PaymentStatus::Declined => "declined",
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, external_id, amount, currency, status, payment_method,
           processor_transaction_id, refunded_amount, refund_count,
           customer_email, metadata, created_at, updated_at, processed_at,
           settled_at, version
    FROM payments
"#;

#[async_trait]
impl PaymentStore for PostgresPaymentStore {
    async fn insert(&self, payment: &Payment) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, external_id, amount, currency, status, payment_method,
                processor_transaction_id, refunded_amount, refund_count,
                customer_email, metadata, created_at, updated_at,
                processed_at, settled_at, version
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.external_id.as_str())
        .bind(payment.amount.amount())
        .bind(payment.amount.currency().code())
        .bind(status_to_string(&payment.status))
        .bind(payment.payment_method.as_str())
        .bind(&payment.processor_transaction_id)
        .bind(payment.refunded_amount.amount())
        .bind(payment.refund_count as i32)
        .bind(&payment.customer_email)
        .bind(serde_json::to_value(&payment.metadata).unwrap_or_default())
        .bind(payment.created_at.as_datetime())
        .bind(payment.updated_at.as_datetime())
        .bind(payment.processed_at.map(|t| *t.as_datetime()))
        .bind(payment.settled_at.map(|t| *t.as_datetime()))
        .bind(payment.version)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("payments_external_id_key") {
                    return DomainError::conflict(format!(
                        "Payment with external id '{}' already exists",
                        payment.external_id
                    ));
                }
            }
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to save payment: {}", e))
        })?;

        Ok(())
    }

    async fn update(&self, payment: &Payment) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payments SET
                status = $3,
                processor_transaction_id = $4,
                refunded_amount = $5,
                refund_count = $6,
                metadata = $7,
                updated_at = $8,
                processed_at = $9,
                settled_at = $10,
                version = version + 1
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.version)
        .bind(status_to_string(&payment.status))
        .bind(&payment.processor_transaction_id)
        .bind(payment.refunded_amount.amount())
        .bind(payment.refund_count as i32)
        .bind(serde_json::to_value(&payment.metadata).unwrap_or_default())
        .bind(payment.updated_at.as_datetime())
        .bind(payment.processed_at.map(|t| *t.as_datetime()))
        .bind(payment.settled_at.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to update payment: {}", e))
        })?;

        if result.rows_affected() == 0 {
            // Distinguish a lost race from a missing row.
            let exists: Option<(i64,)> =
                sqlx::query_as("SELECT version FROM payments WHERE id = $1")
                    .bind(payment.id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| {
                        DomainError::new(
                            ErrorCode::DatabaseError,
                            format!("Failed to check payment version: {}", e),
                        )
                    })?;

            return match exists {
                Some((found_version,)) => Err(DomainError::conflict(format!(
                    "Payment {} was modified concurrently (expected version {}, found {})",
                    payment.id, payment.version, found_version
                ))),
                None => Err(DomainError::new(
                    ErrorCode::PaymentNotFound,
                    "Payment not found",
                )),
            };
        }

        Ok(())
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> =
            sqlx::query_as(&format!("{} WHERE id = $1", SELECT_COLUMNS))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::new(ErrorCode::DatabaseError, format!("Failed to find payment: {}", e))
                })?;

        row.map(Payment::try_from).transpose()
    }

    async fn find_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> =
            sqlx::query_as(&format!("{} WHERE external_id = $1", SELECT_COLUMNS))
                .bind(external_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::new(ErrorCode::DatabaseError, format!("Failed to find payment: {}", e))
                })?;

        row.map(Payment::try_from).transpose()
    }
}
