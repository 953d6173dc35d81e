//! PostgreSQL implementation of WebhookStore.
//!
//! Idempotent insertion uses the unique index on `event_id` with
//! `ON CONFLICT DO NOTHING`; the scheduler's claim uses
//! `FOR UPDATE SKIP LOCKED` so concurrent sweeps never dispatch the same
//! webhook twice.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    DomainError, ErrorCode, EventId, PaymentId, Timestamp, WebhookId,
};
use crate::domain::payment::PaymentEventType;
use crate::domain::webhook::{WebhookDelivery, WebhookStatus};
use crate::ports::{InsertOutcome, WebhookStore};

/// PostgreSQL implementation of the WebhookStore port.
pub struct PostgresWebhookStore {
    pool: PgPool,
}

impl PostgresWebhookStore {
    /// Creates a new PostgresWebhookStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a webhook delivery record.
#[derive(Debug, sqlx::FromRow)]
struct WebhookRow {
    id: Uuid,
    event_id: String,
    event_type: String,
    payment_id: Option<Uuid>,
    url: String,
    headers: serde_json::Value,
    payload: serde_json::Value,
    status: String,
    retry_count: i32,
    max_retries: i32,
    next_retry_at: Option<DateTime<Utc>>,
    response_status_code: Option<i32>,
    response_body: Option<String>,
    signature_verified: Option<bool>,
    delivered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<WebhookRow> for WebhookDelivery {
    type Error = DomainError;

    fn try_from(row: WebhookRow) -> Result<Self, Self::Error> {
        let event_id = EventId::new(row.event_id).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid event_id: {}", e))
        })?;
        let event_type = PaymentEventType::parse(&row.event_type).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid event_type: {}", e))
        })?;
        let status = parse_status(&row.status)?;
        let headers: HashMap<String, String> =
            serde_json::from_value(row.headers).unwrap_or_default();

        Ok(WebhookDelivery {
            id: WebhookId::from_uuid(row.id),
            event_id,
            event_type,
            payment_id: row.payment_id.map(PaymentId::from_uuid),
            url: row.url,
            headers,
            payload: row.payload,
            status,
            retry_count: row.retry_count.max(0) as u32,
            max_retries: row.max_retries.max(0) as u32,
            next_retry_at: row.next_retry_at.map(Timestamp::from_datetime),
            response_status_code: row.response_status_code.map(|c| c as u16),
            response_body: row.response_body,
            signature_verified: row.signature_verified,
            delivered_at: row.delivered_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn parse_status(s: &str) -> Result<WebhookStatus, DomainError> {
    match s {
        "pending" => Ok(WebhookStatus::Pending),
        "delivered" => Ok(WebhookStatus::Delivered),
        "failed" => Ok(WebhookStatus::Failed),
        "retrying" => Ok(WebhookStatus::Retrying),
        "expired" => Ok(WebhookStatus::Expired),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid status value: {}", s),
        )),
    }
}

fn status_to_string(status: &WebhookStatus) -> &'static str {
    match status {
        WebhookStatus::Pending => "pending",
        WebhookStatus::Delivered => "delivered",
        WebhookStatus::Failed => "failed",
        WebhookStatus::Retrying => "retrying",
        WebhookStatus::Expired => "expired",
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, event_id, event_type, payment_id, url, headers, payload,
           status, retry_count, max_retries, next_retry_at,
           response_status_code, response_body, signature_verified,
           delivered_at, created_at, updated_at
    FROM webhooks
"#;

#[async_trait]
impl WebhookStore for PostgresWebhookStore {
    async fn insert(&self, webhook: &WebhookDelivery) -> Result<InsertOutcome, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO webhooks (
                id, event_id, event_type, payment_id, url, headers, payload,
                status, retry_count, max_retries, next_retry_at,
                response_status_code, response_body, signature_verified,
                delivered_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(webhook.id.as_uuid())
        .bind(webhook.event_id.as_str())
        .bind(webhook.event_type.as_str())
        .bind(webhook.payment_id.map(|id| *id.as_uuid()))
        .bind(&webhook.url)
        .bind(serde_json::to_value(&webhook.headers).unwrap_or_default())
        .bind(&webhook.payload)
        .bind(status_to_string(&webhook.status))
        .bind(webhook.retry_count as i32)
        .bind(webhook.max_retries as i32)
        .bind(webhook.next_retry_at.map(|t| *t.as_datetime()))
        .bind(webhook.response_status_code.map(|c| c as i32))
        .bind(&webhook.response_body)
        .bind(webhook.signature_verified)
        .bind(webhook.delivered_at.map(|t| *t.as_datetime()))
        .bind(webhook.created_at.as_datetime())
        .bind(webhook.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to save webhook: {}", e))
        })?;

        if result.rows_affected() == 0 {
            Ok(InsertOutcome::AlreadyExists)
        } else {
            Ok(InsertOutcome::Inserted)
        }
    }

    async fn update(&self, webhook: &WebhookDelivery) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE webhooks SET
                status = $2,
                retry_count = $3,
                next_retry_at = $4,
                response_status_code = $5,
                response_body = $6,
                signature_verified = $7,
                delivered_at = $8,
                updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(webhook.id.as_uuid())
        .bind(status_to_string(&webhook.status))
        .bind(webhook.retry_count as i32)
        .bind(webhook.next_retry_at.map(|t| *t.as_datetime()))
        .bind(webhook.response_status_code.map(|c| c as i32))
        .bind(&webhook.response_body)
        .bind(webhook.signature_verified)
        .bind(webhook.delivered_at.map(|t| *t.as_datetime()))
        .bind(webhook.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to update webhook: {}", e))
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::WebhookNotFound,
                "Webhook not found",
            ));
        }

        Ok(())
    }

    async fn find_by_id(&self, id: &WebhookId) -> Result<Option<WebhookDelivery>, DomainError> {
        let row: Option<WebhookRow> =
            sqlx::query_as(&format!("{} WHERE id = $1", SELECT_COLUMNS))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::new(ErrorCode::DatabaseError, format!("Failed to find webhook: {}", e))
                })?;

        row.map(WebhookDelivery::try_from).transpose()
    }

    async fn find_by_event_id(
        &self,
        event_id: &EventId,
    ) -> Result<Option<WebhookDelivery>, DomainError> {
        let row: Option<WebhookRow> =
            sqlx::query_as(&format!("{} WHERE event_id = $1", SELECT_COLUMNS))
                .bind(event_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::new(ErrorCode::DatabaseError, format!("Failed to find webhook: {}", e))
                })?;

        row.map(WebhookDelivery::try_from).transpose()
    }

    async fn claim_due(
        &self,
        now: Timestamp,
        limit: u32,
    ) -> Result<Vec<WebhookDelivery>, DomainError> {
        // SKIP LOCKED keeps concurrent sweeps from claiming the same rows;
        // moving claimed rows to 'pending' keeps a slow delivery from being
        // selected again by the next sweep.
        let rows: Vec<WebhookRow> = sqlx::query_as(
            r#"
            UPDATE webhooks SET
                status = 'pending',
                next_retry_at = NULL,
                updated_at = $1
            WHERE id IN (
                SELECT id FROM webhooks
                WHERE status = 'retrying' AND next_retry_at <= $1
                ORDER BY next_retry_at ASC
                LIMIT $2
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, event_id, event_type, payment_id, url, headers,
                      payload, status, retry_count, max_retries,
                      next_retry_at, response_status_code, response_body,
                      signature_verified, delivered_at, created_at, updated_at
            "#,
        )
        .bind(now.as_datetime())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to claim due webhooks: {}", e),
            )
        })?;

        rows.into_iter().map(WebhookDelivery::try_from).collect()
    }
}
