//! Mock processor client for testing.
//!
//! Provides a configurable mock implementation of `ProcessorClient` for
//! unit and integration tests. Supports:
//! - Scripted outcomes per call
//! - Error injection
//! - Call tracking

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::foundation::Money;
use crate::ports::{
    ChargeRequest, ProcessorCharge, ProcessorClient, ProcessorError, ProcessorOutcome,
};

/// Recorded method call for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub method: String,
    pub transaction_id: Option<String>,
}

/// Internal mutable state.
#[derive(Default)]
struct MockState {
    /// Scripted results, consumed in order; empty queue means approve.
    script: VecDeque<Result<(), ProcessorError>>,

    /// Transaction id counter for charges/authorizations.
    next_transaction: u64,

    /// Track method calls for assertions.
    call_log: Vec<RecordedCall>,
}

/// Mock processor client for testing.
///
/// # Example
///
/// ```ignore
/// let mock = MockProcessorClient::new();
/// mock.push_error(ProcessorError::Transient("timeout".into()));
///
/// // First call fails, subsequent calls approve.
/// let result = mock.refund("txn_1", amount).await;
/// ```
#[derive(Default, Clone)]
pub struct MockProcessorClient {
    inner: Arc<Mutex<MockState>>,
}

impl MockProcessorClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an error for the next call.
    pub fn push_error(&self, error: ProcessorError) {
        self.inner
            .lock()
            .expect("mock lock poisoned")
            .script
            .push_back(Err(error));
    }

    /// Queues an approval for the next call.
    pub fn push_approval(&self) {
        self.inner
            .lock()
            .expect("mock lock poisoned")
            .script
            .push_back(Ok(()));
    }

    /// Queues `count` identical errors.
    pub fn push_errors(&self, error: ProcessorError, count: usize) {
        for _ in 0..count {
            self.push_error(error.clone());
        }
    }

    /// All recorded calls so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.inner.lock().expect("mock lock poisoned").call_log.clone()
    }

    /// Number of calls to a given method.
    pub fn call_count(&self, method: &str) -> usize {
        self.inner
            .lock()
            .expect("mock lock poisoned")
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    fn record_and_take(
        &self,
        method: &str,
        transaction_id: Option<&str>,
    ) -> Result<u64, ProcessorError> {
        let mut state = self.inner.lock().expect("mock lock poisoned");
        state.call_log.push(RecordedCall {
            method: method.to_string(),
            transaction_id: transaction_id.map(|s| s.to_string()),
        });
        match state.script.pop_front() {
            Some(Err(error)) => Err(error),
            Some(Ok(())) | None => {
                state.next_transaction += 1;
                Ok(state.next_transaction)
            }
        }
    }

    fn approved() -> ProcessorOutcome {
        ProcessorOutcome {
            approval_code: "approved".to_string(),
            message: "Approved".to_string(),
        }
    }
}

#[async_trait]
impl ProcessorClient for MockProcessorClient {
    async fn charge(&self, _request: ChargeRequest) -> Result<ProcessorCharge, ProcessorError> {
        let seq = self.record_and_take("charge", None)?;
        Ok(ProcessorCharge {
            transaction_id: format!("txn_{}", seq),
            outcome: Self::approved(),
        })
    }

    async fn authorize(&self, _request: ChargeRequest) -> Result<ProcessorCharge, ProcessorError> {
        let seq = self.record_and_take("authorize", None)?;
        Ok(ProcessorCharge {
            transaction_id: format!("txn_{}", seq),
            outcome: Self::approved(),
        })
    }

    async fn capture(&self, transaction_id: &str) -> Result<ProcessorOutcome, ProcessorError> {
        self.record_and_take("capture", Some(transaction_id))?;
        Ok(Self::approved())
    }

    async fn refund(
        &self,
        transaction_id: &str,
        _amount: Money,
    ) -> Result<ProcessorOutcome, ProcessorError> {
        self.record_and_take("refund", Some(transaction_id))?;
        Ok(Self::approved())
    }

    async fn void(&self, transaction_id: &str) -> Result<ProcessorOutcome, ProcessorError> {
        self.record_and_take("void", Some(transaction_id))?;
        Ok(Self::approved())
    }
}
