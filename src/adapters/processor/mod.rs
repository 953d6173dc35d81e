//! Processor adapters.
//!
//! The processor's wire protocol lives outside this repo; only the mock
//! used by tests and local development is provided here.

mod mock;

pub use mock::{MockProcessorClient, RecordedCall};
