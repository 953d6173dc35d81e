//! Paygate - Payment Gateway Backend
//!
//! This crate implements the transaction lifecycle engine and
//! event-delivery subsystem of a payment gateway: a payment state machine
//! with refund/void accounting, a circuit breaker shielding the external
//! processor, and a signed, retried webhook delivery pipeline.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
