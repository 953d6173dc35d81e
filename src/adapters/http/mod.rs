//! HTTP adapters - outbound webhook delivery transport.

mod reqwest_transport;

pub use reqwest_transport::ReqwestDeliveryTransport;
