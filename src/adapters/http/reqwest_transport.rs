//! HTTP delivery transport backed by reqwest.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::domain::webhook::AttemptOutcome;
use crate::ports::DeliveryTransport;

/// Upper bound on stored response bodies; subscribers sometimes echo
/// entire request payloads back.
const MAX_RESPONSE_BODY_BYTES: usize = 16 * 1024;

/// Webhook delivery transport over HTTP POST.
pub struct ReqwestDeliveryTransport {
    client: reqwest::Client,
}

impl ReqwestDeliveryTransport {
    /// Creates a transport with the given per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error if the client cannot be
    /// constructed.
    pub fn new(request_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self { client })
    }

    fn header_map(headers: &HashMap<String, String>) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (key, value) in headers {
            let name = match HeaderName::from_bytes(key.as_bytes()) {
                Ok(name) => name,
                Err(_) => {
                    tracing::warn!(header = %key, "Skipping invalid outbound header name");
                    continue;
                }
            };
            let value = match HeaderValue::from_str(value) {
                Ok(value) => value,
                Err(_) => {
                    tracing::warn!(header = %key, "Skipping invalid outbound header value");
                    continue;
                }
            };
            map.insert(name, value);
        }
        map
    }
}

#[async_trait]
impl DeliveryTransport for ReqwestDeliveryTransport {
    async fn post(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: &str,
    ) -> AttemptOutcome {
        let response = self
            .client
            .post(url)
            .headers(Self::header_map(headers))
            .body(body.to_string())
            .send()
            .await;

        match response {
            Ok(response) => {
                let status_code = response.status().as_u16();
                let mut body = response.text().await.unwrap_or_default();
                if body.len() > MAX_RESPONSE_BODY_BYTES {
                    let mut end = MAX_RESPONSE_BODY_BYTES;
                    while !body.is_char_boundary(end) {
                        end -= 1;
                    }
                    body.truncate(end);
                }
                AttemptOutcome::Responded { status_code, body }
            }
            Err(err) if err.is_timeout() => AttemptOutcome::TimedOut,
            Err(err) => AttemptOutcome::ConnectionFailed(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_map_drops_invalid_names() {
        let mut headers = HashMap::new();
        headers.insert("X-Webhook-Event".to_string(), "payment.captured".to_string());
        headers.insert("bad header\n".to_string(), "value".to_string());

        let map = ReqwestDeliveryTransport::header_map(&headers);

        assert_eq!(map.len(), 1);
        assert_eq!(map.get("X-Webhook-Event").unwrap(), "payment.captured");
    }

    #[test]
    fn transport_builds_with_timeout() {
        assert!(ReqwestDeliveryTransport::new(Duration::from_secs(10)).is_ok());
    }
}
