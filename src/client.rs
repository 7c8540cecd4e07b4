use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::errors::ReceivingError;
use crate::models::PartialReceipt;
use crate::wire;

/// The wizard step this client persists. Step 1 edits quantities; step 2 is
/// the check screen.
pub const CHECK_STEP_NUMBER: u8 = 2;

/// HTTP client for the partial-receiving endpoint.
#[derive(Debug, Clone)]
pub struct ReceivingApiClient {
    client: Client,
    base_url: String,
}

impl ReceivingApiClient {
    /// Builds a client with its own connection pool and request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ReceivingError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Builds a client around an existing `reqwest::Client` (useful for
    /// testing and for sharing a pool with the host application).
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn partial_receiving_url(&self, shipment_id: &str) -> String {
        format!("{}/api/partialReceiving/{}", self.base_url, shipment_id)
    }

    /// Persists the check-step values and returns the server's
    /// authoritative copy of the receipt.
    #[instrument(skip(self, payload))]
    pub async fn save_step2(
        &self,
        shipment_id: &str,
        payload: &PartialReceipt,
    ) -> Result<PartialReceipt, ReceivingError> {
        let body = wire::build_save_request(payload)?;
        let request_id = Uuid::new_v4();
        let started = std::time::Instant::now();

        let response = self
            .client
            .post(self.partial_receiving_url(shipment_id))
            .query(&[("stepNumber", CHECK_STEP_NUMBER.to_string())])
            .header("X-Request-Id", request_id.to_string())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = Self::error_message(response).await;
            warn!(%status, %request_id, message, "step 2 save rejected");
            return Err(ReceivingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = response.json().await?;
        let receipt = wire::parse_receipt(&body)?;
        debug!(
            %request_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "step 2 save accepted"
        );
        Ok(receipt)
    }

    async fn error_message(response: reqwest::Response) -> String {
        let status = response.status();
        let fallback = || {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        };
        match response.json::<Value>().await {
            Ok(body) => body
                .get("errorMessage")
                .or_else(|| body.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(fallback),
            Err(_) => fallback(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slashes_are_trimmed_from_the_base_url() {
        let client = ReceivingApiClient::with_client(Client::new(), "http://localhost:8081/");
        assert_eq!(client.base_url(), "http://localhost:8081");
        assert_eq!(
            client.partial_receiving_url("ship-1"),
            "http://localhost:8081/api/partialReceiving/ship-1"
        );
    }
}
