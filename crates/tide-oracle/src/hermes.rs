//! HTTP client for the Hermes price service.
//!
//! Two fetch shapes: the latest signed update for a set of feeds, or the
//! update closest to a given publish time. Settlement uses the latter so the
//! price matches the round's start second.

use crate::error::{OracleError, OracleResult};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Default timeout for Hermes requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub const MAINNET_ENDPOINT: &str = "https://hermes.pyth.network";
pub const TESTNET_ENDPOINT: &str = "https://hermes-beta.pyth.network";

/// Hermes endpoint for a network name. Anything that isn't mainnet gets the
/// beta endpoint.
#[must_use]
pub fn endpoint_for_network(network: &str) -> &'static str {
    if network == "mainnet" {
        MAINNET_ENDPOINT
    } else {
        TESTNET_ENDPOINT
    }
}

/// Response envelope for `/v2/updates/price/*`. Only the binary payload is
/// requested (`parsed=false`).
#[derive(Debug, Deserialize)]
struct UpdateResponse {
    binary: BinaryData,
}

#[derive(Debug, Deserialize)]
struct BinaryData {
    data: Vec<String>,
}

/// Client for fetching signed price updates.
#[derive(Clone)]
pub struct HermesClient {
    client: Client,
    base_url: String,
}

impl HermesClient {
    /// Create a new Hermes client for the given base endpoint.
    pub fn new(base_url: impl Into<String>) -> OracleResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| OracleError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Fetch the freshest update for the given feeds.
    pub async fn latest_update(&self, feed_ids: &[String]) -> OracleResult<Vec<Vec<u8>>> {
        let url = format!("{}/v2/updates/price/latest", self.base_url);
        self.fetch(&url, feed_ids).await
    }

    /// Fetch the update closest to `publish_time_sec`.
    pub async fn update_at(
        &self,
        publish_time_sec: u64,
        feed_ids: &[String],
    ) -> OracleResult<Vec<Vec<u8>>> {
        let url = format!("{}/v2/updates/price/{publish_time_sec}", self.base_url);
        self.fetch(&url, feed_ids).await
    }

    async fn fetch(&self, url: &str, feed_ids: &[String]) -> OracleResult<Vec<Vec<u8>>> {
        debug!(url, feeds = feed_ids.len(), "Fetching price update");

        let response = self
            .client
            .get(url)
            .query(&feed_query(feed_ids))
            .send()
            .await
            .map_err(|e| OracleError::HttpClient(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: UpdateResponse = response
            .json()
            .await
            .map_err(|e| OracleError::Payload(format!("Failed to parse update response: {e}")))?;

        if parsed.binary.data.is_empty() {
            return Err(OracleError::EmptyUpdate(feed_ids.join(",")));
        }

        decode_updates(&parsed.binary.data)
    }
}

/// Query pairs for an update request. Hermes expects repeated `ids[]` keys
/// and the binary payload only.
fn feed_query(feed_ids: &[String]) -> Vec<(&'static str, &str)> {
    let mut query: Vec<(&'static str, &str)> = feed_ids
        .iter()
        .map(|id| ("ids[]", id.as_str()))
        .collect();
    query.push(("encoding", "hex"));
    query.push(("parsed", "false"));
    query
}

fn decode_updates(data: &[String]) -> OracleResult<Vec<Vec<u8>>> {
    data.iter()
        .map(|entry| {
            hex::decode(entry.trim_start_matches("0x"))
                .map_err(|e| OracleError::Payload(format!("Invalid hex in update data: {e}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_carries_repeated_ids_and_binary_flags() {
        let feeds = vec!["0xabc".to_string(), "0xdef".to_string()];
        let query = feed_query(&feeds);

        assert_eq!(
            query,
            vec![
                ("ids[]", "0xabc"),
                ("ids[]", "0xdef"),
                ("encoding", "hex"),
                ("parsed", "false"),
            ]
        );
    }

    #[test]
    fn response_envelope_parses_and_decodes() {
        let body = r#"{"binary":{"encoding":"hex","data":["0x01ff","0a0b"]}}"#;
        let parsed: UpdateResponse = serde_json::from_str(body).unwrap();

        let decoded = decode_updates(&parsed.binary.data).unwrap();
        assert_eq!(decoded, vec![vec![0x01, 0xff], vec![0x0a, 0x0b]]);
    }

    #[test]
    fn bad_hex_is_rejected() {
        let err = decode_updates(&["zz".to_string()]).unwrap_err();
        assert!(matches!(err, OracleError::Payload(_)));
    }

    #[test]
    fn network_endpoints() {
        assert_eq!(endpoint_for_network("mainnet"), MAINNET_ENDPOINT);
        assert_eq!(endpoint_for_network("testnet"), TESTNET_ENDPOINT);
        assert_eq!(endpoint_for_network("localnet"), TESTNET_ENDPOINT);
    }
}
