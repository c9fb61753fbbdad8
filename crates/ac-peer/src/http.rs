use std::time::Duration;

use ac_merkle::MerkleProof;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::{
    error::{SubmitError, TransportError},
    info::ChainInfo,
    peer::Peer,
    transport::{PeerTransport, PUBLISH_MAX_ATTEMPTS, REQUEST_MAX_ATTEMPTS},
};

/// Per-request timeout for all outbound peer calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The production [`PeerTransport`]: plain HTTP via a shared reqwest client.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

/// Most endpoints wrap their payload in a `{"message": …}` envelope; the
/// Merkle proof arrives JSON-encoded inside it.
#[derive(Deserialize)]
struct MessageEnvelope {
    message: String,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn network_error(url: &str, error: reqwest::Error) -> TransportError {
        TransportError::Network {
            url: url.to_string(),
            reason: error.to_string(),
        }
    }
}

#[async_trait]
impl PeerTransport for HttpTransport {
    async fn fetch_chain(&self, peer: &Peer) -> Result<ChainInfo, TransportError> {
        let url = peer.endpoint("Nodes/chain");
        let response = self
            .client
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| Self::network_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url,
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        response
            .json::<ChainInfo>()
            .await
            .map_err(|e| TransportError::Decode {
                url,
                reason: e.to_string(),
            })
    }

    async fn submit_block(&self, peer: &Peer, block_json: &str) -> Result<(), SubmitError> {
        let url = peer.endpoint("Block/add");
        let mut last = (0u16, String::new());

        for attempt in 1..=PUBLISH_MAX_ATTEMPTS {
            let response = self
                .client
                .post(&url)
                .timeout(REQUEST_TIMEOUT)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(block_json.to_string())
                .send()
                .await
                .map_err(|e| SubmitError::Network(e.to_string()))?;

            let status = response.status();
            if status == StatusCode::CREATED {
                return Ok(());
            }

            debug!(%url, attempt, status = status.as_u16(), "block submission refused");
            last = (
                status.as_u16(),
                response.text().await.unwrap_or_default(),
            );
        }

        Err(SubmitError::Status {
            code: last.0,
            message: last.1,
        })
    }

    async fn request_proof(
        &self,
        peer: &Peer,
        transaction_index: usize,
        merkle_root: &str,
    ) -> Result<MerkleProof, TransportError> {
        let url = peer.endpoint("Transactions/validator");
        let body = serde_json::json!({
            "transaction_index": transaction_index,
            "merkle_root": merkle_root,
        });

        let mut last = (0u16, String::new());

        for _ in 0..REQUEST_MAX_ATTEMPTS {
            let response = self
                .client
                .post(&url)
                .timeout(REQUEST_TIMEOUT)
                .json(&body)
                .send()
                .await
                .map_err(|e| Self::network_error(&url, e))?;

            let status = response.status();
            if status == StatusCode::CREATED {
                let envelope: MessageEnvelope =
                    response
                        .json()
                        .await
                        .map_err(|e| TransportError::Decode {
                            url: url.clone(),
                            reason: e.to_string(),
                        })?;

                return serde_json::from_str(&envelope.message).map_err(|e| {
                    TransportError::Decode {
                        url: url.clone(),
                        reason: e.to_string(),
                    }
                });
            }

            last = (
                status.as_u16(),
                response.text().await.unwrap_or_default(),
            );
        }

        Err(TransportError::Status {
            url,
            status: last.0,
            body: last.1,
        })
    }

    async fn register(&self, address: &str, identity: &Peer) -> Result<ChainInfo, TransportError> {
        let url = format!("{}/Nodes/register_node", address.trim_end_matches('/'));
        let body = serde_json::json!({
            "node_address": identity.address,
            "node_name": identity.name,
        });

        let mut last = (0u16, String::new());

        for _ in 0..REQUEST_MAX_ATTEMPTS {
            let response = self
                .client
                .post(&url)
                .timeout(REQUEST_TIMEOUT)
                .json(&body)
                .send()
                .await
                .map_err(|e| Self::network_error(&url, e))?;

            let status = response.status();
            if status == StatusCode::CREATED {
                return response
                    .json::<ChainInfo>()
                    .await
                    .map_err(|e| TransportError::Decode {
                        url,
                        reason: e.to_string(),
                    });
            }

            last = (
                status.as_u16(),
                response.text().await.unwrap_or_default(),
            );

            // Already registered over there — retrying cannot change that.
            if status == StatusCode::FORBIDDEN {
                break;
            }
        }

        Err(TransportError::Status {
            url,
            status: last.0,
            body: last.1,
        })
    }

    async fn vote(&self, peer: &Peer) -> Result<(), TransportError> {
        let url = peer.endpoint("Nodes/vote");
        let response = self
            .client
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| Self::network_error(&url, e))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(TransportError::Status {
                url,
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }
}
