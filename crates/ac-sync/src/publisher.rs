use ac_peer::{Peer, PeerTransport, SubmitError};
use futures::future;
use serde::Serialize;

/// One peer's refusal (or unreachability) during block publication.
/// Serialised into the mine response so the operator sees exactly which
/// peers did not take the block.
#[derive(Debug, Clone, Serialize)]
pub struct PublishFailure {
    /// Canonical JSON of the failing peer.
    pub node: String,

    /// Final HTTP status, absent when the peer could not be reached at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<u16>,

    pub error_message: String,
}

/// Push a committed block (canonical JSON) to every peer.
///
/// Submission retries are bounded inside the transport; whatever still
/// fails is reported per-peer rather than raised, because a mined block is
/// committed locally whether or not the network took it.
pub async fn publish_block(
    transport: &dyn PeerTransport,
    peers: &[Peer],
    block_json: &str,
) -> Vec<PublishFailure> {
    let submissions = peers.iter().map(|peer| transport.submit_block(peer, block_json));
    let results = future::join_all(submissions).await;

    peers
        .iter()
        .zip(results)
        .filter_map(|(peer, result)| {
            let node = peer.canonical().unwrap_or_default();
            match result {
                Ok(()) => None,
                Err(SubmitError::Status { code, message }) => Some(PublishFailure {
                    node,
                    error_code: Some(code),
                    error_message: message,
                }),
                Err(SubmitError::Network(reason)) => Some(PublishFailure {
                    node,
                    error_code: None,
                    error_message: reason,
                }),
            }
        })
        .collect()
}
