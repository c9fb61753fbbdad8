use ac_merkle::MerkleProof;
use async_trait::async_trait;

use crate::{
    error::{SubmitError, TransportError},
    info::ChainInfo,
    peer::Peer,
};

/// Attempts allowed when pushing a freshly mined block to a peer. Generous
/// so that a peer busy with its own mining gets time to free up.
pub const PUBLISH_MAX_ATTEMPTS: usize = 100;

/// Attempts allowed for registration and Merkle-proof requests.
pub const REQUEST_MAX_ATTEMPTS: usize = 3;

/// Everything a node ever asks of a remote peer.
///
/// The engine never talks to the network directly — consensus, publication,
/// the tamper diagnostic and the registration handshake all go through this
/// capability, so tests can swap in a stub and two nodes never share
/// in-process state.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// `GET {peer}/Nodes/chain` — the peer's full self-description.
    async fn fetch_chain(&self, peer: &Peer) -> Result<ChainInfo, TransportError>;

    /// `POST {peer}/Block/add` with a committed block's canonical JSON.
    /// Retried up to [`PUBLISH_MAX_ATTEMPTS`] times; success is HTTP 201.
    async fn submit_block(&self, peer: &Peer, block_json: &str) -> Result<(), SubmitError>;

    /// `POST {peer}/Transactions/validator` — ask for the audit path of the
    /// transaction at `transaction_index` in the block committed by
    /// `merkle_root`. Retried up to [`REQUEST_MAX_ATTEMPTS`] times.
    async fn request_proof(
        &self,
        peer: &Peer,
        transaction_index: usize,
        merkle_root: &str,
    ) -> Result<MerkleProof, TransportError>;

    /// `POST {address}/Nodes/register_node` introducing `identity`. Returns
    /// the remote node's self-description. Retried up to
    /// [`REQUEST_MAX_ATTEMPTS`] times; a 403 (already registered) is
    /// terminal.
    async fn register(&self, address: &str, identity: &Peer) -> Result<ChainInfo, TransportError>;

    /// `GET {peer}/Nodes/vote` — vote the peer's chain untrustworthy.
    async fn vote(&self, peer: &Peer) -> Result<(), TransportError>;
}
