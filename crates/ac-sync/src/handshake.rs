use ac_blockchain::Blockchain;
use ac_peer::{Peer, PeerTransport};
use tracing::{info, warn};

use crate::{builder, error::SyncError};

/// What a completed registration handshake hands back for the node to
/// commit: the rebuilt remote chain and every newly learned peer (the
/// target's peers minus ourselves, plus the target itself).
#[derive(Debug)]
pub struct HandshakeOutcome {
    pub chain: Blockchain,
    pub peers: Vec<Peer>,
}

/// Two-phase registration with the node at `target_address`:
///
/// 1. introduce ourselves (`identity`) and receive the target's chain info;
/// 2. rebuild and re-validate its chain — a tamper verdict casts a vote on
///    the target and aborts;
/// 3. adopt its peer set (minus ourselves) and introduce ourselves to each
///    of those peers so the new node is known network-wide.
///
/// Introductions to third-party peers are best-effort: one unreachable
/// peer does not undo an otherwise valid sync.
pub async fn sync_with(
    transport: &dyn PeerTransport,
    target_address: &str,
    identity: &Peer,
    local_peers: &[Peer],
    difficulty: usize,
) -> Result<HandshakeOutcome, SyncError> {
    let info = transport.register(target_address, identity).await?;
    let target = info
        .identifier()
        .map_err(|e| SyncError::MalformedChain(e.to_string()))?;

    let chain = match builder::build_chain(transport, &info, local_peers, difficulty).await {
        Ok(chain) => chain,
        Err(SyncError::ChainTampered { tampered }) => {
            if let Err(error) = transport.vote(&target).await {
                warn!(target = %target.address, %error, "tamper vote could not be delivered");
            }
            return Err(SyncError::ChainTampered { tampered });
        }
        Err(error) => return Err(error),
    };

    let mut peers: Vec<Peer> = info
        .parse_nodes()
        .into_iter()
        .filter(|peer| peer != identity)
        .collect();

    for peer in &peers {
        if let Err(error) = transport.register(&peer.address, identity).await {
            warn!(peer = %peer.address, %error, "introduction failed, peer kept anyway");
        }
    }

    if target != *identity {
        peers.push(target.clone());
    }

    info!(
        target = %target.address,
        chain_len = chain.len(),
        peers = peers.len(),
        "registration handshake complete"
    );

    Ok(HandshakeOutcome { chain, peers })
}
