use ac_blockchain::{check_chain_validity, Block};
use ac_peer::{Peer, PeerTransport};
use futures::future;
use tracing::debug;

use crate::builder::parse_blocks;

/// Poll every peer for its chain and return the longest one that is both
/// strictly longer than `local_len` and fully valid, or `None` when no peer
/// beats the local chain.
///
/// Peers that cannot be reached, answer garbage, or advertise an invalid
/// chain are skipped silently — consensus is about finding a better chain,
/// not about policing peers. The running maximum only ever grows, so the
/// result does not depend on iteration order.
pub async fn fetch_longest_valid(
    transport: &dyn PeerTransport,
    peers: &[Peer],
    local_len: usize,
    difficulty: usize,
) -> Option<Vec<Block>> {
    let fetches = peers.iter().map(|peer| transport.fetch_chain(peer));
    let results = future::join_all(fetches).await;

    let mut current_len = local_len;
    let mut longest: Option<Vec<Block>> = None;

    for (peer, result) in peers.iter().zip(results) {
        let info = match result {
            Ok(info) => info,
            Err(error) => {
                debug!(peer = %peer.address, %error, "chain fetch failed, peer skipped");
                continue;
            }
        };

        // The advertised length is only a hint; what counts is the chain we
        // can actually parse and validate.
        let Ok(blocks) = parse_blocks(&info.chain) else {
            debug!(peer = %peer.address, "unparseable chain, peer skipped");
            continue;
        };

        if blocks.len() > current_len && check_chain_validity(&blocks, difficulty) {
            current_len = blocks.len();
            longest = Some(blocks);
        }
    }

    longest
}
