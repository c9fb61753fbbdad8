use ac_blockchain::{Block, Blockchain};
use ac_peer::{ChainInfo, Peer, PeerTransport};
use tracing::info;

use crate::{error::SyncError, tamper};

/// Parse a wire chain (canonical block JSON strings) into blocks.
pub fn parse_blocks(raw: &[String]) -> Result<Vec<Block>, SyncError> {
    raw.iter()
        .map(|s| serde_json::from_str(s).map_err(|e| SyncError::MalformedChain(e.to_string())))
        .collect()
}

/// Rebuild a remote node's chain block-by-block, re-validating everything.
///
/// When a block is rejected the failure is escalated to a Merkle audit: all
/// local peers except the chain's supplier act as witnesses for the
/// rejected block's transactions, and the resulting tamper report is
/// carried in the returned error.
pub async fn build_chain(
    transport: &dyn PeerTransport,
    info: &ChainInfo,
    local_peers: &[Peer],
    difficulty: usize,
) -> Result<Blockchain, SyncError> {
    let blocks = parse_blocks(&info.chain)?;
    let supplier = info.identifier().ok();

    match Blockchain::rebuild_from(blocks, difficulty) {
        Ok(chain) => Ok(chain),
        Err(rejected) => {
            info!(
                block = rejected.block.index,
                "remote block rejected, starting merkle audit"
            );

            let witnesses: Vec<Peer> = local_peers
                .iter()
                .filter(|peer| {
                    supplier
                        .as_ref()
                        .map(|s| s.address != peer.address)
                        .unwrap_or(true)
                })
                .cloned()
                .collect();

            let tampered = tamper::diagnose_block(transport, &witnesses, &rejected.block).await;
            Err(SyncError::ChainTampered { tampered })
        }
    }
}

#[cfg(test)]
mod tests {
    use ac_blockchain::Block;

    use super::*;

    #[test]
    fn parses_a_wire_chain() {
        let genesis = Block::genesis().canonical().unwrap();
        let blocks = parse_blocks(&[genesis]).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].index, 0);
    }

    #[test]
    fn a_garbage_entry_fails_the_whole_parse() {
        let genesis = Block::genesis().canonical().unwrap();
        let err = parse_blocks(&[genesis, "not a block".to_string()]).unwrap_err();
        assert!(matches!(err, SyncError::MalformedChain(_)));
    }
}
