use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ac_blockchain::{Block, Blockchain};
use ac_merkle::MerkleTree;
use ac_peer::{ChainInfo, Peer, PeerRegistry, PeerTransport, Trustability};
use ac_sync::{fetch_longest_valid, publish_block, sync_with, PublishFailure};
use ac_transaction::Transaction;
use tracing::info;

use crate::error::NodeError;

/// Everything a node owns: the chain engine plus its view of the network.
#[derive(Debug)]
pub struct NodeState {
    pub chain: Blockchain,
    pub registry: PeerRegistry,
}

/// Result of a mine request: what was mined, whether consensus replaced the
/// chain first, and which peers refused the published block.
#[derive(Debug)]
pub struct MineReport {
    pub block_index: u64,
    pub consensus_applied: bool,
    pub failures: Vec<PublishFailure>,
}

/// Shared handle passed to every request handler.
///
/// All engine state sits behind one mutex; every operation locks at entry
/// and releases before any network I/O. The methods that talk to peers
/// (mine, sync) snapshot what they need under the lock, do their I/O, then
/// re-acquire the lock and re-check before committing — other handlers may
/// have advanced the state in between.
#[derive(Clone)]
pub struct AppState {
    engine: Arc<Mutex<NodeState>>,
    transport: Arc<dyn PeerTransport>,
}

impl AppState {
    pub fn new(difficulty: usize, transport: Arc<dyn PeerTransport>) -> Self {
        Self {
            engine: Arc::new(Mutex::new(NodeState {
                chain: Blockchain::with_difficulty(difficulty),
                registry: PeerRegistry::new(),
            })),
            transport,
        }
    }

    fn lock(&self) -> MutexGuard<'_, NodeState> {
        // A handler that panicked mid-operation can only have left the
        // engine in a state that was valid at some lock boundary.
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Transactions ────────────────────────────────────────────────────

    /// Queue a new transaction, stamped on acceptance.
    pub fn add_transaction(&self, author: String, content: String) {
        self.lock().chain.add_pending(Transaction::new(author, content));
    }

    /// Pending transactions as canonical JSON strings.
    pub fn pending_transactions(&self) -> Vec<String> {
        self.lock()
            .chain
            .pending()
            .iter()
            .filter_map(|tx| tx.canonical().ok())
            .collect()
    }

    /// Build the Merkle proof for the transaction at `transaction_index` in
    /// the block committed by `merkle_root`, serialised for the wire.
    pub fn proof_for(
        &self,
        merkle_root: &str,
        transaction_index: usize,
    ) -> Result<String, NodeError> {
        let state = self.lock();
        let transactions = state
            .chain
            .transactions_by_merkle_root(merkle_root)
            .ok_or(NodeError::NoMatchingBlock)?;

        let tree = MerkleTree::new(transactions)?;
        let proof = tree.proof(transaction_index)?;
        Ok(serde_json::to_string(&proof)?)
    }

    // ── Mining ──────────────────────────────────────────────────────────

    /// Run consensus, mine the pending queue, publish the new block.
    ///
    /// Consensus and publication happen off-lock; the consensus result only
    /// commits if the remote chain is still strictly longer when the lock
    /// is re-acquired.
    pub async fn mine(&self) -> Result<MineReport, NodeError> {
        let (peers, local_len, difficulty) = {
            let state = self.lock();
            (
                state.registry.peers(),
                state.chain.len(),
                state.chain.difficulty(),
            )
        };

        let candidate =
            fetch_longest_valid(self.transport.as_ref(), &peers, local_len, difficulty).await;

        let consensus_applied = match candidate {
            Some(blocks) => {
                let mut state = self.lock();
                if blocks.len() > state.chain.len() {
                    info!(new_len = blocks.len(), "consensus adopted a longer chain");
                    state.chain.replace_chain(blocks);
                    true
                } else {
                    false
                }
            }
            None => false,
        };

        let (block_index, block_json, peers) = {
            let mut state = self.lock();
            let block_index = state.chain.mine_pending()?;
            let block_json = state.chain.last_block().canonical()?;
            (block_index, block_json, state.registry.peers())
        };

        let failures = publish_block(self.transport.as_ref(), &peers, &block_json).await;

        Ok(MineReport {
            block_index,
            consensus_applied,
            failures,
        })
    }

    // ── Blocks ──────────────────────────────────────────────────────────

    /// Accept a block mined elsewhere. The block's own `hash` field is the
    /// proof it is judged by.
    pub fn accept_block(&self, block: Block) -> bool {
        let Some(proof) = block.hash.clone() else {
            return false;
        };
        self.lock().chain.add_block(block, &proof)
    }

    /// Debug facility: overwrite a committed transaction in place.
    pub fn tamper(
        &self,
        block_index: usize,
        transaction_index: usize,
        author: String,
        content: String,
    ) -> Result<(), NodeError> {
        Ok(self
            .lock()
            .chain
            .tamper_transaction(block_index, transaction_index, author, content)?)
    }

    // ── Node identity and peers ─────────────────────────────────────────

    /// Set (or replace) the node's own peer record.
    pub fn set_name(&self, address: String, name: String) {
        self.lock().registry.set_identity(Peer::new(address, name));
    }

    /// The node's full self-description, as served to peers.
    pub fn local_info(&self) -> Result<ChainInfo, NodeError> {
        build_info(&self.lock())
    }

    /// Register a remote peer and return our self-description for it to
    /// sync from.
    pub fn register_peer(&self, address: String, name: String) -> Result<ChainInfo, NodeError> {
        let mut state = self.lock();
        state
            .registry
            .add_peer(Peer::new(address, name))
            .map_err(|_| NodeError::DuplicatePeer)?;
        build_info(&state)
    }

    pub fn record_vote(&self) {
        self.lock().registry.record_vote();
    }

    pub fn trustability(&self) -> Trustability {
        self.lock().registry.trustability()
    }

    // ── Sync handshake ──────────────────────────────────────────────────

    /// Join the network through the node at `target_address`: register
    /// there, adopt its chain (when strictly longer and valid) and merge
    /// its peer set.
    pub async fn sync_node(&self, target_address: &str) -> Result<(), NodeError> {
        let (identity, peers, difficulty) = {
            let state = self.lock();
            let identity = state
                .registry
                .require_identity()
                .map_err(|_| NodeError::NameUnset)?
                .clone();
            (identity, state.registry.peers(), state.chain.difficulty())
        };

        let outcome = sync_with(
            self.transport.as_ref(),
            target_address,
            &identity,
            &peers,
            difficulty,
        )
        .await?;

        let mut state = self.lock();
        if outcome.chain.len() > state.chain.len() {
            state.chain.replace_chain(outcome.chain.into_blocks());
        }
        state.registry.merge_peers(outcome.peers);
        Ok(())
    }
}

fn build_info(state: &NodeState) -> Result<ChainInfo, NodeError> {
    let identity = state
        .registry
        .require_identity()
        .map_err(|_| NodeError::NameUnset)?;

    let chain: Vec<String> = state
        .chain
        .blocks()
        .iter()
        .map(|block| block.canonical())
        .collect::<Result<_, _>>()?;

    let nodes: Vec<String> = state
        .registry
        .peers()
        .iter()
        .map(|peer| peer.canonical())
        .collect::<Result<_, _>>()?;

    Ok(ChainInfo {
        length: chain.len(),
        chain,
        nodes,
        node_identifier: identity.canonical()?,
    })
}

#[cfg(test)]
mod tests {
    use ac_blockchain::DEFAULT_DIFFICULTY;
    use ac_peer::HttpTransport;

    use super::*;

    fn state() -> AppState {
        AppState::new(DEFAULT_DIFFICULTY, Arc::new(HttpTransport::new()))
    }

    #[test]
    fn local_info_requires_a_name() {
        let app = state();
        assert!(matches!(app.local_info(), Err(NodeError::NameUnset)));

        app.set_name("http://127.0.0.1:1".into(), "alice".into());
        let info = app.local_info().unwrap();
        assert_eq!(info.length, 1);
        assert!(info.node_identifier.contains("alice"));
    }

    #[test]
    fn register_peer_rejects_duplicates() {
        let app = state();
        app.set_name("http://127.0.0.1:1".into(), "alice".into());

        app.register_peer("http://127.0.0.1:2".into(), "bob".into())
            .unwrap();
        assert!(matches!(
            app.register_peer("http://127.0.0.1:2".into(), "bob".into()),
            Err(NodeError::DuplicatePeer)
        ));
    }

    #[tokio::test]
    async fn mine_without_pending_reports_empty_queue() {
        let app = state();
        assert!(matches!(
            app.mine().await,
            Err(NodeError::Blockchain(
                ac_blockchain::BlockchainError::EmptyPending
            ))
        ));
    }

    #[tokio::test]
    async fn mine_commits_and_drains_the_queue() {
        let app = state();
        app.add_transaction("a".into(), "x".into());
        app.add_transaction("b".into(), "y".into());

        let report = app.mine().await.unwrap();
        assert_eq!(report.block_index, 1);
        assert!(!report.consensus_applied, "no peers to consult");
        assert!(report.failures.is_empty(), "no peers to publish to");
        assert!(app.pending_transactions().is_empty());
    }

    #[tokio::test]
    async fn proof_round_trips_for_a_mined_block() {
        let app = state();
        app.add_transaction("a".into(), "x".into());
        app.add_transaction("b".into(), "y".into());
        app.mine().await.unwrap();

        let (root, leaf) = {
            let state = app.lock();
            let block = state.chain.last_block();
            (
                block.merkle_root.clone().unwrap(),
                block.transactions[0].hash().unwrap(),
            )
        };

        let raw = app.proof_for(&root, 0).unwrap();
        let proof: ac_merkle::MerkleProof = serde_json::from_str(&raw).unwrap();
        assert!(proof.verify_hex(&leaf, &root));

        assert!(matches!(
            app.proof_for(&"0".repeat(64), 0),
            Err(NodeError::NoMatchingBlock)
        ));
    }
}
