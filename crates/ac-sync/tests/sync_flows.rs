//! Protocol-level tests driven through a stubbed [`PeerTransport`], so that
//! consensus, publication, the tamper audit and the registration handshake
//! are exercised without any real network.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use ac_blockchain::{Blockchain, DEFAULT_DIFFICULTY};
use ac_merkle::{MerkleProof, MerkleTree};
use ac_peer::{ChainInfo, Peer, PeerTransport, SubmitError, TransportError};
use ac_sync::{build_chain, fetch_longest_valid, publish_block, sync_with, SyncError};
use ac_transaction::Transaction;
use async_trait::async_trait;

fn peer(n: u16) -> Peer {
    Peer::new(format!("http://h:{n}"), format!("peer-{n}"))
}

fn tx(author: &str, content: &str) -> Transaction {
    Transaction::with_timestamp(author, content, 1.0)
}

/// Mine one block per batch size in `batches`.
fn mined_chain(batches: &[usize]) -> Blockchain {
    let mut chain = Blockchain::new();
    for (b, count) in batches.iter().enumerate() {
        for i in 0..*count {
            chain.add_pending(tx(&format!("author-{b}"), &format!("content-{i}")));
        }
        chain.mine_pending().unwrap();
    }
    chain
}

fn chain_info(chain: &Blockchain, identity: &Peer, nodes: &[Peer]) -> ChainInfo {
    ChainInfo {
        length: chain.len(),
        chain: chain
            .blocks()
            .iter()
            .map(|block| block.canonical().unwrap())
            .collect(),
        nodes: nodes.iter().map(|peer| peer.canonical().unwrap()).collect(),
        node_identifier: identity.canonical().unwrap(),
    }
}

/// In-memory network: a map of address → served chain info, plus canned
/// behaviours for block submission and proof requests.
#[derive(Default)]
struct StubTransport {
    infos: HashMap<String, ChainInfo>,
    /// Chains used to answer proof requests, by witness address.
    proof_chains: HashMap<String, Blockchain>,
    /// Addresses that refuse every block submission with a 500.
    refusing_submit: HashSet<String>,
    /// Addresses that drop the connection on submission.
    dead: HashSet<String>,
    submissions: Mutex<Vec<String>>,
    votes: Mutex<Vec<String>>,
    registrations: Mutex<Vec<String>>,
}

impl StubTransport {
    fn serve(&mut self, address: &str, info: ChainInfo) {
        self.infos.insert(address.to_string(), info);
    }

    fn unreachable(address: &str) -> TransportError {
        TransportError::Network {
            url: address.to_string(),
            reason: "connection refused".to_string(),
        }
    }
}

#[async_trait]
impl PeerTransport for StubTransport {
    async fn fetch_chain(&self, peer: &Peer) -> Result<ChainInfo, TransportError> {
        self.infos
            .get(&peer.address)
            .cloned()
            .ok_or_else(|| Self::unreachable(&peer.address))
    }

    async fn submit_block(&self, peer: &Peer, _block_json: &str) -> Result<(), SubmitError> {
        if self.dead.contains(&peer.address) {
            return Err(SubmitError::Network("connection refused".to_string()));
        }
        if self.refusing_submit.contains(&peer.address) {
            return Err(SubmitError::Status {
                code: 500,
                message: "refused".to_string(),
            });
        }
        self.submissions.lock().unwrap().push(peer.address.clone());
        Ok(())
    }

    async fn request_proof(
        &self,
        peer: &Peer,
        transaction_index: usize,
        merkle_root: &str,
    ) -> Result<MerkleProof, TransportError> {
        let chain = self
            .proof_chains
            .get(&peer.address)
            .ok_or_else(|| Self::unreachable(&peer.address))?;

        let transactions =
            chain
                .transactions_by_merkle_root(merkle_root)
                .ok_or_else(|| TransportError::Status {
                    url: peer.address.clone(),
                    status: 404,
                    body: "no matching block".to_string(),
                })?;

        let tree = MerkleTree::new(transactions).map_err(|e| TransportError::Decode {
            url: peer.address.clone(),
            reason: e.to_string(),
        })?;
        tree.proof(transaction_index)
            .map_err(|e| TransportError::Decode {
                url: peer.address.clone(),
                reason: e.to_string(),
            })
    }

    async fn register(&self, address: &str, _identity: &Peer) -> Result<ChainInfo, TransportError> {
        self.registrations.lock().unwrap().push(address.to_string());
        self.infos
            .get(address.trim_end_matches('/'))
            .cloned()
            .ok_or_else(|| Self::unreachable(address))
    }

    async fn vote(&self, peer: &Peer) -> Result<(), TransportError> {
        self.votes.lock().unwrap().push(peer.address.clone());
        Ok(())
    }
}

// ── Consensus ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn consensus_adopts_the_longest_valid_chain() {
    let four = peer(4);
    let five = peer(5);

    let chain_of_four = mined_chain(&[2, 2, 2]);
    let chain_of_five = mined_chain(&[2, 2, 2, 2]);
    assert_eq!(chain_of_five.len(), 5);

    let mut transport = StubTransport::default();
    transport.serve(&four.address, chain_info(&chain_of_four, &four, &[]));
    transport.serve(&five.address, chain_info(&chain_of_five, &five, &[]));

    let winner = fetch_longest_valid(
        &transport,
        &[four.clone(), five.clone()],
        3,
        DEFAULT_DIFFICULTY,
    )
    .await
    .expect("a longer chain exists");

    assert_eq!(winner.len(), 5);
    assert_eq!(
        winner.last().unwrap().hash,
        chain_of_five.last_block().hash
    );
}

#[tokio::test]
async fn consensus_picks_the_maximum_across_peers() {
    let peers: Vec<Peer> = (1..=3).map(peer).collect();
    let chains = [
        mined_chain(&[2, 2]),
        mined_chain(&[2, 2, 2, 2]),
        mined_chain(&[2, 2, 2]),
    ];

    let mut transport = StubTransport::default();
    for (peer, chain) in peers.iter().zip(&chains) {
        transport.serve(&peer.address, chain_info(chain, peer, &[]));
    }

    let winner = fetch_longest_valid(&transport, &peers, 1, DEFAULT_DIFFICULTY)
        .await
        .expect("several longer chains exist");
    assert_eq!(winner.len(), 5, "the longest valid chain wins");
}

#[tokio::test]
async fn consensus_ignores_equal_length_chains() {
    let remote = peer(1);
    let chain = mined_chain(&[2, 2]);

    let mut transport = StubTransport::default();
    transport.serve(&remote.address, chain_info(&chain, &remote, &[]));

    let winner = fetch_longest_valid(&transport, &[remote], 3, DEFAULT_DIFFICULTY).await;
    assert!(winner.is_none(), "equal-length chain must not be adopted");
}

#[tokio::test]
async fn consensus_ignores_longer_but_invalid_chains() {
    let remote = peer(1);
    let mut chain = mined_chain(&[2, 2, 2, 2]);
    chain
        .tamper_transaction(2, 0, "mallory".into(), "forged".into())
        .unwrap();

    let mut transport = StubTransport::default();
    transport.serve(&remote.address, chain_info(&chain, &remote, &[]));

    let winner = fetch_longest_valid(&transport, &[remote], 1, DEFAULT_DIFFICULTY).await;
    assert!(winner.is_none(), "invalid chain must not be adopted");
}

#[tokio::test]
async fn consensus_skips_unreachable_peers() {
    let dead = peer(1);
    let alive = peer(2);
    let chain = mined_chain(&[2, 2]);

    let mut transport = StubTransport::default();
    transport.serve(&alive.address, chain_info(&chain, &alive, &[]));

    let winner = fetch_longest_valid(&transport, &[dead, alive], 1, DEFAULT_DIFFICULTY)
        .await
        .expect("the reachable peer wins");
    assert_eq!(winner.len(), 3);
}

// ── Publication ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn publish_reports_exactly_the_failing_peers() {
    let good = peer(1);
    let bad = peer(2);

    let mut transport = StubTransport::default();
    transport.refusing_submit.insert(bad.address.clone());

    let chain = mined_chain(&[2]);
    let block_json = chain.last_block().canonical().unwrap();

    let failures = publish_block(&transport, &[good.clone(), bad.clone()], &block_json).await;

    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].node, bad.canonical().unwrap());
    assert_eq!(failures[0].error_code, Some(500));
    assert_eq!(
        transport.submissions.lock().unwrap().as_slice(),
        &[good.address.clone()]
    );
}

#[tokio::test]
async fn publish_reports_network_failures_without_a_status() {
    let dead = peer(1);

    let mut transport = StubTransport::default();
    transport.dead.insert(dead.address.clone());

    let chain = mined_chain(&[2]);
    let block_json = chain.last_block().canonical().unwrap();

    let failures = publish_block(&transport, &[dead], &block_json).await;
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].error_code, None);
}

#[tokio::test]
async fn publish_with_no_failures_returns_empty_report() {
    let good = peer(1);
    let transport = StubTransport::default();

    let chain = mined_chain(&[2]);
    let block_json = chain.last_block().canonical().unwrap();

    assert!(publish_block(&transport, &[good], &block_json).await.is_empty());
}

// ── Chain rebuild and tamper audit ──────────────────────────────────────────

#[tokio::test]
async fn build_chain_accepts_an_honest_dump() {
    let supplier = peer(1);
    let honest = mined_chain(&[2, 4]);
    let info = chain_info(&honest, &supplier, &[]);

    let transport = StubTransport::default();
    let rebuilt = build_chain(&transport, &info, &[], DEFAULT_DIFFICULTY)
        .await
        .unwrap();
    assert_eq!(rebuilt.len(), honest.len());
}

#[tokio::test]
async fn build_chain_identifies_the_tampered_transaction() {
    let supplier = peer(1);
    let witness = peer(2);

    let honest = mined_chain(&[4]);
    let committed_root = honest.blocks()[1].merkle_root.clone().unwrap();

    // The supplier altered one committed transaction after the fact; the
    // Merkle root still commits to the original batch.
    let mut forged = honest.clone();
    forged
        .tamper_transaction(1, 2, "mallory".into(), "forged".into())
        .unwrap();
    let info = chain_info(&forged, &supplier, &[]);

    let mut transport = StubTransport::default();
    transport
        .proof_chains
        .insert(witness.address.clone(), honest);

    // The supplier itself must not be consulted as a witness.
    let local_peers = [supplier.clone(), witness.clone()];

    let err = build_chain(&transport, &info, &local_peers, DEFAULT_DIFFICULTY)
        .await
        .unwrap_err();

    let SyncError::ChainTampered { tampered } = err else {
        panic!("expected a tamper verdict");
    };
    assert_eq!(tampered.len(), 1);
    assert_eq!(tampered[0].index, 2);
    assert_eq!(tampered[0].merkle_root, committed_root);
    assert!(tampered[0].transaction.contains("mallory"));
}

#[tokio::test]
async fn build_chain_without_witnesses_reports_no_transactions() {
    let supplier = peer(1);

    let mut forged = mined_chain(&[2]);
    forged
        .tamper_transaction(1, 0, "mallory".into(), "forged".into())
        .unwrap();
    let info = chain_info(&forged, &supplier, &[]);

    let transport = StubTransport::default();
    let err = build_chain(&transport, &info, &[], DEFAULT_DIFFICULTY)
        .await
        .unwrap_err();

    let SyncError::ChainTampered { tampered } = err else {
        panic!("expected a tamper verdict");
    };
    assert!(tampered.is_empty(), "no witness, no classification");
}

// ── Registration handshake ──────────────────────────────────────────────────

#[tokio::test]
async fn handshake_adopts_chain_and_merges_peers() {
    let me = Peer::new("http://h:10", "me");
    let target = peer(1);
    let third = peer(2);

    let target_chain = mined_chain(&[2, 2]);
    let mut transport = StubTransport::default();
    transport.serve(
        &target.address,
        chain_info(&target_chain, &target, &[me.clone(), third.clone()]),
    );
    transport.serve(
        &third.address,
        chain_info(&Blockchain::new(), &third, &[]),
    );

    let outcome = sync_with(&transport, &target.address, &me, &[], DEFAULT_DIFFICULTY)
        .await
        .unwrap();

    assert_eq!(outcome.chain.len(), 3);
    assert!(outcome.peers.contains(&target));
    assert!(outcome.peers.contains(&third));
    assert!(!outcome.peers.contains(&me), "own identity is filtered out");

    let registrations = transport.registrations.lock().unwrap();
    assert!(registrations.contains(&target.address));
    assert!(
        registrations.contains(&third.address),
        "the new node introduces itself to the target's peers"
    );
}

#[tokio::test]
async fn handshake_votes_on_a_tampered_target() {
    let me = Peer::new("http://h:10", "me");
    let target = peer(1);

    let mut forged = mined_chain(&[2]);
    forged
        .tamper_transaction(1, 0, "mallory".into(), "forged".into())
        .unwrap();

    let mut transport = StubTransport::default();
    transport.serve(&target.address, chain_info(&forged, &target, &[]));

    let err = sync_with(&transport, &target.address, &me, &[], DEFAULT_DIFFICULTY)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::ChainTampered { .. }));
    assert_eq!(
        transport.votes.lock().unwrap().as_slice(),
        &[target.address.clone()]
    );
}

#[tokio::test]
async fn handshake_fails_cleanly_when_target_is_unreachable() {
    let me = Peer::new("http://h:10", "me");
    let transport = StubTransport::default();

    let err = sync_with(&transport, "http://h:99", &me, &[], DEFAULT_DIFFICULTY)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Unreachable(_)));
}
