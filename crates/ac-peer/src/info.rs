use serde::{Deserialize, Serialize};

use crate::{error::PeerError, peer::Peer};

/// A node's full self-description, as served by `GET /Nodes/chain` and
/// returned from a registration: chain length, every block and every peer
/// record as canonical JSON strings, plus the node's own identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainInfo {
    pub length: usize,
    pub chain: Vec<String>,
    pub nodes: Vec<String>,
    pub node_identifier: String,
}

impl ChainInfo {
    /// Parse the advertised peer records. Entries that fail to parse are
    /// dropped — a malformed peer entry should not poison the whole set.
    pub fn parse_nodes(&self) -> Vec<Peer> {
        self.nodes
            .iter()
            .filter_map(|raw| serde_json::from_str(raw).ok())
            .collect()
    }

    /// Parse the advertising node's own identifier.
    pub fn identifier(&self) -> Result<Peer, PeerError> {
        Ok(serde_json::from_str(&self.node_identifier)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nodes_and_identifier() {
        let info = ChainInfo {
            length: 1,
            chain: vec![],
            nodes: vec![
                r#"{"address":"http://h:1","name":"a"}"#.to_string(),
                "not json".to_string(),
            ],
            node_identifier: r#"{"address":"http://h:2","name":"b"}"#.to_string(),
        };

        assert_eq!(info.parse_nodes(), vec![Peer::new("http://h:1", "a")]);
        assert_eq!(info.identifier().unwrap(), Peer::new("http://h:2", "b"));
    }
}
