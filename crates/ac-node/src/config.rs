use ac_blockchain::DEFAULT_DIFFICULTY;

/// Resolved runtime configuration for a node process.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Interface to bind on. Loopback by default; operators running a
    /// public node pass `0.0.0.0`.
    pub host: String,

    /// TCP port the HTTP surface listens on.
    pub port: u16,

    /// Leading zero characters required of every mined block hash. Fixed
    /// for the lifetime of the process.
    pub difficulty: usize,

    /// When `true` the binary suppresses log output to stderr.
    pub quiet: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            difficulty: DEFAULT_DIFFICULTY,
            quiet: false,
        }
    }
}

impl NodeConfig {
    /// Create a config for a node on a specific port.
    pub fn on_port(port: u16) -> Self {
        Self {
            port,
            ..Self::default()
        }
    }
}
