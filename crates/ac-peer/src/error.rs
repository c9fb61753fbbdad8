use thiserror::Error;

#[derive(Debug, Error)]
pub enum PeerError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("peer {address} ({name}) is already registered")]
    Duplicate { address: String, name: String },

    #[error("the node's own name is not set")]
    IdentityUnset,
}

/// Failure of an outbound peer call after all retries.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} failed: {reason}")]
    Network { url: String, reason: String },

    #[error("{url} answered {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("could not decode response from {url}: {reason}")]
    Decode { url: String, reason: String },
}

/// Failure of a single peer's block submission, reported (not raised) by the
/// publisher.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("peer answered {code}: {message}")]
    Status { code: u16, message: String },

    #[error("network error: {0}")]
    Network(String),
}
