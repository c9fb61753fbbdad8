pub mod error;
pub mod http;
pub mod info;
pub mod peer;
pub mod registry;
pub mod transport;

pub use error::{PeerError, RegistryError, SubmitError, TransportError};
pub use http::HttpTransport;
pub use info::ChainInfo;
pub use peer::Peer;
pub use registry::{PeerRegistry, Trustability};
pub use transport::{PeerTransport, PUBLISH_MAX_ATTEMPTS, REQUEST_MAX_ATTEMPTS};
