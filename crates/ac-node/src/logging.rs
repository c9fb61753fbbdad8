//! Logging setup for the node binary.
//!
//! All log output goes to stderr so stdout stays available for structured
//! data piped through the binary. Filtering follows `RUST_LOG` when set,
//! with a sensible default otherwise.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// Call this exactly once, early in `main()`. When `quiet` is set all
/// output is suppressed regardless of `RUST_LOG`.
pub fn init_logging(quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("off")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("ac_node=info,tower_http=warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
