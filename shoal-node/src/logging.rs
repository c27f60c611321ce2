use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. Filter comes from `RUST_LOG`, default `info`.
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();
}
