//! Shoal node: runs one swarm per stream on tokio.
//! The host feeds transport events in and reads segments out through `StreamSwarm`.

pub mod config;
pub mod http;
pub mod logging;
pub mod storage;
pub mod swarm;
pub mod transport;

pub use config::NodeConfig;
pub use http::{FetchError, HttpLoader, SegmentFetcher};
pub use storage::{MemoryStorage, SegmentStore};
pub use swarm::StreamSwarm;
pub use transport::TransportEvent;
