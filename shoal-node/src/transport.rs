//! Events the host's peer transport feeds into a swarm.

use shoal_core::PeerId;
use tokio::sync::mpsc;

/// Outbound frames for one peer. Dropping the sender closes the connection.
pub type FrameSender = mpsc::UnboundedSender<Vec<u8>>;

#[derive(Debug)]
pub enum TransportEvent {
    /// Tracker announced a candidate.
    Discovered(PeerId),
    Connecting(PeerId),
    Connected { peer: PeerId, sender: FrameSender },
    /// One complete frame (length prefix included) from a peer.
    Message { peer: PeerId, bytes: Vec<u8> },
    Closed(PeerId),
    /// Signaling warning; logged only.
    Warning(String),
    /// Signaling error; logged only.
    Error(String),
}
