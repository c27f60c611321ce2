//! Peer identity and swarm rendezvous keys.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Peer ID: 16 random bytes, stable for the lifetime of one node.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct PeerId([u8; 16]);

impl PeerId {
    /// Fresh random id (UUID v4 bytes).
    pub fn generate() -> Self {
        PeerId(uuid::Uuid::new_v4().into_bytes())
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        PeerId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// Length of a tracker info-hash.
pub const SWARM_ID_LEN: usize = 20;

/// Rendezvous key for the tracker: truncated SHA-256 of the stream's external id.
/// Every peer playing the same rendition of the same manifest derives the same key.
pub fn swarm_id(stream_external_id: &str) -> [u8; SWARM_ID_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(stream_external_id.as_bytes());
    let digest = hasher.finalize();
    let mut id = [0u8; SWARM_ID_LEN];
    id.copy_from_slice(&digest[..SWARM_ID_LEN]);
    id
}
