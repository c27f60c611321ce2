//! Peer-to-peer message types.

use serde::{Deserialize, Serialize};

/// All wire message types. Encoding is bincode; framing is length-prefix (see wire module).
/// Segment ids are external ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerMessage {
    /// Which segments the sender has stored and which it is fetching over HTTP.
    /// Payload is codec-encoded (see announcement module).
    Announcement { payload: Vec<u8> },
    /// Ask the receiver for one segment's bytes.
    SegmentRequest { id: i64 },
    /// Answer to a request: the segment's bytes.
    SegmentData { id: i64, payload: Vec<u8> },
    /// Answer to a request: the receiver does not have the segment.
    SegmentAbsent { id: i64 },
    /// The requester no longer wants the segment.
    CancelSegmentRequest { id: i64 },
}
