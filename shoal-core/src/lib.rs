//! Shoal swarm protocol.
//! Host-driven: no I/O; host passes events and receives actions.

pub mod announcement;
pub mod codec;
pub mod config;
pub mod coordinator;
pub mod identity;
pub mod peer;
pub mod protocol;
pub mod request;
pub mod scheduler;
pub mod storage;
pub mod stream;
pub mod wire;

pub use announcement::{Announcement, SegmentStatus};
pub use codec::{EncodingRangeError, FormatError};
pub use config::SwarmConfig;
pub use coordinator::{Action, FailureReason, MessageError, OutboundAction, SwarmCoordinator};
pub use identity::{swarm_id, PeerId};
pub use protocol::PeerMessage;
pub use scheduler::{generate_queue, is_segment_actual, BufferWindows, LoadQueue};
pub use storage::SegmentStorage;
pub use stream::{ByteRange, Playback, Segment, Stream, StreamKind};
pub use wire::{decode_frame, encode_frame, FrameDecodeError, FrameEncodeError};
