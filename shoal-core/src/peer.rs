//! One swarm member as seen from this node.

use crate::announcement::{Announcement, SegmentStatus};
use crate::identity::PeerId;

/// Connection lifecycle. Transitions only move forward; `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PeerState {
    Disconnected,
    Connecting,
    Connected,
    Closed,
}

/// The single request this node has outstanding with a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundDownload {
    pub segment_id: String,
    pub external_id: i64,
    /// Coordinator tick at which the request was sent.
    pub requested_at: u64,
}

#[derive(Debug)]
pub struct Peer {
    id: PeerId,
    state: PeerState,
    announcement: Announcement,
    downloading: Option<OutboundDownload>,
}

impl Peer {
    pub fn new(id: PeerId) -> Self {
        Self {
            id,
            state: PeerState::Disconnected,
            announcement: Announcement::default(),
            downloading: None,
        }
    }

    pub fn id(&self) -> PeerId {
        self.id
    }

    pub fn state(&self) -> PeerState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == PeerState::Connected
    }

    /// Move to `next` if it lies ahead of the current state. Returns whether the state changed.
    pub fn advance(&mut self, next: PeerState) -> bool {
        if next <= self.state {
            return false;
        }
        self.state = next;
        true
    }

    /// Latest announcement wins; nothing is merged.
    pub fn set_announcement(&mut self, announcement: Announcement) {
        self.announcement = announcement;
    }

    pub fn segment_status(&self, external_id: i64) -> Option<SegmentStatus> {
        self.announcement.status(external_id)
    }

    pub fn downloading(&self) -> Option<&OutboundDownload> {
        self.downloading.as_ref()
    }

    pub fn is_idle(&self) -> bool {
        self.downloading.is_none()
    }

    /// Occupy the download slot. Fails if a download is already running.
    pub fn start_download(&mut self, download: OutboundDownload) -> bool {
        if self.downloading.is_some() {
            return false;
        }
        self.downloading = Some(download);
        true
    }

    /// Free the download slot, returning what was in it.
    pub fn finish_download(&mut self) -> Option<OutboundDownload> {
        self.downloading.take()
    }
}
