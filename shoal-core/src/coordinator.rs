//! Host-driven swarm coordinator: one instance per stream. The host passes transport,
//! storage, HTTP and playback events in and performs the returned actions.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace, warn};

use crate::announcement::{Announcement, SegmentStatus};
use crate::codec::FormatError;
use crate::config::SwarmConfig;
use crate::identity::PeerId;
use crate::peer::{OutboundDownload, Peer, PeerState};
use crate::protocol::PeerMessage;
use crate::request::{PendingRequest, RequestSource, RequestTable};
use crate::scheduler::{self, BufferWindows, LoadQueue};
use crate::storage::SegmentStorage;
use crate::stream::{Playback, Segment, Stream};
use crate::wire::{self, FrameDecodeError};

/// Result of asking the swarm for a segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Send `frame` to `peer`; the answer arrives through `on_message_received`.
    Request { peer: PeerId, frame: Vec<u8> },
    /// A request for this segment is already in flight with `peer`.
    Pending { peer: PeerId },
    /// The segment is already being fetched over HTTP; wait for that fetch.
    HttpPending,
    /// No connected, idle peer has the segment. Fall back to HTTP.
    Fallback,
}

/// Why a peer request ended without data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    Absent,
    Timeout,
    PeerClosed,
    Cancelled,
}

/// Action for host to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundAction {
    SendMessage(PeerId, Vec<u8>),
    /// Start an HTTP fetch; report back with `on_http_finished`.
    FetchHttp(Segment),
    /// Best-effort abort of an HTTP fetch that left the queue.
    AbortHttp(String),
    ClosePeer(PeerId),
    SegmentLoaded {
        segment_id: String,
        peer: PeerId,
        payload: Vec<u8>,
    },
    RequestFailed {
        segment_id: String,
        peer: PeerId,
        reason: FailureReason,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("failed to decode frame: {0}")]
    Decode(#[from] FrameDecodeError),
    #[error("malformed announcement: {0}")]
    Announcement(#[from] FormatError),
    #[error("message from peer {0} which is not connected")]
    NotConnected(PeerId),
}

pub struct SwarmCoordinator<S, R = StdRng> {
    stream: Stream,
    config: SwarmConfig,
    storage: S,
    rng: R,
    peers: HashMap<PeerId, Peer>,
    requests: RequestTable,
    announcement: Announcement,
    queue: LoadQueue,
    tick_count: u64,
}

impl<S: SegmentStorage> SwarmCoordinator<S, StdRng> {
    pub fn new(stream: Stream, config: SwarmConfig, storage: S) -> Self {
        Self::with_rng(stream, config, storage, StdRng::from_entropy())
    }
}

impl<S: SegmentStorage, R: Rng> SwarmCoordinator<S, R> {
    /// Like `new` with an explicit random source for peer selection.
    pub fn with_rng(stream: Stream, config: SwarmConfig, storage: S, rng: R) -> Self {
        let mut coordinator = Self {
            stream,
            config,
            storage,
            rng,
            peers: HashMap::new(),
            requests: RequestTable::new(),
            announcement: Announcement::default(),
            queue: LoadQueue::default(),
            tick_count: 0,
        };
        coordinator.rebuild_announcement();
        coordinator
    }

    pub fn stream(&self) -> &Stream {
        &self.stream
    }

    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    pub fn peer(&self, id: &PeerId) -> Option<&Peer> {
        self.peers.get(id)
    }

    pub fn announcement(&self) -> &Announcement {
        &self.announcement
    }

    pub fn queue(&self) -> &LoadQueue {
        &self.queue
    }

    pub fn requests(&self) -> &RequestTable {
        &self.requests
    }

    pub fn connected_peer_count(&self) -> usize {
        self.peers.values().filter(|p| p.is_connected()).count()
    }

    /// Whether any known peer has the segment stored or is fetching it over HTTP.
    pub fn is_loading_or_loaded_by_someone(&self, segment_id: &str) -> bool {
        let Some(segment) = self.stream.get(segment_id) else {
            return false;
        };
        self.peers
            .values()
            .any(|p| p.segment_status(segment.external_id).is_some())
    }

    /// Tracker reported a candidate; no transport yet.
    pub fn on_peer_discovered(&mut self, peer_id: PeerId) {
        self.peers
            .entry(peer_id)
            .or_insert_with(|| Peer::new(peer_id));
    }

    pub fn on_peer_connecting(&mut self, peer_id: PeerId) {
        let peer = self
            .peers
            .entry(peer_id)
            .or_insert_with(|| Peer::new(peer_id));
        peer.advance(PeerState::Connecting);
    }

    /// Transport is open. The peer immediately gets our current announcement.
    pub fn on_peer_connected(&mut self, peer_id: PeerId) -> Vec<OutboundAction> {
        let peer = self
            .peers
            .entry(peer_id)
            .or_insert_with(|| Peer::new(peer_id));
        if !peer.advance(PeerState::Connected) {
            return vec![];
        }
        debug!(peer = %peer_id, "peer connected");
        self.announcement_frame()
            .map(|frame| vec![OutboundAction::SendMessage(peer_id, frame)])
            .unwrap_or_default()
    }

    /// Transport closed or errored, or the tracker dropped the peer. Idempotent.
    pub fn on_peer_closed(&mut self, peer_id: PeerId) -> Vec<OutboundAction> {
        let Some(mut peer) = self.peers.remove(&peer_id) else {
            return vec![];
        };
        peer.advance(PeerState::Closed);
        debug!(peer = %peer_id, "peer closed");
        let mut actions = Vec::new();
        if let Some(download) = peer.finish_download() {
            self.requests
                .remove(&download.segment_id, RequestSource::Peer);
            actions.push(OutboundAction::RequestFailed {
                segment_id: download.segment_id,
                peer: peer_id,
                reason: FailureReason::PeerClosed,
            });
        }
        actions
    }

    /// Process one framed message from a connected peer. Malformed input is returned
    /// as an error for the host to log; coordinator state is left untouched.
    pub fn on_message_received(
        &mut self,
        peer_id: PeerId,
        bytes: &[u8],
    ) -> Result<Vec<OutboundAction>, MessageError> {
        if !self.peers.get(&peer_id).is_some_and(Peer::is_connected) {
            return Err(MessageError::NotConnected(peer_id));
        }
        let (msg, _consumed) = wire::decode_frame(bytes)?;

        let mut actions = Vec::new();
        match msg {
            PeerMessage::Announcement { payload } => {
                let announcement = Announcement::decode(&payload)?;
                trace!(
                    peer = %peer_id,
                    loaded = announcement.loaded.len(),
                    http_loading = announcement.http_loading.len(),
                    "announcement received"
                );
                if let Some(peer) = self.peers.get_mut(&peer_id) {
                    peer.set_announcement(announcement);
                }
            }
            PeerMessage::SegmentRequest { id } => {
                let response = self
                    .stream
                    .by_external_id(id)
                    .and_then(|s| self.storage.segment_bytes(&self.stream.local_id, &s.local_id))
                    .map(|payload| PeerMessage::SegmentData { id, payload })
                    .unwrap_or(PeerMessage::SegmentAbsent { id });
                trace!(
                    peer = %peer_id,
                    segment = id,
                    found = matches!(response, PeerMessage::SegmentData { .. }),
                    "segment requested"
                );
                let frame = wire::encode_frame(&response).or_else(|e| {
                    warn!(peer = %peer_id, segment = id, "cannot encode response, sending absent: {e}");
                    wire::encode_frame(&PeerMessage::SegmentAbsent { id })
                });
                match frame {
                    Ok(frame) => actions.push(OutboundAction::SendMessage(peer_id, frame)),
                    Err(e) => warn!(peer = %peer_id, segment = id, "cannot encode absent: {e}"),
                }
            }
            PeerMessage::SegmentData { id, payload } => {
                if let Some(download) = self.take_download(peer_id, id) {
                    actions.push(OutboundAction::SegmentLoaded {
                        segment_id: download.segment_id,
                        peer: peer_id,
                        payload,
                    });
                }
            }
            PeerMessage::SegmentAbsent { id } => {
                if let Some(download) = self.take_download(peer_id, id) {
                    actions.push(OutboundAction::RequestFailed {
                        segment_id: download.segment_id,
                        peer: peer_id,
                        reason: FailureReason::Absent,
                    });
                }
            }
            PeerMessage::CancelSegmentRequest { id } => {
                // Responses are produced synchronously, nothing is left to abort.
                trace!(peer = %peer_id, segment = id, "peer cancelled request");
            }
        }
        Ok(actions)
    }

    /// Release the peer's slot if its outstanding download is `external_id`.
    fn take_download(&mut self, peer_id: PeerId, external_id: i64) -> Option<OutboundDownload> {
        let peer = self.peers.get_mut(&peer_id)?;
        match peer.downloading() {
            Some(d) if d.external_id == external_id => {}
            _ => {
                warn!(peer = %peer_id, segment = external_id, "unsolicited segment response dropped");
                return None;
            }
        }
        let download = peer.finish_download()?;
        self.requests
            .remove(&download.segment_id, RequestSource::Peer);
        Some(download)
    }

    /// Ask a random connected, idle peer that has the segment. A segment already
    /// pending from any source is never requested again.
    pub fn download_segment(&mut self, segment_id: &str) -> Action {
        if let Some(pending) = self.requests.get(segment_id, RequestSource::Peer) {
            if let Some(peer) = pending.peer {
                return Action::Pending { peer };
            }
        }
        if self.requests.is_pending(segment_id) {
            return Action::HttpPending;
        }
        let Some(segment) = self.stream.get(segment_id) else {
            return Action::Fallback;
        };
        let external_id = segment.external_id;

        let mut candidates: Vec<PeerId> = self
            .peers
            .values()
            .filter(|p| {
                p.is_connected()
                    && p.is_idle()
                    && p.segment_status(external_id) == Some(SegmentStatus::Loaded)
            })
            .map(Peer::id)
            .collect();
        candidates.sort();
        let Some(&peer_id) = candidates.choose(&mut self.rng) else {
            return Action::Fallback;
        };

        let frame = match wire::encode_frame(&PeerMessage::SegmentRequest { id: external_id }) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(segment = external_id, "cannot encode request: {e}");
                return Action::Fallback;
            }
        };
        let download = OutboundDownload {
            segment_id: segment_id.to_string(),
            external_id,
            requested_at: self.tick_count,
        };
        if let Some(peer) = self.peers.get_mut(&peer_id) {
            peer.start_download(download);
        }
        self.requests.insert(PendingRequest {
            segment_id: segment_id.to_string(),
            external_id,
            peer: Some(peer_id),
            started_at: self.tick_count,
        });
        debug!(peer = %peer_id, segment = external_id, "p2p request");
        Action::Request {
            peer: peer_id,
            frame,
        }
    }

    /// Local storage changed: rebuild and broadcast our announcement.
    pub fn on_storage_changed(&mut self) -> Vec<OutboundAction> {
        self.rebuild_announcement();
        self.broadcast_announcement()
    }

    /// The host started an HTTP fetch on its own (e.g. for the player).
    /// Returns nothing if the segment is unknown or already fetched over HTTP.
    pub fn on_http_started(&mut self, segment_id: &str) -> Vec<OutboundAction> {
        if self.begin_http(segment_id).is_none() {
            return vec![];
        }
        self.on_storage_changed()
    }

    /// An HTTP fetch ended, successfully or not. Call after storing any bytes.
    pub fn on_http_finished(&mut self, segment_id: &str) -> Vec<OutboundAction> {
        if self
            .requests
            .remove(segment_id, RequestSource::Http)
            .is_none()
        {
            return vec![];
        }
        self.on_storage_changed()
    }

    fn begin_http(&mut self, segment_id: &str) -> Option<Segment> {
        let segment = self.stream.get(segment_id)?.clone();
        let inserted = self.requests.insert(PendingRequest {
            segment_id: segment.local_id.clone(),
            external_id: segment.external_id,
            peer: None,
            started_at: self.tick_count,
        });
        inserted.then_some(segment)
    }

    /// Recompute the queue from playback state and cancel requests for segments that left it.
    pub fn update_queue(&mut self, playback: Playback, last_requested: &str) -> Vec<OutboundAction> {
        let windows = BufferWindows::new(playback, &self.config);
        let stream_id = &self.stream.local_id;
        let storage = &self.storage;
        self.queue = scheduler::generate_queue(&self.stream, last_requested, &windows, |s| {
            storage.has_segment(stream_id, &s.local_id)
        });

        let queue = &self.queue;
        let dropped = self.requests.retain_segments(|id| queue.contains(id));
        self.cancel(dropped)
    }

    /// Drop any pending request for the segment, whatever its source.
    pub fn cancel_request(&mut self, segment_id: &str) -> Vec<OutboundAction> {
        let dropped = self.requests.retain_segments(|id| id != segment_id);
        self.cancel(dropped)
    }

    fn cancel(&mut self, dropped: Vec<PendingRequest>) -> Vec<OutboundAction> {
        let mut actions = Vec::new();
        let mut http_changed = false;
        for request in dropped {
            match request.peer {
                Some(peer_id) => {
                    debug!(peer = %peer_id, segment = request.external_id, "p2p request cancelled");
                    if let Some(peer) = self.peers.get_mut(&peer_id) {
                        peer.finish_download();
                    }
                    let cancel = PeerMessage::CancelSegmentRequest {
                        id: request.external_id,
                    };
                    if let Ok(frame) = wire::encode_frame(&cancel) {
                        actions.push(OutboundAction::SendMessage(peer_id, frame));
                    }
                    actions.push(OutboundAction::RequestFailed {
                        segment_id: request.segment_id,
                        peer: peer_id,
                        reason: FailureReason::Cancelled,
                    });
                }
                None => {
                    debug!(segment = request.external_id, "http request cancelled");
                    http_changed = true;
                    actions.push(OutboundAction::AbortHttp(request.segment_id));
                }
            }
        }
        if http_changed {
            actions.extend(self.on_storage_changed());
        }
        actions
    }

    /// Start fetches for queued segments that are neither stored nor pending.
    ///
    /// High-demand segments go over HTTP. Others go to a peer when one has them; failing
    /// that, HTTP-eligible segments nobody in the swarm holds are fetched over HTTP.
    /// Both paths respect the configured concurrency limits.
    pub fn process_queue(&mut self) -> Vec<OutboundAction> {
        let items: Vec<_> = self
            .queue
            .items
            .iter()
            .map(|i| (i.segment.local_id.clone(), i.statuses))
            .collect();
        let mut actions = Vec::new();
        let mut http_started = false;

        for (segment_id, statuses) in items {
            if self.requests.is_pending(&segment_id)
                || self.storage.has_segment(&self.stream.local_id, &segment_id)
            {
                continue;
            }
            let http_free =
                self.requests.count(RequestSource::Http) < self.config.simultaneous_http_downloads;

            if statuses.is_high_demand && http_free {
                if let Some(segment) = self.begin_http(&segment_id) {
                    http_started = true;
                    actions.push(OutboundAction::FetchHttp(segment));
                }
                continue;
            }

            if statuses.is_p2p_downloadable
                && self.requests.count(RequestSource::Peer) < self.config.simultaneous_p2p_downloads
            {
                if let Action::Request { peer, frame } = self.download_segment(&segment_id) {
                    actions.push(OutboundAction::SendMessage(peer, frame));
                    continue;
                }
            }

            if statuses.is_http_downloadable
                && http_free
                && !self.is_loading_or_loaded_by_someone(&segment_id)
            {
                if let Some(segment) = self.begin_http(&segment_id) {
                    http_started = true;
                    actions.push(OutboundAction::FetchHttp(segment));
                }
            }
        }

        if http_started {
            actions.extend(self.on_storage_changed());
        }
        actions
    }

    /// Periodic tick: fail peer requests that exceeded the timeout.
    pub fn tick(&mut self) -> Vec<OutboundAction> {
        self.tick_count = self.tick_count.saturating_add(1);
        let late = self
            .requests
            .timed_out_peer_requests(self.tick_count, self.config.p2p_request_timeout_ticks);
        let mut actions = Vec::new();
        for request in late {
            let Some(peer_id) = request.peer else {
                continue;
            };
            self.requests
                .remove(&request.segment_id, RequestSource::Peer);
            if let Some(peer) = self.peers.get_mut(&peer_id) {
                peer.finish_download();
            }
            warn!(peer = %peer_id, segment = request.external_id, "p2p request timed out");
            if let Ok(frame) = wire::encode_frame(&PeerMessage::CancelSegmentRequest {
                id: request.external_id,
            }) {
                actions.push(OutboundAction::SendMessage(peer_id, frame));
            }
            actions.push(OutboundAction::RequestFailed {
                segment_id: request.segment_id,
                peer: peer_id,
                reason: FailureReason::Timeout,
            });
        }
        actions
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Close every peer, abort HTTP fetches and clear all state. Never fails.
    pub fn destroy(&mut self) -> Vec<OutboundAction> {
        let mut actions = Vec::new();
        for request in self.requests.drain() {
            if request.peer.is_none() {
                actions.push(OutboundAction::AbortHttp(request.segment_id));
            }
        }
        for (peer_id, mut peer) in self.peers.drain() {
            peer.finish_download();
            peer.advance(PeerState::Closed);
            actions.push(OutboundAction::ClosePeer(peer_id));
        }
        self.queue = LoadQueue::default();
        debug!(stream = %self.stream.local_id, "swarm destroyed");
        actions
    }

    fn rebuild_announcement(&mut self) {
        let loaded: Vec<i64> = self
            .storage
            .stored_segment_ids(&self.stream.local_id)
            .iter()
            .filter_map(|id| self.stream.get(id))
            .map(|s| s.external_id)
            .collect();
        self.announcement = Announcement::new(loaded, self.requests.http_external_ids());
    }

    fn announcement_frame(&self) -> Option<Vec<u8>> {
        let payload = match self.announcement.encode() {
            Ok(p) => p,
            Err(e) => {
                warn!("cannot encode announcement: {e}");
                return None;
            }
        };
        wire::encode_frame(&PeerMessage::Announcement { payload })
            .map_err(|e| warn!("cannot frame announcement: {e}"))
            .ok()
    }

    fn broadcast_announcement(&self) -> Vec<OutboundAction> {
        let Some(frame) = self.announcement_frame() else {
            return vec![];
        };
        self.peers
            .values()
            .filter(|p| p.is_connected())
            .map(|p| OutboundAction::SendMessage(p.id(), frame.clone()))
            .collect()
    }
}
