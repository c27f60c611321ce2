//! Pending-request table: at most one in-flight fetch per segment per source.

use std::collections::HashMap;

use crate::identity::PeerId;

/// Where a pending fetch is being served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestSource {
    Peer,
    Http,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub segment_id: String,
    pub external_id: i64,
    /// Serving peer; `None` for HTTP.
    pub peer: Option<PeerId>,
    /// Coordinator tick at which the request started.
    pub started_at: u64,
}

impl PendingRequest {
    pub fn source(&self) -> RequestSource {
        if self.peer.is_some() {
            RequestSource::Peer
        } else {
            RequestSource::Http
        }
    }
}

#[derive(Debug, Default)]
pub struct RequestTable {
    entries: HashMap<(String, RequestSource), PendingRequest>,
}

impl RequestTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request. Returns false, leaving the table untouched, if the segment
    /// already has one pending from the same source.
    pub fn insert(&mut self, request: PendingRequest) -> bool {
        let key = (request.segment_id.clone(), request.source());
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, request);
        true
    }

    pub fn remove(&mut self, segment_id: &str, source: RequestSource) -> Option<PendingRequest> {
        self.entries.remove(&(segment_id.to_string(), source))
    }

    pub fn get(&self, segment_id: &str, source: RequestSource) -> Option<&PendingRequest> {
        self.entries.get(&(segment_id.to_string(), source))
    }

    /// Any source.
    pub fn is_pending(&self, segment_id: &str) -> bool {
        self.get(segment_id, RequestSource::Peer).is_some()
            || self.get(segment_id, RequestSource::Http).is_some()
    }

    pub fn count(&self, source: RequestSource) -> usize {
        self.entries.keys().filter(|(_, s)| *s == source).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// External ids of segments currently fetched over HTTP.
    pub fn http_external_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.entries
            .values()
            .filter(|r| r.peer.is_none())
            .map(|r| r.external_id)
    }

    /// Drop every request whose segment fails `keep`; returns the dropped records.
    pub fn retain_segments(&mut self, mut keep: impl FnMut(&str) -> bool) -> Vec<PendingRequest> {
        let stale: Vec<(String, RequestSource)> = self
            .entries
            .keys()
            .filter(|(id, _)| !keep(id.as_str()))
            .cloned()
            .collect();
        stale
            .into_iter()
            .filter_map(|key| self.entries.remove(&key))
            .collect()
    }

    /// Peer requests started more than `timeout` ticks before `now`.
    pub fn timed_out_peer_requests(&self, now: u64, timeout: u64) -> Vec<PendingRequest> {
        self.entries
            .values()
            .filter(|r| r.peer.is_some() && now.saturating_sub(r.started_at) > timeout)
            .cloned()
            .collect()
    }

    pub fn drain(&mut self) -> Vec<PendingRequest> {
        self.entries.drain().map(|(_, r)| r).collect()
    }
}
