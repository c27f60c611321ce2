//! In-memory segment store shared between the host and its swarms.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use shoal_core::SegmentStorage;

/// Storage the node can write downloaded segments into.
pub trait SegmentStore: SegmentStorage {
    fn store(&self, stream_id: &str, segment_id: &str, bytes: Bytes);
}

type Key = (String, String);

#[derive(Debug, Default)]
pub struct MemoryStorage {
    segments: Mutex<HashMap<Key, Bytes>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, stream_id: &str, segment_id: &str) -> Option<Bytes> {
        self.lock()
            .get(&(stream_id.to_string(), segment_id.to_string()))
            .cloned()
    }

    /// Evict a segment. Returns whether it was present.
    pub fn remove(&self, stream_id: &str, segment_id: &str) -> bool {
        self.lock()
            .remove(&(stream_id.to_string(), segment_id.to_string()))
            .is_some()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Key, Bytes>> {
        self.segments.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SegmentStorage for MemoryStorage {
    fn has_segment(&self, stream_id: &str, segment_id: &str) -> bool {
        self.lock()
            .contains_key(&(stream_id.to_string(), segment_id.to_string()))
    }

    fn segment_bytes(&self, stream_id: &str, segment_id: &str) -> Option<Vec<u8>> {
        self.get(stream_id, segment_id).map(|b| b.to_vec())
    }

    fn stored_segment_ids(&self, stream_id: &str) -> Vec<String> {
        self.lock()
            .keys()
            .filter(|(stream, _)| stream == stream_id)
            .map(|(_, segment)| segment.clone())
            .collect()
    }
}

impl SegmentStore for MemoryStorage {
    fn store(&self, stream_id: &str, segment_id: &str, bytes: Bytes) {
        self.lock()
            .insert((stream_id.to_string(), segment_id.to_string()), bytes);
    }
}
