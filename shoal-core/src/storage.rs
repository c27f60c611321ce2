//! Segment storage seam. The host owns the bytes; the coordinator only reads.

use std::sync::Arc;

/// Read access to locally stored segments, keyed by stream and segment local id.
/// Hosts call `SwarmCoordinator::on_storage_changed` after any change.
pub trait SegmentStorage {
    fn has_segment(&self, stream_id: &str, segment_id: &str) -> bool;

    fn segment_bytes(&self, stream_id: &str, segment_id: &str) -> Option<Vec<u8>>;

    /// Local ids of every stored segment of the stream.
    fn stored_segment_ids(&self, stream_id: &str) -> Vec<String>;
}

impl<T: SegmentStorage + ?Sized> SegmentStorage for Arc<T> {
    fn has_segment(&self, stream_id: &str, segment_id: &str) -> bool {
        (**self).has_segment(stream_id, segment_id)
    }

    fn segment_bytes(&self, stream_id: &str, segment_id: &str) -> Option<Vec<u8>> {
        (**self).segment_bytes(stream_id, segment_id)
    }

    fn stored_segment_ids(&self, stream_id: &str) -> Vec<String> {
        (**self).stored_segment_ids(stream_id)
    }
}

impl<T: SegmentStorage + ?Sized> SegmentStorage for &T {
    fn has_segment(&self, stream_id: &str, segment_id: &str) -> bool {
        (**self).has_segment(stream_id, segment_id)
    }

    fn segment_bytes(&self, stream_id: &str, segment_id: &str) -> Option<Vec<u8>> {
        (**self).segment_bytes(stream_id, segment_id)
    }

    fn stored_segment_ids(&self, stream_id: &str) -> Vec<String> {
        (**self).stored_segment_ids(stream_id)
    }
}
