//! Stream data model: segments of one rendition in timeline order.

use std::collections::HashMap;
use std::fmt;

/// Rendition kind; part of the external stream id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Video,
    Audio,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Video => f.write_str("video"),
            StreamKind::Audio => f.write_str("audio"),
        }
    }
}

/// Inclusive byte range inside the resource at `Segment::url`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

/// One individually fetchable chunk of media.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Unique within the owning stream.
    pub local_id: String,
    /// Stable id used on the wire.
    pub external_id: i64,
    pub url: String,
    pub byte_range: Option<ByteRange>,
    /// Seconds on the media timeline.
    pub start_time: f64,
    pub end_time: f64,
}

/// Playback snapshot supplied by the player on every scheduling pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Playback {
    pub position: f64,
    pub rate: f64,
}

impl Default for Playback {
    fn default() -> Self {
        Self {
            position: 0.0,
            rate: 1.0,
        }
    }
}

/// Ordered segments of one rendition. Iteration order is timeline order.
#[derive(Debug, Clone)]
pub struct Stream {
    pub local_id: String,
    pub kind: StreamKind,
    pub index: u32,
    segments: Vec<Segment>,
    by_local_id: HashMap<String, usize>,
    by_external_id: HashMap<i64, usize>,
}

impl Stream {
    pub fn new(local_id: impl Into<String>, kind: StreamKind, index: u32) -> Self {
        Self {
            local_id: local_id.into(),
            kind,
            index,
            segments: Vec::new(),
            by_local_id: HashMap::new(),
            by_external_id: HashMap::new(),
        }
    }

    /// Append a segment at the end of the timeline. A segment whose local id is
    /// already present is ignored and `false` is returned.
    pub fn push_segment(&mut self, segment: Segment) -> bool {
        if self.by_local_id.contains_key(&segment.local_id) {
            return false;
        }
        let at = self.segments.len();
        self.by_local_id.insert(segment.local_id.clone(), at);
        self.by_external_id.insert(segment.external_id, at);
        self.segments.push(segment);
        true
    }

    /// Id shared by every peer watching this rendition of `manifest_url`.
    pub fn external_id(&self, manifest_url: &str) -> String {
        format!("{}-{}-{}", manifest_url, self.kind, self.index)
    }

    pub fn get(&self, local_id: &str) -> Option<&Segment> {
        self.by_local_id.get(local_id).map(|&i| &self.segments[i])
    }

    pub fn by_external_id(&self, external_id: i64) -> Option<&Segment> {
        self.by_external_id
            .get(&external_id)
            .map(|&i| &self.segments[i])
    }

    pub fn contains(&self, local_id: &str) -> bool {
        self.by_local_id.contains_key(local_id)
    }

    /// The segment directly after `local_id` on the timeline.
    pub fn segment_after(&self, local_id: &str) -> Option<&Segment> {
        let &i = self.by_local_id.get(local_id)?;
        self.segments.get(i + 1)
    }

    /// `local_id` and everything after it. Empty if the id is unknown.
    pub fn segments_from(&self, local_id: &str) -> &[Segment] {
        match self.by_local_id.get(local_id) {
            Some(&i) => &self.segments[i..],
            None => &[],
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Segments `"s{start}"` of `len` seconds starting at `first` up to and including `last`.
    pub fn uniform_stream(first: u32, last: u32, len: u32) -> Stream {
        let mut stream = Stream::new("video-0", StreamKind::Video, 0);
        let mut start = first;
        while start <= last {
            stream.push_segment(Segment {
                local_id: format!("s{start}"),
                external_id: i64::from(start),
                url: format!("https://cdn.example/seg-{start}.ts"),
                byte_range: None,
                start_time: f64::from(start),
                end_time: f64::from(start + len),
            });
            start += len;
        }
        stream
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::uniform_stream;
    use super::*;

    #[test]
    fn traversal_follows_timeline() {
        let stream = uniform_stream(0, 8, 2);
        assert_eq!(stream.len(), 5);
        assert_eq!(stream.segment_after("s4").unwrap().local_id, "s6");
        assert!(stream.segment_after("s8").is_none());
        let ids: Vec<&str> = stream
            .segments_from("s4")
            .iter()
            .map(|s| s.local_id.as_str())
            .collect();
        assert_eq!(ids, ["s4", "s6", "s8"]);
        assert!(stream.segments_from("missing").is_empty());
    }

    #[test]
    fn duplicate_local_id_ignored() {
        let mut stream = uniform_stream(0, 2, 2);
        let dup = stream.get("s0").unwrap().clone();
        assert!(!stream.push_segment(dup));
        assert_eq!(stream.len(), 2);
    }

    #[test]
    fn lookup_by_external_id() {
        let stream = uniform_stream(0, 10, 2);
        assert_eq!(stream.by_external_id(6).unwrap().local_id, "s6");
        assert!(stream.by_external_id(7).is_none());
    }

    #[test]
    fn external_stream_id() {
        let stream = Stream::new("a1", StreamKind::Audio, 2);
        assert_eq!(
            stream.external_id("https://cdn.example/master.m3u8"),
            "https://cdn.example/master.m3u8-audio-2"
        );
    }
}
