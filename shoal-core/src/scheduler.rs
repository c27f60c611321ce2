//! Buffer scheduler: which upcoming segments to fetch, and over which path.

use std::collections::HashSet;

use crate::config::SwarmConfig;
use crate::stream::{Playback, Segment, Stream};

/// Half-open time range `[from, to)` in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub from: f64,
    pub to: f64,
}

impl TimeRange {
    pub fn contains(&self, t: f64) -> bool {
        t >= self.from && t < self.to
    }
}

/// The three lookahead windows for one scheduling pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferWindows {
    pub high_demand: TimeRange,
    pub http: TimeRange,
    pub p2p: TimeRange,
}

impl BufferWindows {
    pub fn new(playback: Playback, config: &SwarmConfig) -> Self {
        let range = |window: f64| TimeRange {
            from: playback.position,
            to: playback.position + playback.rate * window,
        };
        Self {
            high_demand: range(config.high_demand_time_window),
            http: range(config.http_download_time_window),
            p2p: range(config.p2p_download_time_window),
        }
    }

    pub fn statuses(&self, segment: &Segment) -> QueueItemStatuses {
        let hit = |r: &TimeRange| r.contains(segment.start_time) || r.contains(segment.end_time);
        QueueItemStatuses {
            is_high_demand: hit(&self.high_demand),
            is_http_downloadable: hit(&self.http),
            is_p2p_downloadable: hit(&self.p2p),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueItemStatuses {
    pub is_high_demand: bool,
    pub is_http_downloadable: bool,
    pub is_p2p_downloadable: bool,
}

impl QueueItemStatuses {
    /// True when the segment falls in none of the windows.
    pub fn is_idle(&self) -> bool {
        !self.is_high_demand && !self.is_http_downloadable && !self.is_p2p_downloadable
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueueItem {
    pub segment: Segment,
    pub statuses: QueueItemStatuses,
}

/// Output of one pass. Replaces the previous queue entirely.
#[derive(Debug, Clone, Default)]
pub struct LoadQueue {
    pub items: Vec<QueueItem>,
    pub segment_ids: HashSet<String>,
}

impl LoadQueue {
    pub fn contains(&self, local_id: &str) -> bool {
        self.segment_ids.contains(local_id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Walk `stream` forward from `last_requested` and collect segments that fall in a window.
///
/// The walk stops at the first segment outside every window, except for the first
/// non-skipped segment when the one after `last_requested` is high-demand: that boundary
/// segment is kept and promoted to high-demand so the queue never stalls on a window edge.
/// Segments for which `is_available` returns true are skipped without ending the walk.
pub fn generate_queue(
    stream: &Stream,
    last_requested: &str,
    windows: &BufferWindows,
    mut is_available: impl FnMut(&Segment) -> bool,
) -> LoadQueue {
    let next_is_high_demand = stream
        .segment_after(last_requested)
        .map(|s| windows.statuses(s).is_high_demand)
        .unwrap_or(false);

    let mut queue = LoadQueue::default();
    let mut first = true;
    for segment in stream.segments_from(last_requested) {
        let mut statuses = windows.statuses(segment);
        if statuses.is_idle() {
            if !(first && next_is_high_demand) {
                break;
            }
            statuses.is_high_demand = true;
        }
        if is_available(segment) {
            continue;
        }
        first = false;
        queue.segment_ids.insert(segment.local_id.clone());
        queue.items.push(QueueItem {
            segment: segment.clone(),
            statuses,
        });
    }
    queue
}

/// Whether a segment still overlaps the lookahead: a boundary strictly after the
/// high-demand start and before the end of any window.
pub fn is_segment_actual(segment: &Segment, windows: &BufferWindows) -> bool {
    let in_range = |t: f64| {
        t > windows.high_demand.from
            && (t < windows.high_demand.to || t < windows.http.to || t < windows.p2p.to)
    };
    in_range(segment.start_time) || in_range(segment.end_time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::test_support::uniform_stream;

    fn config(high: f64, http: f64, p2p: f64) -> SwarmConfig {
        SwarmConfig {
            high_demand_time_window: high,
            http_download_time_window: http,
            p2p_download_time_window: p2p,
            ..SwarmConfig::default()
        }
    }

    fn ids(queue: &LoadQueue) -> Vec<&str> {
        queue
            .items
            .iter()
            .map(|i| i.segment.local_id.as_str())
            .collect()
    }

    #[test]
    fn windows_scale_with_rate() {
        let w = BufferWindows::new(
            Playback {
                position: 10.0,
                rate: 2.0,
            },
            &config(2.0, 10.0, 30.0),
        );
        assert_eq!(w.high_demand, TimeRange { from: 10.0, to: 14.0 });
        assert_eq!(w.http, TimeRange { from: 10.0, to: 30.0 });
        assert_eq!(w.p2p, TimeRange { from: 10.0, to: 70.0 });
    }

    #[test]
    fn queue_stops_past_p2p_window() {
        let stream = uniform_stream(8, 40, 2);
        let w = BufferWindows::new(
            Playback {
                position: 10.0,
                rate: 1.0,
            },
            &config(2.0, 10.0, 30.0),
        );
        let queue = generate_queue(&stream, "s10", &w, |_| false);
        let expected: Vec<String> = (10..40).step_by(2).map(|t| format!("s{t}")).collect();
        assert_eq!(ids(&queue), expected);
        assert_eq!(queue.segment_ids.len(), 15);
        assert!(!queue.contains("s40"));

        let first = &queue.items[0].statuses;
        assert!(first.is_high_demand && first.is_http_downloadable && first.is_p2p_downloadable);
        let s20 = queue.items.iter().find(|i| i.segment.local_id == "s20").unwrap();
        assert!(!s20.statuses.is_high_demand);
        assert!(!s20.statuses.is_http_downloadable);
        assert!(s20.statuses.is_p2p_downloadable);
    }

    #[test]
    fn segment_ending_at_position_is_included() {
        let stream = uniform_stream(8, 40, 2);
        let w = BufferWindows::new(
            Playback {
                position: 10.0,
                rate: 1.0,
            },
            &config(2.0, 10.0, 30.0),
        );
        let queue = generate_queue(&stream, "s8", &w, |_| false);
        assert_eq!(queue.items[0].segment.local_id, "s8");
        assert_eq!(queue.len(), 16);
    }

    #[test]
    fn available_segments_are_skipped_not_terminal() {
        let stream = uniform_stream(0, 20, 2);
        let w = BufferWindows::new(Playback::default(), &config(2.0, 6.0, 8.0));
        let queue = generate_queue(&stream, "s0", &w, |s| s.local_id == "s2");
        assert_eq!(ids(&queue), ["s0", "s4", "s6"]);
        assert!(!queue.contains("s2"));
    }

    #[test]
    fn boundary_segment_promoted_when_next_is_high_demand() {
        // Requested segment [4,6) sits entirely before the playhead at 6.5.
        let stream = uniform_stream(0, 20, 2);
        let w = BufferWindows::new(
            Playback {
                position: 6.5,
                rate: 1.0,
            },
            &config(3.0, 3.0, 3.0),
        );
        let queue = generate_queue(&stream, "s4", &w, |_| false);
        assert_eq!(ids(&queue), ["s4", "s6", "s8"]);
        assert!(queue.items[0].statuses.is_high_demand);
        assert!(!queue.items[0].statuses.is_http_downloadable);
    }

    #[test]
    fn idle_requested_segment_without_high_demand_successor_yields_nothing() {
        let stream = uniform_stream(0, 20, 2);
        let w = BufferWindows::new(
            Playback {
                position: 15.0,
                rate: 1.0,
            },
            &config(2.0, 4.0, 4.0),
        );
        let queue = generate_queue(&stream, "s0", &w, |_| false);
        assert!(queue.is_empty());
    }

    #[test]
    fn exception_applies_to_first_non_skipped_segment() {
        let stream = uniform_stream(0, 20, 2);
        let w = BufferWindows::new(
            Playback {
                position: 6.5,
                rate: 1.0,
            },
            &config(3.0, 3.0, 3.0),
        );
        // Boundary segment already stored: skipped, walk continues normally.
        let queue = generate_queue(&stream, "s4", &w, |s| s.local_id == "s4");
        assert_eq!(ids(&queue), ["s6", "s8"]);
    }

    #[test]
    fn unknown_requested_segment_yields_empty_queue() {
        let stream = uniform_stream(0, 20, 2);
        let w = BufferWindows::new(Playback::default(), &SwarmConfig::default());
        assert!(generate_queue(&stream, "nope", &w, |_| false).is_empty());
    }

    #[test]
    fn queue_is_idempotent() {
        let stream = uniform_stream(0, 100, 4);
        let w = BufferWindows::new(Playback::default(), &SwarmConfig::default());
        let a = generate_queue(&stream, "s0", &w, |_| false);
        let b = generate_queue(&stream, "s0", &w, |_| false);
        assert_eq!(a.items, b.items);
        assert_eq!(a.segment_ids, b.segment_ids);
    }

    #[test]
    fn actual_segment_checks() {
        let stream = uniform_stream(0, 20, 2);
        let w = BufferWindows::new(
            Playback {
                position: 4.0,
                rate: 1.0,
            },
            &config(2.0, 4.0, 6.0),
        );
        assert!(!is_segment_actual(stream.get("s0").unwrap(), &w));
        assert!(!is_segment_actual(stream.get("s2").unwrap(), &w));
        assert!(is_segment_actual(stream.get("s4").unwrap(), &w));
        assert!(is_segment_actual(stream.get("s8").unwrap(), &w));
        assert!(!is_segment_actual(stream.get("s10").unwrap(), &w));
    }
}
