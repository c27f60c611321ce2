//! Announcements: which segments a node has stored and which it is fetching over HTTP.
//!
//! Payload layout, two sections back to back (loaded, then HTTP-loading). Each section is
//! an `Int` item with the number of arrays, followed by that many similar-integer arrays.
//! Sets with more than 15 prefix groups are spread over several arrays.

use std::collections::BTreeSet;

use crate::codec::{self, EncodingRangeError, FormatError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Announcement {
    pub loaded: BTreeSet<i64>,
    pub http_loading: BTreeSet<i64>,
}

/// What a peer told us about one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentStatus {
    Loaded,
    LoadingByHttp,
}

impl Announcement {
    pub fn new(
        loaded: impl IntoIterator<Item = i64>,
        http_loading: impl IntoIterator<Item = i64>,
    ) -> Self {
        let loaded: BTreeSet<i64> = loaded.into_iter().collect();
        // A stored segment is never also reported as in flight.
        let http_loading = http_loading
            .into_iter()
            .filter(|id| !loaded.contains(id))
            .collect();
        Self {
            loaded,
            http_loading,
        }
    }

    pub fn status(&self, external_id: i64) -> Option<SegmentStatus> {
        if self.loaded.contains(&external_id) {
            Some(SegmentStatus::Loaded)
        } else if self.http_loading.contains(&external_id) {
            Some(SegmentStatus::LoadingByHttp)
        } else {
            None
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, EncodingRangeError> {
        let mut out = Vec::new();
        write_section(&mut out, &self.loaded)?;
        write_section(&mut out, &self.http_loading)?;
        Ok(out)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, FormatError> {
        let (loaded, used) = read_section(bytes)?;
        let (http_loading, used2) = read_section(&bytes[used..])?;
        let rest = bytes.len() - used - used2;
        if rest != 0 {
            return Err(FormatError::TrailingBytes(rest));
        }
        Ok(Self {
            loaded,
            http_loading,
        })
    }
}

fn write_section(out: &mut Vec<u8>, ids: &BTreeSet<i64>) -> Result<(), EncodingRangeError> {
    let arrays = codec::serialize_split_int_arrays(ids.iter().map(|&id| i128::from(id)))?;
    codec::write_int(out, arrays.len() as i128)?;
    for array in arrays {
        out.extend_from_slice(&array);
    }
    Ok(())
}

fn read_section(bytes: &[u8]) -> Result<(BTreeSet<i64>, usize), FormatError> {
    let (count, mut offset) = codec::deserialize_int(bytes)?;
    if count < 0 {
        return Err(FormatError::InvalidCount(count));
    }
    let mut ids = BTreeSet::new();
    for _ in 0..count {
        let (values, used) = codec::deserialize_similar_int_array(&bytes[offset..])?;
        offset += used;
        for value in values {
            let id = i64::try_from(value).map_err(|_| FormatError::IdOutOfRange(value))?;
            ids.insert(id);
        }
    }
    Ok((ids, offset))
}
