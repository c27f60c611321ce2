//! Announcement codec: variable-length signed integers and common-prefix integer arrays.
//!
//! Every item starts with a header byte: the high nibble is the [`ItemType`], the low
//! nibble is a length (payload bytes for [`ItemType::Int`], prefix groups for
//! [`ItemType::SimilarIntArray`]). Decoders report the bytes consumed so items can be
//! read back to back without an outer length prefix.

use std::collections::BTreeMap;

/// Most payload bytes a single integer can occupy (4-bit length field).
pub const MAX_INT_BYTES: usize = 15;

/// Most prefix groups a single similar-integer array can hold (4-bit count field).
pub const MAX_PREFIX_GROUPS: usize = 15;

const SIGN_BIT: u8 = 0b1000_0000;
const LOW_NIBBLE: u8 = 0b0000_1111;
const DIFF_MASK: i128 = 0xff;

/// Item kinds. Four bits on the wire, so at most 16 kinds exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ItemType {
    Int = 0,
    SimilarIntArray = 1,
}

impl ItemType {
    fn header(self, low: usize) -> u8 {
        ((self as u8) << 4) | (low as u8 & LOW_NIBBLE)
    }
}

/// Value cannot be represented in the format; raised before any bytes are produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingRangeError {
    #[error("integer {value} needs {required} bytes, at most 15 fit")]
    IntTooLarge { value: i128, required: usize },
    #[error("{groups} prefix groups, at most 15 fit in one array")]
    TooManyGroups { groups: usize },
}

/// Malformed input while decoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("expected {expected:?} item, found type tag {found}")]
    UnexpectedItem { expected: ItemType, found: u8 },
    #[error("buffer too short: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },
    #[error("integer item with zero payload bytes")]
    EmptyInt,
    #[error("array prefix {0} has a non-zero low byte")]
    MisalignedPrefix(i128),
    #[error("{0} unexpected trailing bytes")]
    TrailingBytes(usize),
    #[error("invalid item count {0}")]
    InvalidCount(i128),
    #[error("value {0} does not fit a segment id")]
    IdOutOfRange(i128),
}

fn required_bytes(magnitude: u128) -> usize {
    let bits = (128 - magnitude.leading_zeros() as usize) + 1;
    bits.div_ceil(8)
}

/// Minimal big-endian magnitude with the sign in the top bit of the first byte.
pub fn int_to_bytes(value: i128) -> Result<Vec<u8>, EncodingRangeError> {
    let magnitude = value.unsigned_abs();
    let required = required_bytes(magnitude);
    if required > MAX_INT_BYTES {
        return Err(EncodingRangeError::IntTooLarge { value, required });
    }
    let mut out = magnitude.to_be_bytes()[16 - required..].to_vec();
    if value < 0 {
        out[0] |= SIGN_BIT;
    }
    Ok(out)
}

/// Inverse of [`int_to_bytes`]. `bytes` must hold 1..=15 bytes.
pub fn bytes_to_int(bytes: &[u8]) -> Result<i128, FormatError> {
    let Some((&first, rest)) = bytes.split_first() else {
        return Err(FormatError::EmptyInt);
    };
    let mut magnitude = u128::from(first & !SIGN_BIT);
    for &b in rest {
        magnitude = (magnitude << 8) | u128::from(b);
    }
    // At most 119 magnitude bits, always fits.
    let number = magnitude as i128;
    Ok(if first & SIGN_BIT != 0 { -number } else { number })
}

/// Append one [`ItemType::Int`] item to `out`.
pub fn write_int(out: &mut Vec<u8>, value: i128) -> Result<(), EncodingRangeError> {
    let bytes = int_to_bytes(value)?;
    out.push(ItemType::Int.header(bytes.len()));
    out.extend_from_slice(&bytes);
    Ok(())
}

/// Encode one integer item: header byte followed by its payload.
pub fn serialize_int(value: i128) -> Result<Vec<u8>, EncodingRangeError> {
    let mut out = Vec::with_capacity(MAX_INT_BYTES + 1);
    write_int(&mut out, value)?;
    Ok(out)
}

fn read_header(bytes: &[u8], expected: ItemType) -> Result<usize, FormatError> {
    let &header = bytes.first().ok_or(FormatError::Truncated {
        needed: 1,
        available: 0,
    })?;
    let found = header >> 4;
    if found != expected as u8 {
        return Err(FormatError::UnexpectedItem { expected, found });
    }
    Ok((header & LOW_NIBBLE) as usize)
}

/// Decode one integer item from the front of `bytes`. Returns the value and bytes consumed.
pub fn deserialize_int(bytes: &[u8]) -> Result<(i128, usize), FormatError> {
    let len = read_header(bytes, ItemType::Int)?;
    if len == 0 {
        return Err(FormatError::EmptyInt);
    }
    let end = 1 + len;
    if bytes.len() < end {
        return Err(FormatError::Truncated {
            needed: end,
            available: bytes.len(),
        });
    }
    Ok((bytes_to_int(&bytes[1..end])?, end))
}

/// Group values by everything except their low byte. Duplicates collapse.
pub fn prefix_groups(values: impl IntoIterator<Item = i128>) -> BTreeMap<i128, Vec<u8>> {
    let mut groups: BTreeMap<i128, Vec<u8>> = BTreeMap::new();
    for value in values {
        let diffs = groups.entry(value & !DIFF_MASK).or_default();
        let diff = (value & DIFF_MASK) as u8;
        if let Err(at) = diffs.binary_search(&diff) {
            diffs.insert(at, diff);
        }
    }
    groups
}

fn write_groups<'a>(
    out: &mut Vec<u8>,
    groups: impl ExactSizeIterator<Item = (&'a i128, &'a Vec<u8>)>,
) -> Result<(), EncodingRangeError> {
    if groups.len() > MAX_PREFIX_GROUPS {
        return Err(EncodingRangeError::TooManyGroups {
            groups: groups.len(),
        });
    }
    let mut body = vec![ItemType::SimilarIntArray.header(groups.len())];
    for (&prefix, diffs) in groups {
        write_int(&mut body, prefix)?;
        // Groups are never empty and a byte suffix has at most 256 members.
        body.push((diffs.len() - 1) as u8);
        body.extend_from_slice(diffs);
    }
    out.extend_from_slice(&body);
    Ok(())
}

/// Append one [`ItemType::SimilarIntArray`] item holding `values` (as a set).
/// Nothing is written on error.
pub fn write_similar_int_array(
    out: &mut Vec<u8>,
    values: impl IntoIterator<Item = i128>,
) -> Result<(), EncodingRangeError> {
    let groups = prefix_groups(values);
    write_groups(out, groups.iter())
}

/// Encode a set of integers as one similar-integer array.
pub fn serialize_similar_int_array(
    values: impl IntoIterator<Item = i128>,
) -> Result<Vec<u8>, EncodingRangeError> {
    let mut out = Vec::new();
    write_similar_int_array(&mut out, values)?;
    Ok(out)
}

/// Encode any set as one or more arrays of at most [`MAX_PREFIX_GROUPS`] groups each.
pub fn serialize_split_int_arrays(
    values: impl IntoIterator<Item = i128>,
) -> Result<Vec<Vec<u8>>, EncodingRangeError> {
    let groups: Vec<(i128, Vec<u8>)> = prefix_groups(values).into_iter().collect();
    groups
        .chunks(MAX_PREFIX_GROUPS)
        .map(|batch| {
            let mut out = Vec::new();
            write_groups(&mut out, batch.iter().map(|(p, d)| (p, d)))?;
            Ok(out)
        })
        .collect()
}

/// Decode one similar-integer array from the front of `bytes`.
/// Returns the values (ascending) and bytes consumed.
pub fn deserialize_similar_int_array(bytes: &[u8]) -> Result<(Vec<i128>, usize), FormatError> {
    let group_count = read_header(bytes, ItemType::SimilarIntArray)?;
    let mut values = Vec::new();
    let mut offset = 1;
    for _ in 0..group_count {
        let (prefix, used) = deserialize_int(&bytes[offset..])?;
        if prefix & DIFF_MASK != 0 {
            return Err(FormatError::MisalignedPrefix(prefix));
        }
        offset += used;
        let &count = bytes.get(offset).ok_or(FormatError::Truncated {
            needed: offset + 1,
            available: bytes.len(),
        })?;
        offset += 1;
        let end = offset + count as usize + 1;
        let diffs = bytes.get(offset..end).ok_or(FormatError::Truncated {
            needed: end,
            available: bytes.len(),
        })?;
        values.extend(diffs.iter().map(|&d| prefix | i128::from(d)));
        offset = end;
    }
    Ok((values, offset))
}
