//! Peer frames. Each `PeerMessage` travels as a little-endian `u32` byte count
//! followed by its bincode body; a transport may deliver several frames in one buffer.

use crate::protocol::PeerMessage;

const LEN_SIZE: usize = 4;
/// Upper bound on a frame body. Segments above this are answered with `SegmentAbsent`.
pub const MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum FrameEncodeError {
    #[error("cannot serialize peer message: {0}")]
    Encode(#[from] bincode::Error),
    #[error("peer message exceeds the frame limit")]
    TooLarge,
}

#[derive(Debug, thiserror::Error)]
pub enum FrameDecodeError {
    #[error("incomplete frame")]
    NeedMore,
    #[error("declared frame length exceeds the limit")]
    TooLarge,
    #[error("cannot deserialize peer message: {0}")]
    Decode(#[from] bincode::Error),
}

pub fn encode_frame(msg: &PeerMessage) -> Result<Vec<u8>, FrameEncodeError> {
    let body = bincode::serialize(msg)?;
    let len = u32::try_from(body.len())
        .ok()
        .filter(|&len| len <= MAX_FRAME_LEN)
        .ok_or(FrameEncodeError::TooLarge)?;
    let mut frame = Vec::with_capacity(LEN_SIZE + body.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Read the first frame in `buf`, returning the message and the frame's total size.
/// `NeedMore` means `buf` ends mid-frame.
pub fn decode_frame(buf: &[u8]) -> Result<(PeerMessage, usize), FrameDecodeError> {
    let Some((head, rest)) = buf.split_first_chunk::<LEN_SIZE>() else {
        return Err(FrameDecodeError::NeedMore);
    };
    let len = u32::from_le_bytes(*head);
    if len > MAX_FRAME_LEN {
        return Err(FrameDecodeError::TooLarge);
    }
    let body = rest
        .get(..len as usize)
        .ok_or(FrameDecodeError::NeedMore)?;
    Ok((bincode::deserialize(body)?, LEN_SIZE + body.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_data_frame() {
        let msg = PeerMessage::SegmentData {
            id: 42,
            payload: vec![7u8; 1000],
        };
        let frame = encode_frame(&msg).unwrap();
        let (decoded, n) = decode_frame(&frame).unwrap();
        assert_eq!(n, frame.len());
        assert_eq!(decoded, msg);
    }

    #[test]
    fn partial_read_need_more() {
        let frame = encode_frame(&PeerMessage::SegmentRequest { id: 3 }).unwrap();
        assert!(matches!(
            decode_frame(&frame[..2]),
            Err(FrameDecodeError::NeedMore)
        ));
        assert!(matches!(
            decode_frame(&frame[..frame.len() - 1]),
            Err(FrameDecodeError::NeedMore)
        ));
    }

    #[test]
    fn oversized_length_rejected() {
        let mut frame = (MAX_FRAME_LEN + 1).to_le_bytes().to_vec();
        frame.extend_from_slice(&[0; 8]);
        assert!(matches!(
            decode_frame(&frame),
            Err(FrameDecodeError::TooLarge)
        ));
    }

    #[test]
    fn oversized_message_not_framed() {
        let msg = PeerMessage::SegmentData {
            id: 1,
            payload: vec![0; MAX_FRAME_LEN as usize + 1],
        };
        assert!(matches!(encode_frame(&msg), Err(FrameEncodeError::TooLarge)));
    }

    #[test]
    fn garbage_payload_rejected() {
        let mut frame = 4u32.to_le_bytes().to_vec();
        frame.extend_from_slice(&[0xff, 0xff, 0xff, 0xff]);
        assert!(matches!(
            decode_frame(&frame),
            Err(FrameDecodeError::Decode(_))
        ));
    }

    #[test]
    fn multiple_messages() {
        let a = PeerMessage::SegmentAbsent { id: 1 };
        let b = PeerMessage::CancelSegmentRequest { id: 2 };
        let fa = encode_frame(&a).unwrap();
        let fb = encode_frame(&b).unwrap();
        let mut buf = fa.clone();
        buf.extend_from_slice(&fb);
        let (m1, n1) = decode_frame(&buf).unwrap();
        assert_eq!(n1, fa.len());
        let (m2, n2) = decode_frame(&buf[n1..]).unwrap();
        assert_eq!(n2, fb.len());
        assert_eq!((m1, m2), (a, b));
    }
}
