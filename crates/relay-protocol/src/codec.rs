//! Codec for carrying multipart messages over a byte stream.
//!
//! Each frame is written as a flags byte, a u32 big-endian payload length,
//! and the payload. Bit 0 of the flags byte marks that more frames of the
//! same message follow; a message ends at the first frame with the bit
//! clear. The decoder accumulates completed frames across calls, so it
//! tolerates arbitrary split points in the stream.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::message::Message;

/// Upper bound on a single frame's payload.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Per-frame header size: flags byte plus payload length.
const FRAME_HEADER_LEN: usize = 5;

/// Flags bit: more frames of the same message follow.
const FLAG_MORE: u8 = 0x01;

/// Error type for codec operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Frame payload exceeds [`MAX_FRAME_LEN`].
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge {
        /// Offending payload length.
        len: usize,
        /// The configured limit.
        max: usize,
    },

    /// A message must carry at least one frame.
    #[error("message has no frames")]
    EmptyMessage,

    /// Unknown bits set in a frame's flags byte.
    #[error("invalid flags byte: {0:#04x}")]
    InvalidFlags(u8),

    /// Underlying transport error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Stateful multipart message codec.
#[derive(Debug, Default)]
pub struct MessageCodec {
    /// Frames of the in-progress message, in arrival order.
    partial: Vec<Bytes>,
}

impl MessageCodec {
    /// Create a codec with no in-progress message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, CodecError> {
        loop {
            // Peek the header on a cursor copy so a partial payload leaves
            // the buffer untouched for the next call.
            let mut peek: &[u8] = src.as_ref();
            if peek.remaining() < FRAME_HEADER_LEN {
                return Ok(None);
            }
            let flags = peek.get_u8();
            if flags & !FLAG_MORE != 0 {
                return Err(CodecError::InvalidFlags(flags));
            }
            let len = peek.get_u32() as usize;
            if len > MAX_FRAME_LEN {
                return Err(CodecError::FrameTooLarge {
                    len,
                    max: MAX_FRAME_LEN,
                });
            }
            if src.len() < FRAME_HEADER_LEN + len {
                src.reserve(FRAME_HEADER_LEN + len - src.len());
                return Ok(None);
            }

            src.advance(FRAME_HEADER_LEN);
            self.partial.push(src.split_to(len).freeze());

            if flags & FLAG_MORE == 0 {
                let frames = std::mem::take(&mut self.partial);
                return Ok(Some(Message::from_frames(frames)));
            }
        }
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), CodecError> {
        let frames = item.into_frames();
        if frames.is_empty() {
            return Err(CodecError::EmptyMessage);
        }
        // Validate every frame before writing anything, so an error never
        // leaves a torn message in the output buffer.
        for frame in &frames {
            if frame.len() > MAX_FRAME_LEN {
                return Err(CodecError::FrameTooLarge {
                    len: frame.len(),
                    max: MAX_FRAME_LEN,
                });
            }
        }

        let total: usize = frames.iter().map(|frame| FRAME_HEADER_LEN + frame.len()).sum();
        dst.reserve(total);

        let last = frames.len() - 1;
        for (index, frame) in frames.iter().enumerate() {
            let flags = if index == last { 0 } else { FLAG_MORE };
            dst.put_u8(flags);
            dst.put_u32(frame.len() as u32);
            dst.extend_from_slice(frame);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn encode(message: Message) -> BytesMut {
        let mut buf = BytesMut::new();
        MessageCodec::new().encode(message, &mut buf).unwrap();
        buf
    }

    #[test]
    fn round_trips_a_single_frame_message() {
        let mut buf = encode(Message::single(Bytes::from_static(b"hello")));
        let decoded = MessageCodec::new().decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, Message::single(Bytes::from_static(b"hello")));
        assert!(buf.is_empty());
    }

    #[test]
    fn round_trips_a_multipart_message() {
        let message = Message::from_frames(vec![
            Bytes::from_static(b"hello"),
            Bytes::from_static(b""),
            Bytes::from_static(b"world"),
        ]);
        let mut buf = encode(message.clone());
        let decoded = MessageCodec::new().decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn decodes_across_arbitrary_split_points() {
        let message = Message::from_frames(vec![
            Bytes::from_static(b"first frame"),
            Bytes::from_static(b"second frame"),
        ]);
        let wire = encode(message.clone());

        // Feed the stream one byte at a time; only the final byte
        // completes the message.
        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::new();
        let mut decoded = None;
        for (index, byte) in wire.iter().enumerate() {
            buf.put_u8(*byte);
            match codec.decode(&mut buf).unwrap() {
                Some(message) => {
                    assert_eq!(index, wire.len() - 1, "decoded before the stream was complete");
                    decoded = Some(message);
                }
                None => assert!(index < wire.len() - 1),
            }
        }
        assert_eq!(decoded, Some(message));
    }

    #[test]
    fn decodes_back_to_back_messages_from_one_buffer() {
        let first = Message::single(Bytes::from_static(b"one"));
        let second = Message::from_frames(vec![
            Bytes::from_static(b"two"),
            Bytes::from_static(b"three"),
        ]);

        let mut buf = BytesMut::new();
        let mut codec = MessageCodec::new();
        codec.encode(first.clone(), &mut buf).unwrap();
        codec.encode(second.clone(), &mut buf).unwrap();

        assert_eq!(codec.decode(&mut buf).unwrap(), Some(first));
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(second));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn rejects_an_empty_message_on_encode() {
        let mut buf = BytesMut::new();
        let result = MessageCodec::new().encode(Message::new(), &mut buf);
        assert!(matches!(result, Err(CodecError::EmptyMessage)));
        assert!(buf.is_empty());
    }

    #[test]
    fn rejects_an_oversized_frame_on_encode() {
        let mut buf = BytesMut::new();
        let huge = Message::single(Bytes::from(vec![0u8; MAX_FRAME_LEN + 1]));
        let result = MessageCodec::new().encode(huge, &mut buf);
        assert!(matches!(result, Err(CodecError::FrameTooLarge { .. })));
        assert!(buf.is_empty(), "a rejected message must not leave partial output");
    }

    #[test]
    fn rejects_an_oversized_frame_on_decode() {
        let mut buf = BytesMut::new();
        buf.put_u8(0);
        buf.put_u32(u32::MAX);
        let result = MessageCodec::new().decode(&mut buf);
        assert!(matches!(result, Err(CodecError::FrameTooLarge { .. })));
    }

    #[test]
    fn rejects_unknown_flag_bits() {
        let mut buf = BytesMut::new();
        buf.put_u8(0x80);
        buf.put_u32(0);
        let result = MessageCodec::new().decode(&mut buf);
        assert!(matches!(result, Err(CodecError::InvalidFlags(0x80))));
    }

    #[test]
    fn partial_header_waits_for_more_input() {
        let mut buf = BytesMut::new();
        buf.put_u8(0);
        buf.put_u8(0);
        assert_eq!(MessageCodec::new().decode(&mut buf).unwrap(), None);
        assert_eq!(buf.len(), 2, "partial header must stay buffered");
    }
}
