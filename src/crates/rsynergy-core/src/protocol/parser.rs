//! Buffered stream parser: raw socket bytes in, whole messages out.
//!
//! Partial reads are the norm on a TCP stream; a single [`StreamParser::feed`]
//! may complete zero, one, or many frames.  Framing violations (an empty
//! frame or one larger than [`MAX_MESSAGE_LEN`]) are fatal and must close
//! the session.  A malformed payload on a *known* opcode is recoverable:
//! the frame is consumed, a warning is logged, and parsing continues —
//! this tolerates server-side opcode drift without killing the session.

use thiserror::Error;
use tracing::warn;

use crate::protocol::codec::{decode_frame, DecodeError};
use crate::protocol::messages::Message;

/// Upper bound on a single frame (opcode + payload).  Anything larger is
/// not a plausible Synergy message and is treated as a framing attack or
/// stream corruption.
pub const MAX_MESSAGE_LEN: usize = 128 * 1024;

/// Fatal framing violations.  The session must close when one surfaces.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// A frame declared a zero-byte body; no opcode can fit.
    #[error("zero-length frame")]
    EmptyFrame,

    /// A frame declared a body larger than [`MAX_MESSAGE_LEN`].
    #[error("oversized frame: {len} bytes exceeds the {MAX_MESSAGE_LEN} byte limit")]
    OversizedFrame { len: usize },

    /// The server's greeting advertised an unsupported protocol version.
    #[error("unsupported protocol version {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },
}

/// Accumulates raw bytes and yields complete, decoded messages.
///
/// Restartable: state is only the byte buffer, so a parser can be reused
/// across reads for the lifetime of one connection.
#[derive(Debug, Default)]
pub struct StreamParser {
    buf: Vec<u8>,
}

impl StreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends raw bytes from the transport.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Returns the next complete message, or `None` when fewer than
    /// `4 + len` bytes are buffered.  Exactly `4 + len` bytes are consumed
    /// per returned frame.
    ///
    /// Frames whose known opcode carries a malformed payload are consumed
    /// and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] on a framing violation; the buffer is left
    /// as-is and the caller must tear the session down.
    pub fn next_message(&mut self) -> Result<Option<Message>, ProtocolError> {
        loop {
            if self.buf.len() < 4 {
                return Ok(None);
            }

            let len = u32::from_be_bytes(self.buf[..4].try_into().expect("4 bytes checked")) as usize;
            if len == 0 {
                return Err(ProtocolError::EmptyFrame);
            }
            if len > MAX_MESSAGE_LEN {
                return Err(ProtocolError::OversizedFrame { len });
            }

            let total = 4 + len;
            if self.buf.len() < total {
                return Ok(None);
            }

            let result = decode_frame(&self.buf[4..total]);
            self.buf.drain(..total);

            match result {
                Ok(msg) => return Ok(Some(msg)),
                Err(DecodeError { opcode, detail }) => {
                    // Recoverable: the frame is already consumed.
                    warn!(%opcode, %detail, "skipping malformed frame");
                }
            }
        }
    }

    /// Bytes currently buffered, for diagnostics.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codec::encode_message;

    fn frame_of(msg: &Message) -> Vec<u8> {
        encode_message(msg)
    }

    #[test]
    fn test_empty_buffer_yields_none() {
        let mut parser = StreamParser::new();
        assert_eq!(parser.next_message().unwrap(), None);
    }

    #[test]
    fn test_whole_frame_yields_message_and_consumes_it() {
        let mut parser = StreamParser::new();
        parser.feed(&frame_of(&Message::KeepAlive));

        assert_eq!(parser.next_message().unwrap(), Some(Message::KeepAlive));
        assert_eq!(parser.buffered(), 0);
        assert_eq!(parser.next_message().unwrap(), None);
    }

    #[test]
    fn test_partial_frame_yields_none_until_complete() {
        let bytes = frame_of(&Message::MouseMove { x: 100, y: 200 });
        let mut parser = StreamParser::new();

        // Feed all but the last byte: nothing can come out yet.
        parser.feed(&bytes[..bytes.len() - 1]);
        assert_eq!(parser.next_message().unwrap(), None);

        parser.feed(&bytes[bytes.len() - 1..]);
        assert_eq!(
            parser.next_message().unwrap(),
            Some(Message::MouseMove { x: 100, y: 200 })
        );
    }

    #[test]
    fn test_single_feed_can_yield_many_messages() {
        let mut bytes = frame_of(&Message::KeepAlive);
        bytes.extend(frame_of(&Message::QueryInfo));
        bytes.extend(frame_of(&Message::Leave));

        let mut parser = StreamParser::new();
        parser.feed(&bytes);

        assert_eq!(parser.next_message().unwrap(), Some(Message::KeepAlive));
        assert_eq!(parser.next_message().unwrap(), Some(Message::QueryInfo));
        assert_eq!(parser.next_message().unwrap(), Some(Message::Leave));
        assert_eq!(parser.next_message().unwrap(), None);
    }

    #[test]
    fn test_split_at_every_offset_yields_same_sequence() {
        let mut bytes = frame_of(&Message::KeyDown {
            id: 0x61,
            mask: crate::protocol::messages::ModifierMask(0),
            button: 0x26,
        });
        bytes.extend(frame_of(&Message::MouseWheel { x: 0, y: -120 }));

        for split in 0..=bytes.len() {
            let mut parser = StreamParser::new();
            parser.feed(&bytes[..split]);
            let mut out = Vec::new();
            while let Some(msg) = parser.next_message().unwrap() {
                out.push(msg);
            }
            parser.feed(&bytes[split..]);
            while let Some(msg) = parser.next_message().unwrap() {
                out.push(msg);
            }

            assert_eq!(out.len(), 2, "split at {split}");
            assert!(matches!(out[0], Message::KeyDown { id: 0x61, .. }));
            assert!(matches!(out[1], Message::MouseWheel { y: -120, .. }));
        }
    }

    #[test]
    fn test_zero_length_frame_is_fatal() {
        let mut parser = StreamParser::new();
        parser.feed(&[0, 0, 0, 0]);
        assert_eq!(parser.next_message(), Err(ProtocolError::EmptyFrame));
    }

    #[test]
    fn test_frame_at_exactly_max_len_decodes() {
        // An opaque frame whose body is exactly MAX_MESSAGE_LEN bytes.
        let payload = vec![0u8; MAX_MESSAGE_LEN - 4];
        let mut bytes = (MAX_MESSAGE_LEN as u32).to_be_bytes().to_vec();
        bytes.extend_from_slice(b"XXXX");
        bytes.extend_from_slice(&payload);

        let mut parser = StreamParser::new();
        parser.feed(&bytes);
        match parser.next_message().unwrap() {
            Some(Message::Opaque { opcode, payload: p }) => {
                assert_eq!(&opcode, b"XXXX");
                assert_eq!(p.len(), MAX_MESSAGE_LEN - 4);
            }
            other => panic!("expected opaque message, got {other:?}"),
        }
    }

    #[test]
    fn test_frame_one_past_max_len_is_fatal() {
        let mut parser = StreamParser::new();
        parser.feed(&((MAX_MESSAGE_LEN as u32) + 1).to_be_bytes());
        assert_eq!(
            parser.next_message(),
            Err(ProtocolError::OversizedFrame { len: MAX_MESSAGE_LEN + 1 })
        );
    }

    #[test]
    fn test_malformed_known_opcode_is_skipped_and_parsing_continues() {
        // A DKDN frame with a truncated payload, followed by a valid CALV.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&6u32.to_be_bytes());
        bytes.extend_from_slice(b"DKDN\x00\x61");
        bytes.extend(frame_of(&Message::KeepAlive));

        let mut parser = StreamParser::new();
        parser.feed(&bytes);
        assert_eq!(parser.next_message().unwrap(), Some(Message::KeepAlive));
        assert_eq!(parser.buffered(), 0);
    }
}
