//! Binary codec for Synergy/Barrier protocol messages.
//!
//! Wire format:
//! ```text
//! [len:u32][opcode:4 ASCII bytes][payload:N]
//! ```
//! `len` covers the opcode plus the payload.  All multi-byte integers are
//! big-endian; strings are a `u32` byte count followed by UTF-8 bytes.
//!
//! The greeting pair (`Hello`/`HelloBack`) replaces the 4-byte opcode with
//! the literal 7-byte protocol name (`Synergy` or `Barrier`); the decoder
//! recognises these by prefix before the opcode lookup runs.
//!
//! Decoding is registry-free: an exhaustive match on the opcode bytes means
//! a missing decoder is a compile error rather than a silent fallthrough.
//! Unknown opcodes decode to [`Message::Opaque`] and are never fatal.
//!
//! Coordinate fields are `i16`/`u16` in [`Message`] itself, so an
//! out-of-range coordinate cannot reach the encoder; callers that derive
//! screen dimensions from wider integers must range-check before
//! constructing a message.

use thiserror::Error;

use crate::protocol::messages::{Message, ModifierMask, ScreenDescriptor, GREETING_NAMES};

/// A known opcode whose payload could not be parsed.
///
/// This error is recoverable: the stream parser consumes the offending
/// frame, logs it, and continues with the next frame.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("malformed {opcode} payload: {detail}")]
pub struct DecodeError {
    /// Opcode of the offending frame, for diagnostics.
    pub opcode: String,
    /// What went wrong.
    pub detail: String,
}

impl DecodeError {
    fn new(opcode: &str, detail: impl Into<String>) -> Self {
        Self {
            opcode: opcode.to_string(),
            detail: detail.into(),
        }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a [`Message`] into a complete wire frame including the 4-byte
/// length prefix.
pub fn encode_message(msg: &Message) -> Vec<u8> {
    let body = encode_body(msg);
    let mut frame = Vec::with_capacity(4 + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&body);
    frame
}

/// Decodes one frame body (everything after the length prefix) into a
/// typed [`Message`].
///
/// # Errors
///
/// Returns [`DecodeError`] when a known opcode carries a malformed payload.
/// Unknown opcodes are not an error; they decode to [`Message::Opaque`].
pub fn decode_frame(frame: &[u8]) -> Result<Message, DecodeError> {
    // Greeting detection runs first: the 7-byte protocol name is not a
    // 4-byte opcode and must not fall into the opcode match below.
    for name in GREETING_NAMES {
        if frame.len() >= name.len() && &frame[..name.len()] == name.as_bytes() {
            return decode_greeting(name, &frame[name.len()..]);
        }
    }

    if frame.len() < 4 {
        return Err(DecodeError::new("????", format!("frame too short: {} bytes", frame.len())));
    }

    let opcode: [u8; 4] = frame[..4].try_into().expect("length checked above");
    let p = &frame[4..];

    match &opcode {
        b"QINF" => Ok(Message::QueryInfo),
        b"DINF" => decode_info(p),
        b"CIAK" => Ok(Message::InfoAck),
        b"CALV" => Ok(Message::KeepAlive),
        b"CNOP" => Ok(Message::Noop),
        b"CBYE" => Ok(Message::Close),
        b"CINN" => decode_enter(p),
        b"COUT" => Ok(Message::Leave),
        b"CROP" => Ok(Message::ResetOptions),
        b"CSEC" => {
            require_len(p, 1, "CSEC")?;
            Ok(Message::ScreenSaver { started: p[0] != 0 })
        }
        b"DKDN" => {
            let (id, mask, button) = decode_key_fields(p, "DKDN")?;
            Ok(Message::KeyDown { id, mask, button })
        }
        b"DKDL" => decode_key_down_lang(p),
        b"DKRP" => decode_key_repeat(p),
        b"DKUP" => {
            let (id, mask, button) = decode_key_fields(p, "DKUP")?;
            Ok(Message::KeyUp { id, mask, button })
        }
        b"DMDN" => {
            require_len(p, 1, "DMDN")?;
            Ok(Message::MouseDown { button: p[0] as i8 })
        }
        b"DMUP" => {
            require_len(p, 1, "DMUP")?;
            Ok(Message::MouseUp { button: p[0] as i8 })
        }
        b"DMMV" => {
            require_len(p, 4, "DMMV")?;
            Ok(Message::MouseMove { x: read_i16(p, 0), y: read_i16(p, 2) })
        }
        b"DMRM" => {
            require_len(p, 4, "DMRM")?;
            Ok(Message::MouseRelMove { dx: read_i16(p, 0), dy: read_i16(p, 2) })
        }
        b"DMWM" => {
            require_len(p, 4, "DMWM")?;
            Ok(Message::MouseWheel { x: read_i16(p, 0), y: read_i16(p, 2) })
        }
        b"DSOP" => decode_set_options(p),
        b"CCLP" => {
            require_len(p, 5, "CCLP")?;
            Ok(Message::ClipboardGrab { id: p[0], sequence: read_u32(p, 1) })
        }
        b"DCLP" => decode_clipboard(p),
        b"EBAD" => Ok(Message::ErrorBad),
        b"EBSY" => Ok(Message::ErrorBusy),
        b"EUNK" => Ok(Message::ErrorUnknown),
        b"EICV" => {
            require_len(p, 4, "EICV")?;
            Ok(Message::ErrorIncompatible { major: read_u16(p, 0), minor: read_u16(p, 2) })
        }
        _ => Ok(Message::Opaque { opcode, payload: p.to_vec() }),
    }
}

// ── Body encoding ─────────────────────────────────────────────────────────────

fn encode_body(msg: &Message) -> Vec<u8> {
    let mut buf = Vec::new();
    match msg {
        Message::Hello { protocol_name, major, minor } => {
            buf.extend_from_slice(protocol_name.as_bytes());
            buf.extend_from_slice(&major.to_be_bytes());
            buf.extend_from_slice(&minor.to_be_bytes());
        }
        Message::HelloBack { protocol_name, major, minor, name } => {
            buf.extend_from_slice(protocol_name.as_bytes());
            buf.extend_from_slice(&major.to_be_bytes());
            buf.extend_from_slice(&minor.to_be_bytes());
            write_var_bytes(&mut buf, name.as_bytes());
        }
        Message::QueryInfo
        | Message::InfoAck
        | Message::KeepAlive
        | Message::Noop
        | Message::Close
        | Message::Leave
        | Message::ResetOptions
        | Message::ErrorBad
        | Message::ErrorBusy
        | Message::ErrorUnknown => {
            buf.extend_from_slice(msg.opcode().as_bytes());
        }
        Message::Info(s) => {
            buf.extend_from_slice(b"DINF");
            buf.extend_from_slice(&s.left.to_be_bytes());
            buf.extend_from_slice(&s.top.to_be_bytes());
            buf.extend_from_slice(&s.width.to_be_bytes());
            buf.extend_from_slice(&s.height.to_be_bytes());
            buf.extend_from_slice(&s.warp.to_be_bytes());
            buf.extend_from_slice(&s.mouse_x.to_be_bytes());
            buf.extend_from_slice(&s.mouse_y.to_be_bytes());
        }
        Message::Enter { x, y, sequence, mask } => {
            buf.extend_from_slice(b"CINN");
            buf.extend_from_slice(&x.to_be_bytes());
            buf.extend_from_slice(&y.to_be_bytes());
            buf.extend_from_slice(&sequence.to_be_bytes());
            buf.extend_from_slice(&mask.0.to_be_bytes());
        }
        Message::ScreenSaver { started } => {
            buf.extend_from_slice(b"CSEC");
            buf.push(u8::from(*started));
        }
        Message::KeyDown { id, mask, button } => {
            buf.extend_from_slice(b"DKDN");
            encode_key_fields(&mut buf, *id, *mask, *button);
        }
        Message::KeyDownLang { id, mask, button, language } => {
            buf.extend_from_slice(b"DKDL");
            encode_key_fields(&mut buf, *id, *mask, *button);
            write_var_bytes(&mut buf, language.as_bytes());
        }
        Message::KeyRepeat { id, mask, count, button } => {
            buf.extend_from_slice(b"DKRP");
            buf.extend_from_slice(&id.to_be_bytes());
            buf.extend_from_slice(&mask.0.to_be_bytes());
            buf.extend_from_slice(&count.to_be_bytes());
            buf.extend_from_slice(&button.to_be_bytes());
        }
        Message::KeyUp { id, mask, button } => {
            buf.extend_from_slice(b"DKUP");
            encode_key_fields(&mut buf, *id, *mask, *button);
        }
        Message::MouseDown { button } => {
            buf.extend_from_slice(b"DMDN");
            buf.push(*button as u8);
        }
        Message::MouseUp { button } => {
            buf.extend_from_slice(b"DMUP");
            buf.push(*button as u8);
        }
        Message::MouseMove { x, y } => {
            buf.extend_from_slice(b"DMMV");
            buf.extend_from_slice(&x.to_be_bytes());
            buf.extend_from_slice(&y.to_be_bytes());
        }
        Message::MouseRelMove { dx, dy } => {
            buf.extend_from_slice(b"DMRM");
            buf.extend_from_slice(&dx.to_be_bytes());
            buf.extend_from_slice(&dy.to_be_bytes());
        }
        Message::MouseWheel { x, y } => {
            buf.extend_from_slice(b"DMWM");
            buf.extend_from_slice(&x.to_be_bytes());
            buf.extend_from_slice(&y.to_be_bytes());
        }
        Message::SetOptions(options) => {
            buf.extend_from_slice(b"DSOP");
            buf.extend_from_slice(&(options.len() as u32).to_be_bytes());
            for opt in options {
                buf.extend_from_slice(&opt.to_be_bytes());
            }
        }
        Message::ClipboardGrab { id, sequence } => {
            buf.extend_from_slice(b"CCLP");
            buf.push(*id);
            buf.extend_from_slice(&sequence.to_be_bytes());
        }
        Message::Clipboard { id, sequence, mark, data } => {
            buf.extend_from_slice(b"DCLP");
            buf.push(*id);
            buf.extend_from_slice(&sequence.to_be_bytes());
            buf.push(*mark);
            write_var_bytes(&mut buf, data);
        }
        Message::ErrorIncompatible { major, minor } => {
            buf.extend_from_slice(b"EICV");
            buf.extend_from_slice(&major.to_be_bytes());
            buf.extend_from_slice(&minor.to_be_bytes());
        }
        Message::Opaque { opcode, payload } => {
            buf.extend_from_slice(opcode);
            buf.extend_from_slice(payload);
        }
    }
    buf
}

// ── Per-message decode helpers ────────────────────────────────────────────────

fn decode_greeting(name: &str, p: &[u8]) -> Result<Message, DecodeError> {
    require_len(p, 4, name)?;
    let major = read_u16(p, 0);
    let minor = read_u16(p, 2);
    if p.len() == 4 {
        return Ok(Message::Hello {
            protocol_name: name.to_string(),
            major,
            minor,
        });
    }
    // Extra bytes mean a client greeting with the trailing name string.
    let (client_name, _) = read_var_string(p, 4, name)?;
    Ok(Message::HelloBack {
        protocol_name: name.to_string(),
        major,
        minor,
        name: client_name,
    })
}

fn decode_info(p: &[u8]) -> Result<Message, DecodeError> {
    // 7 × i16/u16 fields
    require_len(p, 14, "DINF")?;
    Ok(Message::Info(ScreenDescriptor {
        left: read_i16(p, 0),
        top: read_i16(p, 2),
        width: read_u16(p, 4),
        height: read_u16(p, 6),
        warp: read_u16(p, 8),
        mouse_x: read_i16(p, 10),
        mouse_y: read_i16(p, 12),
    }))
}

fn decode_enter(p: &[u8]) -> Result<Message, DecodeError> {
    // 2 + 2 + 4 + 2 = 10
    require_len(p, 10, "CINN")?;
    Ok(Message::Enter {
        x: read_i16(p, 0),
        y: read_i16(p, 2),
        sequence: read_u32(p, 4),
        mask: ModifierMask(read_u16(p, 8)),
    })
}

fn encode_key_fields(buf: &mut Vec<u8>, id: u16, mask: ModifierMask, button: u16) {
    buf.extend_from_slice(&id.to_be_bytes());
    buf.extend_from_slice(&mask.0.to_be_bytes());
    buf.extend_from_slice(&button.to_be_bytes());
}

fn decode_key_fields(p: &[u8], opcode: &str) -> Result<(u16, ModifierMask, u16), DecodeError> {
    require_len(p, 6, opcode)?;
    Ok((read_u16(p, 0), ModifierMask(read_u16(p, 2)), read_u16(p, 4)))
}

fn decode_key_down_lang(p: &[u8]) -> Result<Message, DecodeError> {
    let (id, mask, button) = decode_key_fields(p, "DKDL")?;
    let (language, _) = read_var_string(p, 6, "DKDL")?;
    Ok(Message::KeyDownLang { id, mask, button, language })
}

fn decode_key_repeat(p: &[u8]) -> Result<Message, DecodeError> {
    // id + mask + count + button; v1.8 servers append a language string
    // which is informational and dropped here.
    require_len(p, 8, "DKRP")?;
    Ok(Message::KeyRepeat {
        id: read_u16(p, 0),
        mask: ModifierMask(read_u16(p, 2)),
        count: read_u16(p, 4),
        button: read_u16(p, 6),
    })
}

fn decode_set_options(p: &[u8]) -> Result<Message, DecodeError> {
    require_len(p, 4, "DSOP")?;
    let count = read_u32(p, 0) as usize;
    require_len(p, 4 + count * 4, "DSOP")?;
    let mut options = Vec::with_capacity(count);
    for i in 0..count {
        options.push(read_u32(p, 4 + i * 4));
    }
    Ok(Message::SetOptions(options))
}

fn decode_clipboard(p: &[u8]) -> Result<Message, DecodeError> {
    // 1 (id) + 4 (sequence) + 1 (mark) + var data
    require_len(p, 6, "DCLP")?;
    let id = p[0];
    let sequence = read_u32(p, 1);
    let mark = p[5];
    let (data, _) = read_var_bytes(p, 6, "DCLP")?;
    Ok(Message::Clipboard { id, sequence, mark, data: data.to_vec() })
}

// ── Byte-level helpers ────────────────────────────────────────────────────────

fn require_len(p: &[u8], needed: usize, opcode: &str) -> Result<(), DecodeError> {
    if p.len() < needed {
        Err(DecodeError::new(
            opcode,
            format!("need {needed} bytes, got {}", p.len()),
        ))
    } else {
        Ok(())
    }
}

fn read_u16(p: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([p[offset], p[offset + 1]])
}

fn read_i16(p: &[u8], offset: usize) -> i16 {
    i16::from_be_bytes([p[offset], p[offset + 1]])
}

fn read_u32(p: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([p[offset], p[offset + 1], p[offset + 2], p[offset + 3]])
}

/// Writes a `u32` byte-count prefix followed by the raw bytes.
fn write_var_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    buf.extend_from_slice(bytes);
}

/// Reads a `u32`-prefixed byte run; returns the slice and the offset just
/// past it.
fn read_var_bytes<'a>(
    p: &'a [u8],
    offset: usize,
    opcode: &str,
) -> Result<(&'a [u8], usize), DecodeError> {
    require_len(p, offset + 4, opcode)?;
    let len = read_u32(p, offset) as usize;
    let start = offset + 4;
    require_len(p, start + len, opcode)?;
    Ok((&p[start..start + len], start + len))
}

/// Reads a `u32`-prefixed UTF-8 string.
fn read_var_string(
    p: &[u8],
    offset: usize,
    opcode: &str,
) -> Result<(String, usize), DecodeError> {
    let (bytes, end) = read_var_bytes(p, offset, opcode)?;
    let s = std::str::from_utf8(bytes)
        .map_err(|e| DecodeError::new(opcode, format!("invalid UTF-8: {e}")))?
        .to_string();
    Ok((s, end))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(msg: &Message) -> Message {
        let frame = encode_message(msg);
        let len = u32::from_be_bytes(frame[..4].try_into().unwrap()) as usize;
        assert_eq!(len, frame.len() - 4, "length prefix must cover opcode + payload");
        decode_frame(&frame[4..]).expect("decode failed")
    }

    // ── Greeting ─────────────────────────────────────────────────────────────

    #[test]
    fn test_server_hello_decodes_from_documented_bytes() {
        // "Synergy" 1.6, exactly as a Barrier-compatible server sends it.
        let frame = b"Synergy\x00\x01\x00\x06";
        let msg = decode_frame(frame).unwrap();
        assert_eq!(
            msg,
            Message::Hello {
                protocol_name: "Synergy".to_string(),
                major: 1,
                minor: 6,
            }
        );
    }

    #[test]
    fn test_barrier_hello_decodes() {
        let frame = b"Barrier\x00\x01\x00\x08";
        let msg = decode_frame(frame).unwrap();
        assert_eq!(
            msg,
            Message::Hello {
                protocol_name: "Barrier".to_string(),
                major: 1,
                minor: 8,
            }
        );
    }

    #[test]
    fn test_hello_back_frame_bytes() {
        let msg = Message::HelloBack {
            protocol_name: "Synergy".to_string(),
            major: 1,
            minor: 6,
            name: "wl".to_string(),
        };
        let frame = encode_message(&msg);
        // len(7 + 2 + 2 + 4 + 2) = 17
        assert_eq!(&frame[..4], &17u32.to_be_bytes());
        assert_eq!(&frame[4..11], b"Synergy");
        assert_eq!(&frame[11..15], &[0x00, 0x01, 0x00, 0x06]);
        assert_eq!(&frame[15..19], &2u32.to_be_bytes());
        assert_eq!(&frame[19..], b"wl");
        assert_eq!(round_trip(&msg), msg);
    }

    #[test]
    fn test_truncated_greeting_is_malformed() {
        let err = decode_frame(b"Synergy\x00\x01").unwrap_err();
        assert_eq!(err.opcode, "Synergy");
    }

    // ── Screen info ──────────────────────────────────────────────────────────

    #[test]
    fn test_info_frame_bytes_for_1080p_at_origin() {
        let msg = Message::Info(ScreenDescriptor::with_size(1920, 1080));
        let frame = encode_message(&msg);
        assert_eq!(&frame[..4], &18u32.to_be_bytes());
        assert_eq!(&frame[4..8], b"DINF");
        assert_eq!(
            &frame[8..],
            &[
                0x00, 0x00, // left
                0x00, 0x00, // top
                0x07, 0x80, // 1920
                0x04, 0x38, // 1080
                0x00, 0x00, // warp
                0x00, 0x00, // mouse x
                0x00, 0x00, // mouse y
            ]
        );
        assert_eq!(round_trip(&msg), msg);
    }

    // ── Zero-payload opcodes ─────────────────────────────────────────────────

    #[test]
    fn test_zero_payload_opcodes_round_trip() {
        for msg in [
            Message::QueryInfo,
            Message::InfoAck,
            Message::KeepAlive,
            Message::Noop,
            Message::Close,
            Message::Leave,
            Message::ResetOptions,
            Message::ErrorBad,
            Message::ErrorBusy,
            Message::ErrorUnknown,
        ] {
            let frame = encode_message(&msg);
            assert_eq!(frame.len(), 8, "{msg:?} must be exactly len + opcode");
            assert_eq!(round_trip(&msg), msg);
        }
    }

    #[test]
    fn test_keep_alive_frame_is_documented_bytes() {
        assert_eq!(encode_message(&Message::KeepAlive), b"\x00\x00\x00\x04CALV");
    }

    // ── Keyboard ─────────────────────────────────────────────────────────────

    #[test]
    fn test_key_down_decodes_documented_payload() {
        // id = 'a', no modifiers, physical key 0x26
        let frame = b"DKDN\x00\x61\x00\x00\x00\x26";
        let msg = decode_frame(frame).unwrap();
        assert_eq!(
            msg,
            Message::KeyDown {
                id: 0x61,
                mask: ModifierMask(0),
                button: 0x26,
            }
        );
    }

    #[test]
    fn test_key_repeat_tolerates_trailing_language_code() {
        // v1.8 servers append a language string after the four u16 fields.
        let frame = b"DKRP\x00\x61\x00\x00\x00\x03\x00\x1e\x00\x00\x00\x02en";
        let msg = decode_frame(frame).unwrap();
        assert_eq!(
            msg,
            Message::KeyRepeat {
                id: 0x61,
                mask: ModifierMask(0),
                count: 3,
                button: 0x1e,
            }
        );
    }

    #[test]
    fn test_key_down_lang_round_trip() {
        let msg = Message::KeyDownLang {
            id: 0x61,
            mask: ModifierMask(ModifierMask::SHIFT),
            button: 0x1e,
            language: "en".to_string(),
        };
        assert_eq!(round_trip(&msg), msg);
    }

    #[test]
    fn test_key_up_truncated_payload_is_malformed() {
        let err = decode_frame(b"DKUP\x00\x61\x00").unwrap_err();
        assert_eq!(err.opcode, "DKUP");
    }

    // ── Mouse ────────────────────────────────────────────────────────────────

    #[test]
    fn test_mouse_move_round_trip_with_negative_coordinates() {
        let msg = Message::MouseMove { x: -1, y: -32768 };
        assert_eq!(round_trip(&msg), msg);
    }

    #[test]
    fn test_mouse_buttons_round_trip() {
        for n in 1..=5i8 {
            assert_eq!(round_trip(&Message::MouseDown { button: n }), Message::MouseDown { button: n });
            assert_eq!(round_trip(&Message::MouseUp { button: n }), Message::MouseUp { button: n });
        }
    }

    #[test]
    fn test_mouse_wheel_round_trip() {
        let msg = Message::MouseWheel { x: -120, y: 240 };
        assert_eq!(round_trip(&msg), msg);
    }

    #[test]
    fn test_enter_round_trip() {
        let msg = Message::Enter {
            x: 0,
            y: 540,
            sequence: 7,
            mask: ModifierMask(ModifierMask::NUM_LOCK),
        };
        assert_eq!(round_trip(&msg), msg);
    }

    // ── Data messages ────────────────────────────────────────────────────────

    #[test]
    fn test_set_options_round_trip() {
        let msg = Message::SetOptions(vec![1, 1, 2, 0]);
        assert_eq!(round_trip(&msg), msg);
    }

    #[test]
    fn test_set_options_count_overrun_is_malformed() {
        // Claims 8 u32s but carries none.
        let err = decode_frame(b"DSOP\x00\x00\x00\x08").unwrap_err();
        assert_eq!(err.opcode, "DSOP");
    }

    #[test]
    fn test_clipboard_round_trip() {
        let msg = Message::Clipboard {
            id: 0,
            sequence: 1,
            mark: 0,
            data: b"Hello World".to_vec(),
        };
        assert_eq!(round_trip(&msg), msg);
    }

    #[test]
    fn test_incompatible_version_round_trip() {
        let msg = Message::ErrorIncompatible { major: 2, minor: 1 };
        assert_eq!(round_trip(&msg), msg);
    }

    // ── Unknown opcodes ──────────────────────────────────────────────────────

    #[test]
    fn test_unknown_opcode_decodes_as_opaque() {
        let msg = decode_frame(b"LSYN\x00\x00\x00\x02en").unwrap();
        assert_eq!(
            msg,
            Message::Opaque {
                opcode: *b"LSYN",
                payload: b"\x00\x00\x00\x02en".to_vec(),
            }
        );
    }

    #[test]
    fn test_short_non_greeting_frame_is_malformed() {
        assert!(decode_frame(b"QI").is_err());
    }
}
