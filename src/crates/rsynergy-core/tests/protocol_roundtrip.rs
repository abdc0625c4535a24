//! Integration tests for the rsynergy-core public API.
//!
//! These exercise the codec, the stream parser, and the key tables together
//! through the same surface the client binary uses.  Unit tests beside the
//! code cover the individual encode/decode functions; here the focus is on
//! the cross-cutting laws: encode→parse equality under arbitrary byte
//! splits, the documented handshake byte sequences, and the composed key
//! pipeline.

use rsynergy_core::{
    decode_frame, encode_message, EventCode, KeyCodeTables, Message, ModifierMask,
    ScreenDescriptor, StreamParser,
};

/// Encodes `msg`, runs the frame back through the decoder, and checks the
/// length prefix is exact.
fn roundtrip(msg: Message) -> Message {
    let frame = encode_message(&msg);
    let len = u32::from_be_bytes(frame[..4].try_into().unwrap()) as usize;
    assert_eq!(len + 4, frame.len(), "length prefix must cover opcode + payload");
    decode_frame(&frame[4..]).expect("decode must succeed")
}

fn representative_messages() -> Vec<Message> {
    vec![
        Message::Hello {
            protocol_name: "Barrier".to_string(),
            major: 1,
            minor: 8,
        },
        Message::HelloBack {
            protocol_name: "Synergy".to_string(),
            major: 1,
            minor: 6,
            name: "wayland-desk".to_string(),
        },
        Message::QueryInfo,
        Message::Info(ScreenDescriptor::with_size(2560, 1440)),
        Message::InfoAck,
        Message::KeepAlive,
        Message::Noop,
        Message::Close,
        Message::Enter {
            x: 0,
            y: 719,
            sequence: 3,
            mask: ModifierMask(ModifierMask::CAPS_LOCK),
        },
        Message::Leave,
        Message::ResetOptions,
        Message::ScreenSaver { started: true },
        Message::KeyDown {
            id: 0x61,
            mask: ModifierMask(0),
            button: 0x26,
        },
        Message::KeyRepeat {
            id: 0x61,
            mask: ModifierMask(0),
            count: 3,
            button: 0x26,
        },
        Message::KeyUp {
            id: 0x61,
            mask: ModifierMask(0),
            button: 0x26,
        },
        Message::KeyDownLang {
            id: 0x7A,
            mask: ModifierMask(ModifierMask::ALT_GR),
            button: 0x2C,
            language: "de".to_string(),
        },
        Message::MouseDown { button: 1 },
        Message::MouseUp { button: 5 },
        Message::MouseMove { x: -1, y: 1080 },
        Message::MouseRelMove { dx: -5, dy: 10 },
        Message::MouseWheel { x: 0, y: -240 },
        Message::SetOptions(vec![1, 1, 2, 0]),
        Message::ClipboardGrab { id: 0, sequence: 9 },
        Message::Clipboard {
            id: 1,
            sequence: 9,
            mark: 0,
            data: b"hello".to_vec(),
        },
        Message::ErrorBad,
        Message::ErrorBusy,
        Message::ErrorUnknown,
        Message::ErrorIncompatible { major: 2, minor: 0 },
        Message::Opaque {
            opcode: *b"DFTR",
            payload: vec![0x01, 0x00],
        },
    ]
}

#[test]
fn test_every_supported_message_round_trips() {
    for msg in representative_messages() {
        assert_eq!(roundtrip(msg.clone()), msg);
    }
}

#[test]
fn test_documented_handshake_byte_sequence() {
    // Server hello exactly as on the wire.
    let mut parser = StreamParser::new();
    parser.feed(b"\x00\x00\x00\x0BSynergy\x00\x01\x00\x06");
    let hello = parser.next_message().unwrap().unwrap();
    assert_eq!(
        hello,
        Message::Hello {
            protocol_name: "Synergy".to_string(),
            major: 1,
            minor: 6,
        }
    );

    // The client reply starts with the same literal name and version, then
    // the length-prefixed client name.
    let reply = encode_message(&Message::HelloBack {
        protocol_name: "Synergy".to_string(),
        major: 1,
        minor: 6,
        name: "desk".to_string(),
    });
    assert_eq!(&reply[4..15], b"Synergy\x00\x01\x00\x06");
    assert_eq!(&reply[15..19], &4u32.to_be_bytes());
    assert_eq!(&reply[19..], b"desk");
}

#[test]
fn test_whole_stream_equals_split_stream() {
    // A realistic burst: keep-alive, enter, a key press, two moves.
    let mut bytes = Vec::new();
    let burst = [
        Message::KeepAlive,
        Message::Enter {
            x: 10,
            y: 20,
            sequence: 1,
            mask: ModifierMask(0),
        },
        Message::KeyDown {
            id: 0x61,
            mask: ModifierMask(0),
            button: 0x26,
        },
        Message::MouseMove { x: 100, y: 100 },
        Message::MouseMove { x: 120, y: 120 },
    ];
    for msg in &burst {
        bytes.extend(encode_message(msg));
    }

    let collect = |parser: &mut StreamParser| {
        let mut out = Vec::new();
        while let Some(msg) = parser.next_message().unwrap() {
            out.push(msg);
        }
        out
    };

    // Whole feed.
    let mut whole = StreamParser::new();
    whole.feed(&bytes);
    let expect = collect(&mut whole);
    assert_eq!(expect.len(), burst.len());

    // Every two-way split produces the identical sequence.
    for split in 0..=bytes.len() {
        let mut parser = StreamParser::new();
        parser.feed(&bytes[..split]);
        let mut got = collect(&mut parser);
        parser.feed(&bytes[split..]);
        got.extend(collect(&mut parser));
        assert_eq!(got, expect, "split at byte {split}");
    }
}

#[test]
fn test_key_pipeline_end_to_end_for_documented_press() {
    // DKDN id=0x61 ('a'), mask=0: the composed tables must land on KEY_A.
    let tables = KeyCodeTables::new();
    let frame = encode_message(&Message::KeyDown {
        id: 0x61,
        mask: ModifierMask(0),
        button: 0x26,
    });

    let mut parser = StreamParser::new();
    parser.feed(&frame);
    match parser.next_message().unwrap().unwrap() {
        Message::KeyDown { id, mask, .. } => {
            assert_eq!(tables.synergy_to_event(id, mask), Some(EventCode::KEY_A));
        }
        other => panic!("expected KeyDown, got {other:?}"),
    }
}
