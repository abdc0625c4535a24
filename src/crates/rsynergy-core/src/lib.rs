//! # rsynergy-core
//!
//! Shared library for the rsynergy client containing the Synergy/Barrier
//! wire protocol codec, the stream parser, and the key code translation
//! tables.
//!
//! This crate has zero dependencies on OS APIs or network sockets; the
//! client binary owns all of those concerns.
//!
//! # Architecture overview
//!
//! A Synergy server drives its clients: after the greeting exchange it
//! queries the client's screen (`QINF`/`DINF`/`CIAK`) and then streams
//! keyboard and mouse events at it.  This crate defines:
//!
//! - **`protocol`** – How bytes travel over the wire.  Every message is a
//!   4-byte big-endian length prefix followed by a four-ASCII-byte opcode
//!   and an opcode-specific payload.  The greeting pair is the one
//!   exception: its "opcode" is the literal 7-byte protocol name.
//!
//! - **`keymap`** – Translation tables that convert Synergy key IDs
//!   (X11-keysym derived) through a platform-neutral virtual-key pivot and
//!   USB HID usages down to Linux kernel event codes, the values a uinput
//!   device actually injects.

pub mod keymap;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `rsynergy_core::Message` instead of `rsynergy_core::protocol::messages::Message`.
pub use keymap::{EventCode, KeyCodeTables, VirtualKey};
pub use protocol::codec::{decode_frame, encode_message, DecodeError};
pub use protocol::messages::{
    Message, ModifierMask, ScreenDescriptor, KEEP_ALIVE_INTERVAL_SECS, PROTOCOL_MAJOR,
    PROTOCOL_MINOR,
};
pub use protocol::parser::{ProtocolError, StreamParser, MAX_MESSAGE_LEN};
