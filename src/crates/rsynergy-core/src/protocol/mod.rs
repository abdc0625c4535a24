//! Wire protocol: message types, binary codec, stream parser.
//!
//! Every message on the wire is framed as
//!
//! ```text
//! [len:u32][opcode:4 ASCII bytes][payload]
//! ```
//!
//! where `len` covers the opcode plus the payload and all multi-byte
//! integers are big-endian.  Strings inside payloads are length-prefixed
//! with a `u32` byte count.  The server greeting (`"Synergy" maj min`) and
//! the client reply use the literal 7-byte protocol name in place of a
//! 4-byte opcode; the codec special-cases them.
//!
//! # Sub-modules
//!
//! - **`messages`** – Typed message enum and payload structs.
//! - **`codec`**    – Per-opcode binary encoding and decoding.
//! - **`parser`**   – Buffered byte-stream → whole-message iterator.

pub mod codec;
pub mod messages;
pub mod parser;

pub use codec::{decode_frame, encode_message, DecodeError};
pub use messages::*;
pub use parser::{ProtocolError, StreamParser, MAX_MESSAGE_LEN};
