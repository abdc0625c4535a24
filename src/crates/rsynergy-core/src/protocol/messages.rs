//! All Synergy/Barrier protocol message types understood by the client.
//!
//! Opcodes are four ASCII bytes on the wire (`QINF`, `DMMV`, ...).  The one
//! exception is the greeting pair, whose "opcode" is the literal protocol
//! name `Synergy` or `Barrier` (7 bytes, fixed, not length-prefixed).
//!
//! Payload layouts follow the Barrier/Deskflow continuation of the Synergy
//! 1.x protocol.  Directions are noted per variant; messages this client
//! never sends still get an encoder so the codec round-trips in tests.

use serde::{Deserialize, Serialize};

// ── Protocol constants ────────────────────────────────────────────────────────

/// Protocol major version advertised in the client greeting.
pub const PROTOCOL_MAJOR: u16 = 1;

/// Protocol minor version advertised in the client greeting.
pub const PROTOCOL_MINOR: u16 = 6;

/// The two greeting names accepted from a server.  `Barrier` is what
/// Barrier/Deskflow servers send; `Synergy` is kept for 1.x compatibility.
pub const GREETING_NAMES: [&str; 2] = ["Synergy", "Barrier"];

/// Default CALV interval on the server side.  The watchdog fires after
/// three missed intervals.
pub const KEEP_ALIVE_INTERVAL_SECS: u64 = 3;

// ── Modifier mask ─────────────────────────────────────────────────────────────

/// Synergy modifier-key bitmask carried in key events and CINN.
///
/// Bit layout is fixed by the protocol; the lock bits live in the high
/// nibble region so they never collide with the held-modifier bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModifierMask(pub u16);

impl ModifierMask {
    pub const SHIFT: u16 = 0x0001;
    pub const CONTROL: u16 = 0x0002;
    pub const ALT: u16 = 0x0004;
    pub const META: u16 = 0x0008;
    pub const SUPER: u16 = 0x0010;
    pub const ALT_GR: u16 = 0x0020;
    pub const LEVEL5_LOCK: u16 = 0x0040;
    pub const CAPS_LOCK: u16 = 0x1000;
    pub const NUM_LOCK: u16 = 0x2000;
    pub const SCROLL_LOCK: u16 = 0x4000;

    /// Returns `true` if the given mask bit is set.
    pub fn has(self, bit: u16) -> bool {
        self.0 & bit != 0
    }
}

// ── Screen descriptor ─────────────────────────────────────────────────────────

/// Screen information sent in the `DINF` reply.
///
/// `warp` is obsolete in the protocol and always encoded as 0; the mouse
/// position fields report where the cursor was when the info was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenDescriptor {
    /// Left edge coordinate of this screen.
    pub left: i16,
    /// Top edge coordinate of this screen.
    pub top: i16,
    /// Width in pixels.
    pub width: u16,
    /// Height in pixels.
    pub height: u16,
    /// Obsolete warp-zone size; always 0.
    pub warp: u16,
    /// Mouse X position at the time the descriptor was built.
    pub mouse_x: i16,
    /// Mouse Y position at the time the descriptor was built.
    pub mouse_y: i16,
}

impl ScreenDescriptor {
    /// A descriptor at origin with the given dimensions and the cursor
    /// parked at (0, 0).
    pub fn with_size(width: u16, height: u16) -> Self {
        Self {
            left: 0,
            top: 0,
            width,
            height,
            warp: 0,
            mouse_x: 0,
            mouse_y: 0,
        }
    }
}

// ── Message enum ──────────────────────────────────────────────────────────────

/// Every protocol message this client understands, discriminated by opcode.
///
/// Unrecognised opcodes decode to [`Message::Opaque`] so that server-side
/// protocol extensions never kill a session at decode time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Server greeting: `"Synergy" || major || minor`.  S→C.
    Hello {
        /// Protocol name the server announced (`Synergy` or `Barrier`).
        protocol_name: String,
        major: u16,
        minor: u16,
    },
    /// Client greeting reply: adds the client name.  C→S.
    HelloBack {
        protocol_name: String,
        major: u16,
        minor: u16,
        name: String,
    },

    // ── Control ──────────────────────────────────────────────────────────
    /// `QINF`: query screen information.  S→C; answered with `Info`.
    QueryInfo,
    /// `DINF`: screen information.  C→S.
    Info(ScreenDescriptor),
    /// `CIAK`: screen information acknowledged.  S→C.
    InfoAck,
    /// `CALV`: keep-alive.  Both directions; the client only echoes.
    KeepAlive,
    /// `CNOP`: no-op.
    Noop,
    /// `CBYE`: close connection gracefully.  S→C.
    Close,
    /// `CINN`: cursor entered this screen at (x, y).  S→C.
    Enter {
        x: i16,
        y: i16,
        sequence: u32,
        mask: ModifierMask,
    },
    /// `COUT`: cursor left this screen.  S→C.
    Leave,
    /// `CROP`: reset options to defaults.  S→C.
    ResetOptions,
    /// `CSEC`: primary screensaver started/stopped.  S→C.
    ScreenSaver { started: bool },

    // ── Keyboard ─────────────────────────────────────────────────────────
    /// `DKDN`: key press.  `id` is the Synergy key ID (keysym derived),
    /// `button` the server-side physical key code.
    KeyDown { id: u16, mask: ModifierMask, button: u16 },
    /// `DKDL`: key press with a trailing language code (v1.8+).  Treated
    /// as `KeyDown`; the language tag is informational only.
    KeyDownLang {
        id: u16,
        mask: ModifierMask,
        button: u16,
        language: String,
    },
    /// `DKRP`: key auto-repeat.
    KeyRepeat {
        id: u16,
        mask: ModifierMask,
        count: u16,
        button: u16,
    },
    /// `DKUP`: key release.
    KeyUp { id: u16, mask: ModifierMask, button: u16 },

    // ── Mouse ────────────────────────────────────────────────────────────
    /// `DMDN`: mouse button press.  1=left, 2=middle, 3=right, 4/5=side.
    MouseDown { button: i8 },
    /// `DMUP`: mouse button release.
    MouseUp { button: i8 },
    /// `DMMV`: absolute mouse move in screen coordinates.
    MouseMove { x: i16, y: i16 },
    /// `DMRM`: relative mouse move.
    MouseRelMove { dx: i16, dy: i16 },
    /// `DMWM`: mouse wheel; ±120 per detent.
    MouseWheel { x: i16, y: i16 },

    // ── Data ─────────────────────────────────────────────────────────────
    /// `DSOP`: set options; alternating option-id/value pairs.  Stored.
    SetOptions(Vec<u32>),
    /// `CCLP`: clipboard grab notification.  Accepted, ignored.
    ClipboardGrab { id: u8, sequence: u32 },
    /// `DCLP`: clipboard data.  Accepted, ignored.
    Clipboard {
        id: u8,
        sequence: u32,
        mark: u8,
        data: Vec<u8>,
    },

    // ── Errors ───────────────────────────────────────────────────────────
    /// `EBAD`: protocol violation.  Terminates the session.
    ErrorBad,
    /// `EBSY`: client name already in use.  Terminates the session.
    ErrorBusy,
    /// `EUNK`: client name unknown to the server.  Terminates the session.
    ErrorUnknown,
    /// `EICV`: incompatible protocol versions.  Terminates the session.
    ErrorIncompatible { major: u16, minor: u16 },

    /// Any opcode this client does not recognise.  Logged at trace and
    /// dropped by the dispatcher.
    Opaque { opcode: [u8; 4], payload: Vec<u8> },
}

impl Message {
    /// The wire opcode for this message, for logging and encoding.
    ///
    /// Greeting messages return the protocol-name bytes of the `Synergy`
    /// spelling; the encoder substitutes the actual announced name.
    pub fn opcode(&self) -> &'static str {
        match self {
            Message::Hello { .. } => "Hello",
            Message::HelloBack { .. } => "HelloBack",
            Message::QueryInfo => "QINF",
            Message::Info(_) => "DINF",
            Message::InfoAck => "CIAK",
            Message::KeepAlive => "CALV",
            Message::Noop => "CNOP",
            Message::Close => "CBYE",
            Message::Enter { .. } => "CINN",
            Message::Leave => "COUT",
            Message::ResetOptions => "CROP",
            Message::ScreenSaver { .. } => "CSEC",
            Message::KeyDown { .. } => "DKDN",
            Message::KeyDownLang { .. } => "DKDL",
            Message::KeyRepeat { .. } => "DKRP",
            Message::KeyUp { .. } => "DKUP",
            Message::MouseDown { .. } => "DMDN",
            Message::MouseUp { .. } => "DMUP",
            Message::MouseMove { .. } => "DMMV",
            Message::MouseRelMove { .. } => "DMRM",
            Message::MouseWheel { .. } => "DMWM",
            Message::SetOptions(_) => "DSOP",
            Message::ClipboardGrab { .. } => "CCLP",
            Message::Clipboard { .. } => "DCLP",
            Message::ErrorBad => "EBAD",
            Message::ErrorBusy => "EBSY",
            Message::ErrorUnknown => "EUNK",
            Message::ErrorIncompatible { .. } => "EICV",
            Message::Opaque { .. } => "????",
        }
    }

    /// `true` for the error opcodes that must terminate the session.
    pub fn is_fatal_error(&self) -> bool {
        matches!(
            self,
            Message::ErrorBad
                | Message::ErrorBusy
                | Message::ErrorUnknown
                | Message::ErrorIncompatible { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_mask_bit_queries() {
        let mask = ModifierMask(ModifierMask::SHIFT | ModifierMask::NUM_LOCK);
        assert!(mask.has(ModifierMask::SHIFT));
        assert!(mask.has(ModifierMask::NUM_LOCK));
        assert!(!mask.has(ModifierMask::ALT_GR));
    }

    #[test]
    fn test_screen_descriptor_with_size_is_at_origin() {
        let screen = ScreenDescriptor::with_size(1920, 1080);
        assert_eq!(screen.left, 0);
        assert_eq!(screen.top, 0);
        assert_eq!(screen.width, 1920);
        assert_eq!(screen.height, 1080);
        assert_eq!(screen.warp, 0);
    }

    #[test]
    fn test_fatal_error_classification() {
        assert!(Message::ErrorBad.is_fatal_error());
        assert!(Message::ErrorBusy.is_fatal_error());
        assert!(Message::ErrorUnknown.is_fatal_error());
        assert!(Message::ErrorIncompatible { major: 2, minor: 0 }.is_fatal_error());
        assert!(!Message::KeepAlive.is_fatal_error());
        assert!(!Message::Close.is_fatal_error());
    }

    #[test]
    fn test_opcode_names_are_four_bytes_for_framed_messages() {
        for msg in [
            Message::QueryInfo,
            Message::InfoAck,
            Message::KeepAlive,
            Message::Leave,
            Message::MouseMove { x: 0, y: 0 },
        ] {
            assert_eq!(msg.opcode().len(), 4, "{msg:?}");
        }
    }
}
