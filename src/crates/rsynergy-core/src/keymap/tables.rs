//! The master key table and its satellite tables.
//!
//! Every key the client can inject has exactly one row here carrying all
//! four numberings:
//!
//! | column  | namespace                                            |
//! |---------|------------------------------------------------------|
//! | vk      | platform-neutral [`VirtualKey`] pivot                |
//! | synergy | Synergy key ID (printable ASCII, or X11 keysym with the high byte folded to `0xEF`) |
//! | hid     | USB HID usage on the keyboard/keypad page (0x07)     |
//! | code    | Linux kernel event code                              |
//!
//! The per-direction lookup maps are derived from this single table at
//! [`KeyCodeTables`](super::KeyCodeTables) construction, which is what
//! makes the forward/inverse round-trip property hold by construction.
//!
//! Two satellite tables cover what a single-row-per-key model cannot:
//!
//! - `SYNERGY_ALIASES`: additional Synergy IDs that land on an existing
//!   row.  Servers transmit the *translated* keysym, so `A` (0x41) and
//!   `!` (0x21) both arrive instead of the physical `a`/`1`; these fold
//!   back onto the physical key, relying on the modifier keys being
//!   forwarded as their own press events.
//! - `MASKED_OVERRIDES`: the handful of IDs whose target key depends on a
//!   modifier bit in the event mask (AltGr symbols on EU layouts).

use super::ecodes::EventCode;
use super::vk::VirtualKey;
use crate::protocol::messages::ModifierMask;

pub(super) struct KeyEntry {
    pub vk: VirtualKey,
    pub synergy: u16,
    pub hid: u16,
    pub code: EventCode,
}

macro_rules! row {
    ($vk:ident, $synergy:expr, $hid:expr, $code:ident) => {
        KeyEntry {
            vk: VirtualKey::$vk,
            synergy: $synergy,
            hid: $hid,
            code: EventCode::$code,
        }
    };
}

pub(super) const MASTER: &[KeyEntry] = &[
    // Letters: Synergy sends the lowercase ASCII keysym.
    row!(A, 0x61, 0x04, KEY_A),
    row!(B, 0x62, 0x05, KEY_B),
    row!(C, 0x63, 0x06, KEY_C),
    row!(D, 0x64, 0x07, KEY_D),
    row!(E, 0x65, 0x08, KEY_E),
    row!(F, 0x66, 0x09, KEY_F),
    row!(G, 0x67, 0x0A, KEY_G),
    row!(H, 0x68, 0x0B, KEY_H),
    row!(I, 0x69, 0x0C, KEY_I),
    row!(J, 0x6A, 0x0D, KEY_J),
    row!(K, 0x6B, 0x0E, KEY_K),
    row!(L, 0x6C, 0x0F, KEY_L),
    row!(M, 0x6D, 0x10, KEY_M),
    row!(N, 0x6E, 0x11, KEY_N),
    row!(O, 0x6F, 0x12, KEY_O),
    row!(P, 0x70, 0x13, KEY_P),
    row!(Q, 0x71, 0x14, KEY_Q),
    row!(R, 0x72, 0x15, KEY_R),
    row!(S, 0x73, 0x16, KEY_S),
    row!(T, 0x74, 0x17, KEY_T),
    row!(U, 0x75, 0x18, KEY_U),
    row!(V, 0x76, 0x19, KEY_V),
    row!(W, 0x77, 0x1A, KEY_W),
    row!(X, 0x78, 0x1B, KEY_X),
    row!(Y, 0x79, 0x1C, KEY_Y),
    row!(Z, 0x7A, 0x1D, KEY_Z),
    // Digit row
    row!(Digit1, 0x31, 0x1E, KEY_1),
    row!(Digit2, 0x32, 0x1F, KEY_2),
    row!(Digit3, 0x33, 0x20, KEY_3),
    row!(Digit4, 0x34, 0x21, KEY_4),
    row!(Digit5, 0x35, 0x22, KEY_5),
    row!(Digit6, 0x36, 0x23, KEY_6),
    row!(Digit7, 0x37, 0x24, KEY_7),
    row!(Digit8, 0x38, 0x25, KEY_8),
    row!(Digit9, 0x39, 0x26, KEY_9),
    row!(Digit0, 0x30, 0x27, KEY_0),
    // Whitespace and editing
    row!(Enter, 0xEF0D, 0x28, KEY_ENTER),
    row!(Escape, 0xEF1B, 0x29, KEY_ESC),
    row!(Backspace, 0xEF08, 0x2A, KEY_BACKSPACE),
    row!(Tab, 0xEF09, 0x2B, KEY_TAB),
    row!(Space, 0x20, 0x2C, KEY_SPACE),
    // Punctuation
    row!(Minus, 0x2D, 0x2D, KEY_MINUS),
    row!(Equal, 0x3D, 0x2E, KEY_EQUAL),
    row!(LeftBrace, 0x5B, 0x2F, KEY_LEFTBRACE),
    row!(RightBrace, 0x5D, 0x30, KEY_RIGHTBRACE),
    row!(Backslash, 0x5C, 0x31, KEY_BACKSLASH),
    row!(Semicolon, 0x3B, 0x33, KEY_SEMICOLON),
    row!(Apostrophe, 0x27, 0x34, KEY_APOSTROPHE),
    row!(Grave, 0x60, 0x35, KEY_GRAVE),
    row!(Comma, 0x2C, 0x36, KEY_COMMA),
    row!(Dot, 0x2E, 0x37, KEY_DOT),
    row!(Slash, 0x2F, 0x38, KEY_SLASH),
    row!(CapsLock, 0xEFE5, 0x39, KEY_CAPSLOCK),
    // Function row
    row!(F1, 0xEFBE, 0x3A, KEY_F1),
    row!(F2, 0xEFBF, 0x3B, KEY_F2),
    row!(F3, 0xEFC0, 0x3C, KEY_F3),
    row!(F4, 0xEFC1, 0x3D, KEY_F4),
    row!(F5, 0xEFC2, 0x3E, KEY_F5),
    row!(F6, 0xEFC3, 0x3F, KEY_F6),
    row!(F7, 0xEFC4, 0x40, KEY_F7),
    row!(F8, 0xEFC5, 0x41, KEY_F8),
    row!(F9, 0xEFC6, 0x42, KEY_F9),
    row!(F10, 0xEFC7, 0x43, KEY_F10),
    row!(F11, 0xEFC8, 0x44, KEY_F11),
    row!(F12, 0xEFC9, 0x45, KEY_F12),
    // Navigation cluster
    row!(PrintScreen, 0xEF61, 0x46, KEY_SYSRQ),
    row!(ScrollLock, 0xEF14, 0x47, KEY_SCROLLLOCK),
    row!(Pause, 0xEF13, 0x48, KEY_PAUSE),
    row!(Insert, 0xEF63, 0x49, KEY_INSERT),
    row!(Home, 0xEF50, 0x4A, KEY_HOME),
    row!(PageUp, 0xEF55, 0x4B, KEY_PAGEUP),
    row!(Delete, 0xEFFF, 0x4C, KEY_DELETE),
    row!(End, 0xEF57, 0x4D, KEY_END),
    row!(PageDown, 0xEF56, 0x4E, KEY_PAGEDOWN),
    row!(Right, 0xEF53, 0x4F, KEY_RIGHT),
    row!(Left, 0xEF51, 0x50, KEY_LEFT),
    row!(Down, 0xEF54, 0x51, KEY_DOWN),
    row!(Up, 0xEF52, 0x52, KEY_UP),
    // Keypad
    row!(NumLock, 0xEF7F, 0x53, KEY_NUMLOCK),
    row!(KpDivide, 0xEFAF, 0x54, KEY_KPSLASH),
    row!(KpMultiply, 0xEFAA, 0x55, KEY_KPASTERISK),
    row!(KpSubtract, 0xEFAD, 0x56, KEY_KPMINUS),
    row!(KpAdd, 0xEFAB, 0x57, KEY_KPPLUS),
    row!(KpEnter, 0xEF8D, 0x58, KEY_KPENTER),
    row!(Kp1, 0xEFB1, 0x59, KEY_KP1),
    row!(Kp2, 0xEFB2, 0x5A, KEY_KP2),
    row!(Kp3, 0xEFB3, 0x5B, KEY_KP3),
    row!(Kp4, 0xEFB4, 0x5C, KEY_KP4),
    row!(Kp5, 0xEFB5, 0x5D, KEY_KP5),
    row!(Kp6, 0xEFB6, 0x5E, KEY_KP6),
    row!(Kp7, 0xEFB7, 0x5F, KEY_KP7),
    row!(Kp8, 0xEFB8, 0x60, KEY_KP8),
    row!(Kp9, 0xEFB9, 0x61, KEY_KP9),
    row!(Kp0, 0xEFB0, 0x62, KEY_KP0),
    row!(KpDecimal, 0xEFAE, 0x63, KEY_KPDOT),
    row!(Menu, 0xEF67, 0x65, KEY_COMPOSE),
    // Modifiers
    row!(ShiftLeft, 0xEFE1, 0xE1, KEY_LEFTSHIFT),
    row!(ShiftRight, 0xEFE2, 0xE5, KEY_RIGHTSHIFT),
    row!(ControlLeft, 0xEFE3, 0xE0, KEY_LEFTCTRL),
    row!(ControlRight, 0xEFE4, 0xE4, KEY_RIGHTCTRL),
    row!(AltLeft, 0xEFE9, 0xE2, KEY_LEFTALT),
    row!(AltRight, 0xEFEA, 0xE6, KEY_RIGHTALT),
    row!(SuperLeft, 0xEFEB, 0xE3, KEY_LEFTMETA),
    row!(SuperRight, 0xEFEC, 0xE7, KEY_RIGHTMETA),
];

/// Extra Synergy IDs that resolve to an existing master row.
///
/// The server transmits translated keysyms: `Shift+1` arrives as `!`, a
/// letter with Shift held arrives uppercase, and keypad keys arrive as
/// their navigation keysyms when the server's NumLock is off.  All of them
/// fold back onto the physical key; the modifier state travels separately
/// as its own key events.
pub(super) const SYNERGY_ALIASES: &[(u16, VirtualKey)] = &[
    // Uppercase letters
    (0x41, VirtualKey::A),
    (0x42, VirtualKey::B),
    (0x43, VirtualKey::C),
    (0x44, VirtualKey::D),
    (0x45, VirtualKey::E),
    (0x46, VirtualKey::F),
    (0x47, VirtualKey::G),
    (0x48, VirtualKey::H),
    (0x49, VirtualKey::I),
    (0x4A, VirtualKey::J),
    (0x4B, VirtualKey::K),
    (0x4C, VirtualKey::L),
    (0x4D, VirtualKey::M),
    (0x4E, VirtualKey::N),
    (0x4F, VirtualKey::O),
    (0x50, VirtualKey::P),
    (0x51, VirtualKey::Q),
    (0x52, VirtualKey::R),
    (0x53, VirtualKey::S),
    (0x54, VirtualKey::T),
    (0x55, VirtualKey::U),
    (0x56, VirtualKey::V),
    (0x57, VirtualKey::W),
    (0x58, VirtualKey::X),
    (0x59, VirtualKey::Y),
    (0x5A, VirtualKey::Z),
    // Shifted symbols, US layout positions
    (0x21, VirtualKey::Digit1),    // !
    (0x22, VirtualKey::Apostrophe), // "
    (0x23, VirtualKey::Digit3),    // #
    (0x24, VirtualKey::Digit4),    // $
    (0x25, VirtualKey::Digit5),    // %
    (0x26, VirtualKey::Digit7),    // &
    (0x28, VirtualKey::Digit9),    // (
    (0x29, VirtualKey::Digit0),    // )
    (0x2A, VirtualKey::Digit8),    // *
    (0x2B, VirtualKey::Equal),     // +
    (0x3A, VirtualKey::Semicolon), // :
    (0x3C, VirtualKey::Comma),     // <
    (0x3E, VirtualKey::Dot),       // >
    (0x3F, VirtualKey::Slash),     // ?
    (0x40, VirtualKey::Digit2),    // @
    (0x5E, VirtualKey::Digit6),    // ^
    (0x5F, VirtualKey::Minus),     // _
    (0x7B, VirtualKey::LeftBrace), // {
    (0x7C, VirtualKey::Backslash), // |
    (0x7D, VirtualKey::RightBrace), // }
    (0x7E, VirtualKey::Grave),     // ~
    // Meta keysyms: treated as Super
    (0xEFE7, VirtualKey::SuperLeft),
    (0xEFE8, VirtualKey::SuperRight),
    // Keypad navigation keysyms (server NumLock off)
    (0xEF95, VirtualKey::Kp7), // KP_Home
    (0xEF96, VirtualKey::Kp4), // KP_Left
    (0xEF97, VirtualKey::Kp8), // KP_Up
    (0xEF98, VirtualKey::Kp6), // KP_Right
    (0xEF99, VirtualKey::Kp2), // KP_Down
    (0xEF9A, VirtualKey::Kp9), // KP_Prior
    (0xEF9B, VirtualKey::Kp3), // KP_Next
    (0xEF9C, VirtualKey::Kp1), // KP_End
    (0xEF9D, VirtualKey::Kp5), // KP_Begin
    (0xEF9E, VirtualKey::Kp0), // KP_Insert
    (0xEF9F, VirtualKey::KpDecimal), // KP_Delete
];

/// Mask-sensitive overrides, consulted before the default tables.
///
/// When the event mask carries the listed modifier bit, the ID resolves to
/// the override key instead of its default row.  The entries are the AltGr
/// productions of the German layout, where the symbol lives on a letter
/// key rather than the digit row.
pub(super) const MASKED_OVERRIDES: &[(u16, u16, VirtualKey)] = &[
    (0x40, ModifierMask::ALT_GR, VirtualKey::Q), // AltGr+Q = @
    (0xB5, ModifierMask::ALT_GR, VirtualKey::M), // AltGr+M = µ
];

/// Synergy mouse button number → kernel button code.
///
/// Deskflow numbering: side/extra for 4/5.  Synergy 1.x builds disagree on
/// 4/5; see the design notes before claiming interop there.
pub(super) const MOUSE_BUTTONS: &[(i8, EventCode)] = &[
    (1, EventCode::BTN_LEFT),
    (2, EventCode::BTN_MIDDLE),
    (3, EventCode::BTN_RIGHT),
    (4, EventCode::BTN_SIDE),
    (5, EventCode::BTN_EXTRA),
];
