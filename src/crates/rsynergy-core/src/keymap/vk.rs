//! Platform-neutral virtual key identifiers.
//!
//! A [`VirtualKey`] names a physical key position without committing to any
//! platform's numbering.  It is the pivot of the translation pipeline:
//! Synergy key IDs resolve to a `VirtualKey`, and a `VirtualKey` resolves
//! to a USB HID usage and a kernel event code.  Keeping the pivot abstract
//! means every concrete numbering lives in exactly one master table row.

use serde::{Deserialize, Serialize};

/// Logical, platform-neutral key name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VirtualKey {
    // Letters
    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,

    // Digit row
    Digit1, Digit2, Digit3, Digit4, Digit5,
    Digit6, Digit7, Digit8, Digit9, Digit0,

    // Whitespace and editing
    Enter, Escape, Backspace, Tab, Space,

    // Punctuation (US physical positions)
    Minus, Equal, LeftBrace, RightBrace, Backslash,
    Semicolon, Apostrophe, Grave, Comma, Dot, Slash,

    CapsLock,

    // Function row
    F1, F2, F3, F4, F5, F6, F7, F8, F9, F10, F11, F12,

    // Navigation cluster
    PrintScreen, ScrollLock, Pause,
    Insert, Home, PageUp, Delete, End, PageDown,
    Right, Left, Down, Up,

    // Keypad
    NumLock, KpDivide, KpMultiply, KpSubtract, KpAdd, KpEnter,
    Kp1, Kp2, Kp3, Kp4, Kp5, Kp6, Kp7, Kp8, Kp9, Kp0, KpDecimal,

    Menu,

    // Modifiers
    ShiftLeft, ShiftRight, ControlLeft, ControlRight,
    AltLeft, AltRight, SuperLeft, SuperRight,
}
