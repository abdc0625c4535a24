//! Linux kernel input event codes for the keys and buttons this client can
//! inject.
//!
//! The numeric values are the stable `input-event-codes.h` ABI constants
//! (`KEY_*`, `BTN_*`).  They are mirrored here so the protocol core stays
//! free of OS bindings; the client's uinput backend converts an
//! [`EventCode`] into its evdev representation at the injection boundary.

use serde::{Deserialize, Serialize};

/// A kernel `EV_KEY` event code (`KEY_*` or `BTN_*` value).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EventCode(pub u16);

impl EventCode {
    // Row 0: escape, digits, editing
    pub const KEY_ESC: EventCode = EventCode(1);
    pub const KEY_1: EventCode = EventCode(2);
    pub const KEY_2: EventCode = EventCode(3);
    pub const KEY_3: EventCode = EventCode(4);
    pub const KEY_4: EventCode = EventCode(5);
    pub const KEY_5: EventCode = EventCode(6);
    pub const KEY_6: EventCode = EventCode(7);
    pub const KEY_7: EventCode = EventCode(8);
    pub const KEY_8: EventCode = EventCode(9);
    pub const KEY_9: EventCode = EventCode(10);
    pub const KEY_0: EventCode = EventCode(11);
    pub const KEY_MINUS: EventCode = EventCode(12);
    pub const KEY_EQUAL: EventCode = EventCode(13);
    pub const KEY_BACKSPACE: EventCode = EventCode(14);
    pub const KEY_TAB: EventCode = EventCode(15);

    // Letters
    pub const KEY_Q: EventCode = EventCode(16);
    pub const KEY_W: EventCode = EventCode(17);
    pub const KEY_E: EventCode = EventCode(18);
    pub const KEY_R: EventCode = EventCode(19);
    pub const KEY_T: EventCode = EventCode(20);
    pub const KEY_Y: EventCode = EventCode(21);
    pub const KEY_U: EventCode = EventCode(22);
    pub const KEY_I: EventCode = EventCode(23);
    pub const KEY_O: EventCode = EventCode(24);
    pub const KEY_P: EventCode = EventCode(25);
    pub const KEY_LEFTBRACE: EventCode = EventCode(26);
    pub const KEY_RIGHTBRACE: EventCode = EventCode(27);
    pub const KEY_ENTER: EventCode = EventCode(28);
    pub const KEY_LEFTCTRL: EventCode = EventCode(29);
    pub const KEY_A: EventCode = EventCode(30);
    pub const KEY_S: EventCode = EventCode(31);
    pub const KEY_D: EventCode = EventCode(32);
    pub const KEY_F: EventCode = EventCode(33);
    pub const KEY_G: EventCode = EventCode(34);
    pub const KEY_H: EventCode = EventCode(35);
    pub const KEY_J: EventCode = EventCode(36);
    pub const KEY_K: EventCode = EventCode(37);
    pub const KEY_L: EventCode = EventCode(38);
    pub const KEY_SEMICOLON: EventCode = EventCode(39);
    pub const KEY_APOSTROPHE: EventCode = EventCode(40);
    pub const KEY_GRAVE: EventCode = EventCode(41);
    pub const KEY_LEFTSHIFT: EventCode = EventCode(42);
    pub const KEY_BACKSLASH: EventCode = EventCode(43);
    pub const KEY_Z: EventCode = EventCode(44);
    pub const KEY_X: EventCode = EventCode(45);
    pub const KEY_C: EventCode = EventCode(46);
    pub const KEY_V: EventCode = EventCode(47);
    pub const KEY_B: EventCode = EventCode(48);
    pub const KEY_N: EventCode = EventCode(49);
    pub const KEY_M: EventCode = EventCode(50);
    pub const KEY_COMMA: EventCode = EventCode(51);
    pub const KEY_DOT: EventCode = EventCode(52);
    pub const KEY_SLASH: EventCode = EventCode(53);
    pub const KEY_RIGHTSHIFT: EventCode = EventCode(54);
    pub const KEY_KPASTERISK: EventCode = EventCode(55);
    pub const KEY_LEFTALT: EventCode = EventCode(56);
    pub const KEY_SPACE: EventCode = EventCode(57);
    pub const KEY_CAPSLOCK: EventCode = EventCode(58);

    // Function row
    pub const KEY_F1: EventCode = EventCode(59);
    pub const KEY_F2: EventCode = EventCode(60);
    pub const KEY_F3: EventCode = EventCode(61);
    pub const KEY_F4: EventCode = EventCode(62);
    pub const KEY_F5: EventCode = EventCode(63);
    pub const KEY_F6: EventCode = EventCode(64);
    pub const KEY_F7: EventCode = EventCode(65);
    pub const KEY_F8: EventCode = EventCode(66);
    pub const KEY_F9: EventCode = EventCode(67);
    pub const KEY_F10: EventCode = EventCode(68);
    pub const KEY_F11: EventCode = EventCode(87);
    pub const KEY_F12: EventCode = EventCode(88);

    // Keypad
    pub const KEY_NUMLOCK: EventCode = EventCode(69);
    pub const KEY_SCROLLLOCK: EventCode = EventCode(70);
    pub const KEY_KP7: EventCode = EventCode(71);
    pub const KEY_KP8: EventCode = EventCode(72);
    pub const KEY_KP9: EventCode = EventCode(73);
    pub const KEY_KPMINUS: EventCode = EventCode(74);
    pub const KEY_KP4: EventCode = EventCode(75);
    pub const KEY_KP5: EventCode = EventCode(76);
    pub const KEY_KP6: EventCode = EventCode(77);
    pub const KEY_KPPLUS: EventCode = EventCode(78);
    pub const KEY_KP1: EventCode = EventCode(79);
    pub const KEY_KP2: EventCode = EventCode(80);
    pub const KEY_KP3: EventCode = EventCode(81);
    pub const KEY_KP0: EventCode = EventCode(82);
    pub const KEY_KPDOT: EventCode = EventCode(83);
    pub const KEY_KPENTER: EventCode = EventCode(96);
    pub const KEY_KPSLASH: EventCode = EventCode(98);

    // Navigation cluster and the rest
    pub const KEY_RIGHTCTRL: EventCode = EventCode(97);
    pub const KEY_SYSRQ: EventCode = EventCode(99);
    pub const KEY_RIGHTALT: EventCode = EventCode(100);
    pub const KEY_HOME: EventCode = EventCode(102);
    pub const KEY_UP: EventCode = EventCode(103);
    pub const KEY_PAGEUP: EventCode = EventCode(104);
    pub const KEY_LEFT: EventCode = EventCode(105);
    pub const KEY_RIGHT: EventCode = EventCode(106);
    pub const KEY_END: EventCode = EventCode(107);
    pub const KEY_DOWN: EventCode = EventCode(108);
    pub const KEY_PAGEDOWN: EventCode = EventCode(109);
    pub const KEY_INSERT: EventCode = EventCode(110);
    pub const KEY_DELETE: EventCode = EventCode(111);
    pub const KEY_PAUSE: EventCode = EventCode(119);
    pub const KEY_LEFTMETA: EventCode = EventCode(125);
    pub const KEY_RIGHTMETA: EventCode = EventCode(126);
    pub const KEY_COMPOSE: EventCode = EventCode(127);

    // Mouse buttons
    pub const BTN_LEFT: EventCode = EventCode(0x110);
    pub const BTN_RIGHT: EventCode = EventCode(0x111);
    pub const BTN_MIDDLE: EventCode = EventCode(0x112);
    pub const BTN_SIDE: EventCode = EventCode(0x113);
    pub const BTN_EXTRA: EventCode = EventCode(0x114);

    /// The raw kernel event code value.
    pub fn raw(self) -> u16 {
        self.0
    }

    /// `true` for the `BTN_*` range used by pointer devices.
    pub fn is_button(self) -> bool {
        (0x100..0x160).contains(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_range_classification() {
        assert!(EventCode::BTN_LEFT.is_button());
        assert!(EventCode::BTN_EXTRA.is_button());
        assert!(!EventCode::KEY_A.is_button());
        assert!(!EventCode::KEY_COMPOSE.is_button());
    }

    #[test]
    fn test_raw_values_match_kernel_abi() {
        assert_eq!(EventCode::KEY_A.raw(), 30);
        assert_eq!(EventCode::KEY_ENTER.raw(), 28);
        assert_eq!(EventCode::KEY_KPENTER.raw(), 96);
        assert_eq!(EventCode::BTN_LEFT.raw(), 0x110);
    }
}
