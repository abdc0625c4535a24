//! Key code translation between the four namespaces the client touches:
//! Synergy key IDs, platform-neutral virtual keys, USB HID usages, and
//! Linux kernel event codes.
//!
//! All per-direction maps are composed from the single master table in
//! [`tables`] when [`KeyCodeTables::new`] runs, so the forward/inverse
//! round-trip property holds by construction and a key is never edited in
//! three places.
//!
//! Policy on unmapped IDs: log at debug and return `None`.  The dispatcher
//! drops the event; nothing ever falls through to an arbitrary code.

pub mod ecodes;
mod tables;
pub mod vk;

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::protocol::messages::ModifierMask;

pub use ecodes::EventCode;
pub use vk::VirtualKey;

/// Composed, immutable translation tables.  Built once per session and
/// shared read-only.
#[derive(Debug)]
pub struct KeyCodeTables {
    syn_vk: HashMap<u16, VirtualKey>,
    vk_hid: HashMap<VirtualKey, u16>,
    hid_vk: HashMap<u16, VirtualKey>,
    hid_code: HashMap<u16, EventCode>,
    code_hid: HashMap<EventCode, u16>,
    vk_code: HashMap<VirtualKey, EventCode>,
    buttons: HashMap<i8, EventCode>,
}

impl KeyCodeTables {
    /// Composes the lookup maps from the master table.
    pub fn new() -> Self {
        let mut syn_vk = HashMap::new();
        let mut vk_hid = HashMap::new();
        let mut hid_vk = HashMap::new();
        let mut hid_code = HashMap::new();
        let mut code_hid = HashMap::new();
        let mut vk_code = HashMap::new();

        for entry in tables::MASTER {
            syn_vk.insert(entry.synergy, entry.vk);
            vk_hid.insert(entry.vk, entry.hid);
            hid_vk.insert(entry.hid, entry.vk);
            hid_code.insert(entry.hid, entry.code);
            code_hid.insert(entry.code, entry.hid);
            vk_code.insert(entry.vk, entry.code);
        }
        for &(synergy, vk) in tables::SYNERGY_ALIASES {
            syn_vk.insert(synergy, vk);
        }

        Self {
            syn_vk,
            vk_hid,
            hid_vk,
            hid_code,
            code_hid,
            vk_code,
            buttons: tables::MOUSE_BUTTONS.iter().copied().collect(),
        }
    }

    /// Translates a Synergy key ID under the given modifier mask to a
    /// kernel event code.
    ///
    /// Mask-sensitive overrides win when their modifier bit is set; with no
    /// relevant modifier the default mapping applies.  Returns `None` for
    /// IDs the tables do not know.
    pub fn synergy_to_event(&self, id: u16, mask: ModifierMask) -> Option<EventCode> {
        for &(ovr_id, ovr_bit, vk) in tables::MASKED_OVERRIDES {
            if ovr_id == id && mask.has(ovr_bit) {
                return self.vk_code.get(&vk).copied();
            }
        }
        let vk = match self.syn_vk.get(&id) {
            Some(vk) => *vk,
            None => {
                debug!(id = format_args!("{id:#06x}"), mask = mask.0, "unmapped synergy key id");
                return None;
            }
        };
        self.vk_code.get(&vk).copied()
    }

    /// Translates a Synergy mouse button number (1=left, 2=middle,
    /// 3=right, 4=side, 5=extra) to a kernel button code.
    pub fn mouse_button_to_event(&self, button: i8) -> Option<EventCode> {
        let code = self.buttons.get(&button).copied();
        if code.is_none() {
            debug!(button, "unmapped mouse button");
        }
        code
    }

    /// Every event code the tables can produce, for declaring the uinput
    /// device's key capabilities.
    pub fn all_known_event_codes(&self) -> BTreeSet<EventCode> {
        self.code_hid
            .keys()
            .chain(self.buttons.values())
            .copied()
            .collect()
    }

    // The per-direction accessors below exist for the round-trip property
    // and for any future capture-side use; the dispatcher itself only needs
    // `synergy_to_event`.

    pub fn vk_to_hid(&self, vk: VirtualKey) -> Option<u16> {
        self.vk_hid.get(&vk).copied()
    }

    pub fn hid_to_vk(&self, hid: u16) -> Option<VirtualKey> {
        self.hid_vk.get(&hid).copied()
    }

    pub fn hid_to_event(&self, hid: u16) -> Option<EventCode> {
        self.hid_code.get(&hid).copied()
    }

    pub fn event_to_hid(&self, code: EventCode) -> Option<u16> {
        self.code_hid.get(&code).copied()
    }
}

impl Default for KeyCodeTables {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> KeyCodeTables {
        KeyCodeTables::new()
    }

    #[test]
    fn test_lowercase_letter_maps_to_its_key() {
        let t = tables();
        assert_eq!(
            t.synergy_to_event(0x61, ModifierMask(0)),
            Some(EventCode::KEY_A)
        );
    }

    #[test]
    fn test_uppercase_alias_maps_to_same_key() {
        let t = tables();
        assert_eq!(
            t.synergy_to_event(0x41, ModifierMask(ModifierMask::SHIFT)),
            Some(EventCode::KEY_A)
        );
    }

    #[test]
    fn test_shifted_symbol_folds_to_digit_row() {
        let t = tables();
        // Shift+1 arrives as '!'
        assert_eq!(
            t.synergy_to_event(0x21, ModifierMask(ModifierMask::SHIFT)),
            Some(EventCode::KEY_1)
        );
    }

    #[test]
    fn test_altgr_override_wins_when_mask_set() {
        let t = tables();
        // '@' with AltGr held: German layout, AltGr+Q.
        assert_eq!(
            t.synergy_to_event(0x40, ModifierMask(ModifierMask::ALT_GR)),
            Some(EventCode::KEY_Q)
        );
        // '@' without AltGr: US layout, Shift+2.
        assert_eq!(
            t.synergy_to_event(0x40, ModifierMask(ModifierMask::SHIFT)),
            Some(EventCode::KEY_2)
        );
    }

    #[test]
    fn test_keypad_navigation_keysyms_fold_onto_keypad() {
        let t = tables();
        // KP_Home (server NumLock off) and KP_7 (on) are the same key.
        let off = t.synergy_to_event(0xEF95, ModifierMask(0));
        let on = t.synergy_to_event(0xEFB7, ModifierMask(ModifierMask::NUM_LOCK));
        assert_eq!(off, Some(EventCode::KEY_KP7));
        assert_eq!(on, Some(EventCode::KEY_KP7));
    }

    #[test]
    fn test_unmapped_id_returns_none() {
        let t = tables();
        assert_eq!(t.synergy_to_event(0xEE00, ModifierMask(0)), None);
        assert_eq!(t.synergy_to_event(0x07, ModifierMask(0)), None);
    }

    #[test]
    fn test_mouse_buttons_follow_deskflow_numbering() {
        let t = tables();
        assert_eq!(t.mouse_button_to_event(1), Some(EventCode::BTN_LEFT));
        assert_eq!(t.mouse_button_to_event(2), Some(EventCode::BTN_MIDDLE));
        assert_eq!(t.mouse_button_to_event(3), Some(EventCode::BTN_RIGHT));
        assert_eq!(t.mouse_button_to_event(4), Some(EventCode::BTN_SIDE));
        assert_eq!(t.mouse_button_to_event(5), Some(EventCode::BTN_EXTRA));
        assert_eq!(t.mouse_button_to_event(0), None);
        assert_eq!(t.mouse_button_to_event(6), None);
    }

    #[test]
    fn test_vk_hid_round_trip_is_identity() {
        let t = tables();
        for entry_vk in t.vk_hid.keys().copied().collect::<Vec<_>>() {
            let hid = t.vk_to_hid(entry_vk).unwrap();
            assert_eq!(
                t.hid_to_vk(hid),
                Some(entry_vk),
                "vk→hid→vk must be identity for {entry_vk:?}"
            );
        }
    }

    #[test]
    fn test_hid_event_round_trip_is_identity() {
        let t = tables();
        for hid in t.hid_code.keys().copied().collect::<Vec<_>>() {
            let code = t.hid_to_event(hid).unwrap();
            assert_eq!(
                t.event_to_hid(code),
                Some(hid),
                "hid→code→hid must be identity for {hid:#04x}"
            );
        }
    }

    #[test]
    fn test_capability_set_covers_keys_and_buttons() {
        let t = tables();
        let codes = t.all_known_event_codes();
        assert!(codes.contains(&EventCode::KEY_A));
        assert!(codes.contains(&EventCode::KEY_KPENTER));
        assert!(codes.contains(&EventCode::BTN_LEFT));
        assert!(codes.contains(&EventCode::BTN_EXTRA));
        // Master rows are unique per event code plus the five buttons.
        assert!(codes.len() > 100, "expected full keyboard coverage, got {}", codes.len());
    }
}
