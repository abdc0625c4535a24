//! Linux uinput backend for [`VirtualInput`].
//!
//! Creates one virtual device node carrying both the keyboard and pointer
//! capabilities: EV_KEY for every code the key tables can produce plus the
//! mouse buttons, EV_REL for motion and both wheel axes, and (optionally)
//! EV_ABS X/Y ranged 0..=65535 for absolute positioning.  Compositors pick
//! the node up like any hot-plugged physical device.
//!
//! Requires write access to `/dev/uinput` (the `input` group on most
//! distributions, or a udev rule).
//!
//! `evdev`'s `VirtualDevice::emit` appends the SYN_REPORT barrier itself,
//! which gives every [`VirtualInput`] call its one-atomic-batch guarantee.

#![cfg(target_os = "linux")]

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{
    AbsInfo, AbsoluteAxisType, AttributeSet, BusType, EventType, InputEvent, InputId, Key,
    RelativeAxisType, UinputAbsSetup,
};
use rsynergy_core::{EventCode, KeyCodeTables};
use tracing::{debug, info};

use super::{wheel_ticks, DeviceError, HeldKeys, VirtualInput};

/// Device identity presented to the kernel.  Synthetic but stable, so
/// compositor input configuration can match on it.
const VENDOR_ID: u16 = 0x1234;
const PRODUCT_ID: u16 = 0x5678;
const VERSION: u16 = 0x0001;

/// Absolute axis range used when EV_ABS is declared.
const ABS_MAX: i32 = 65535;

/// A uinput-backed virtual keyboard + pointer.
pub struct UinputDevice {
    dev: VirtualDevice,
    held: HeldKeys,
    abs_capable: bool,
}

impl UinputDevice {
    /// Creates the uinput node with capabilities derived from `tables`.
    ///
    /// `with_abs` declares the absolute axes; leave it off for a purely
    /// relative pointer (some compositors handle EV_REL-only devices more
    /// gracefully).
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Open`] when `/dev/uinput` is missing or not
    /// writable.
    pub fn create(
        name: &str,
        tables: &KeyCodeTables,
        with_abs: bool,
    ) -> Result<Self, DeviceError> {
        let mut keys = AttributeSet::<Key>::new();
        for code in tables.all_known_event_codes() {
            keys.insert(Key::new(code.raw()));
        }

        let mut rel = AttributeSet::<RelativeAxisType>::new();
        rel.insert(RelativeAxisType::REL_X);
        rel.insert(RelativeAxisType::REL_Y);
        rel.insert(RelativeAxisType::REL_WHEEL);
        rel.insert(RelativeAxisType::REL_HWHEEL);

        let mut builder = VirtualDeviceBuilder::new()
            .map_err(|source| DeviceError::Open { source })?
            .name(name)
            .input_id(InputId::new(BusType::BUS_USB, VENDOR_ID, PRODUCT_ID, VERSION))
            .with_keys(&keys)
            .map_err(|source| DeviceError::Open { source })?
            .with_relative_axes(&rel)
            .map_err(|source| DeviceError::Open { source })?;

        if with_abs {
            let abs_info = AbsInfo::new(0, 0, ABS_MAX, 0, 0, 0);
            builder = builder
                .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisType::ABS_X, abs_info))
                .map_err(|source| DeviceError::Open { source })?
                .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisType::ABS_Y, abs_info))
                .map_err(|source| DeviceError::Open { source })?;
        }

        let dev = builder
            .build()
            .map_err(|source| DeviceError::Open { source })?;

        info!(name, with_abs, "created uinput device");
        Ok(Self {
            dev,
            held: HeldKeys::default(),
            abs_capable: with_abs,
        })
    }

    fn emit(&mut self, events: &[InputEvent]) -> Result<(), DeviceError> {
        self.dev.emit(events)?;
        Ok(())
    }
}

impl VirtualInput for UinputDevice {
    fn press(&mut self, code: EventCode) -> Result<(), DeviceError> {
        if !self.held.insert(code) {
            return Ok(());
        }
        self.emit(&[InputEvent::new(EventType::KEY, code.raw(), 1)])
    }

    fn release(&mut self, code: EventCode) -> Result<(), DeviceError> {
        if !self.held.remove(code) {
            return Ok(());
        }
        self.emit(&[InputEvent::new(EventType::KEY, code.raw(), 0)])
    }

    fn move_rel(&mut self, dx: i32, dy: i32) -> Result<(), DeviceError> {
        let mut events = Vec::with_capacity(2);
        if dx != 0 {
            events.push(InputEvent::new(EventType::RELATIVE, RelativeAxisType::REL_X.0, dx));
        }
        if dy != 0 {
            events.push(InputEvent::new(EventType::RELATIVE, RelativeAxisType::REL_Y.0, dy));
        }
        if events.is_empty() {
            return Ok(());
        }
        self.emit(&events)
    }

    fn move_abs(&mut self, x: i32, y: i32) -> Result<(), DeviceError> {
        if !self.abs_capable {
            return Err(DeviceError::UnsupportedOperation);
        }
        self.emit(&[
            InputEvent::new(EventType::ABSOLUTE, AbsoluteAxisType::ABS_X.0, x),
            InputEvent::new(EventType::ABSOLUTE, AbsoluteAxisType::ABS_Y.0, y),
        ])
    }

    fn wheel(&mut self, dx: i16, dy: i16) -> Result<(), DeviceError> {
        let h = wheel_ticks(dx);
        let v = wheel_ticks(dy);
        let mut events = Vec::with_capacity(2);
        if v != 0 {
            events.push(InputEvent::new(
                EventType::RELATIVE,
                RelativeAxisType::REL_WHEEL.0,
                v,
            ));
        }
        if h != 0 {
            events.push(InputEvent::new(
                EventType::RELATIVE,
                RelativeAxisType::REL_HWHEEL.0,
                h,
            ));
        }
        if events.is_empty() {
            return Ok(());
        }
        self.emit(&events)
    }

    fn reset(&mut self) -> Result<(), DeviceError> {
        let held = self.held.drain();
        if held.is_empty() {
            return Ok(());
        }
        debug!(count = held.len(), "releasing held keys");
        let events: Vec<InputEvent> = held
            .into_iter()
            .map(|code| InputEvent::new(EventType::KEY, code.raw(), 0))
            .collect();
        self.emit(&events)
    }

    fn held(&self) -> Vec<EventCode> {
        self.held.as_slice().to_vec()
    }
}

impl Drop for UinputDevice {
    fn drop(&mut self) {
        // Never leave keys stuck on the host when the session dies.
        let _ = self.reset();
    }
}
