//! The virtual-input capability seam.
//!
//! The dispatcher only ever talks to [`VirtualInput`]; the uinput backend
//! is one implementation, the recording mock another, and a future
//! compositor-portal backend would slot in without touching the dispatcher.
//!
//! Semantics shared by every backend:
//!
//! - `press` on an already-held code and `release` on an unheld code are
//!   no-ops.  The held set therefore always matches the aggregate effect of
//!   the emitted events.
//! - `reset` releases every held code in insertion order and clears the set.
//! - each call is one atomic batch: the kernel sees a single SYN_REPORT per
//!   call.
//! - wheel values are Synergy detents (±120 per notch); backends convert to
//!   ticks with [`wheel_ticks`].

pub mod mock;

#[cfg(target_os = "linux")]
pub mod uinput;

use rsynergy_core::EventCode;
use thiserror::Error;

/// Error type for virtual-device operations.  Write failures are fatal to
/// the session: losing an event silently would corrupt the held-keys set.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The uinput node could not be created.
    #[error("failed to create uinput device: {source}")]
    Open {
        #[source]
        source: std::io::Error,
    },

    /// Writing an event to the device failed.
    #[error("device write failed: {0}")]
    Write(#[from] std::io::Error),

    /// `move_abs` on a device created without EV_ABS capability.
    #[error("absolute positioning unsupported on this device")]
    UnsupportedOperation,
}

impl DeviceError {
    /// `true` when the failure is a permission problem on `/dev/uinput`,
    /// which gets its own exit code so users can tell it apart from a
    /// server-side failure.
    pub fn is_permission(&self) -> bool {
        match self {
            DeviceError::Open { source } | DeviceError::Write(source) => {
                source.kind() == std::io::ErrorKind::PermissionDenied
            }
            DeviceError::UnsupportedOperation => false,
        }
    }
}

/// Narrow capability interface over a virtual input device.
pub trait VirtualInput: Send {
    /// Emits a key/button press.  No-op when the code is already held.
    fn press(&mut self, code: EventCode) -> Result<(), DeviceError>;

    /// Emits a key/button release.  No-op when the code is not held.
    fn release(&mut self, code: EventCode) -> Result<(), DeviceError>;

    /// Relative pointer motion; zero-valued axes are suppressed.
    fn move_rel(&mut self, dx: i32, dy: i32) -> Result<(), DeviceError>;

    /// Absolute pointer motion in the 0..=65535 device range.
    fn move_abs(&mut self, x: i32, y: i32) -> Result<(), DeviceError>;

    /// Wheel scroll; `dx`/`dy` in Synergy detents (±120 per notch).
    fn wheel(&mut self, dx: i16, dy: i16) -> Result<(), DeviceError>;

    /// Releases every held code in insertion order and clears the set.
    fn reset(&mut self) -> Result<(), DeviceError>;

    /// Codes currently held, in insertion order.
    fn held(&self) -> Vec<EventCode>;
}

/// Converts a Synergy wheel value (±120 per detent) into wheel ticks.
///
/// Integer division truncates toward zero, so sub-detent values produce no
/// tick and the sign carries through: ±119 → 0, ±120 → ±1, ±240 → ±2.
pub fn wheel_ticks(value: i16) -> i32 {
    i32::from(value) / 120
}

/// Insertion-ordered held-key bookkeeping shared by the backends.
#[derive(Debug, Default)]
pub(crate) struct HeldKeys {
    codes: Vec<EventCode>,
}

impl HeldKeys {
    /// Records a press; returns `false` when the code was already held.
    pub fn insert(&mut self, code: EventCode) -> bool {
        if self.codes.contains(&code) {
            return false;
        }
        self.codes.push(code);
        true
    }

    /// Records a release; returns `false` when the code was not held.
    pub fn remove(&mut self, code: EventCode) -> bool {
        match self.codes.iter().position(|&c| c == code) {
            Some(idx) => {
                self.codes.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Takes the held codes in insertion order, leaving the set empty.
    pub fn drain(&mut self) -> Vec<EventCode> {
        std::mem::take(&mut self.codes)
    }

    pub fn as_slice(&self) -> &[EventCode] {
        &self.codes
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
