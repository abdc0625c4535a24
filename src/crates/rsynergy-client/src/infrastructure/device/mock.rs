//! Recording mock for [`VirtualInput`].
//!
//! The real backend creates a kernel device node and actually moves the
//! host cursor, which a test cannot observe (or tolerate).  The mock
//! records every emitted batch into a shared `Mutex<Vec<_>>` trace so
//! assertions can inspect exactly what was injected and in which order.
//! Wheel values are recorded *after* tick conversion: the trace holds what
//! the kernel would have seen.
//!
//! `fail_writes` makes every emitting call return a write error, for
//! exercising the fatal-device-error path without a broken kernel.

use std::sync::{Arc, Mutex};

use rsynergy_core::EventCode;

use super::{wheel_ticks, DeviceError, HeldKeys, VirtualInput};

/// One recorded device batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    Press(EventCode),
    Release(EventCode),
    MoveRel { dx: i32, dy: i32 },
    MoveAbs { x: i32, y: i32 },
    Wheel { h_ticks: i32, v_ticks: i32 },
}

/// Shared handle onto a mock device's trace.
pub type Trace = Arc<Mutex<Vec<TraceEvent>>>;

/// A `VirtualInput` that records instead of injecting.
#[derive(Default)]
pub struct MockDevice {
    trace: Trace,
    held: HeldKeys,
    /// When `true`, every emitting call fails with a write error.
    pub fail_writes: bool,
    /// When `false`, `move_abs` reports `UnsupportedOperation` like a
    /// device built without EV_ABS.
    pub abs_capable: bool,
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            abs_capable: true,
            ..Self::default()
        }
    }

    /// A clonable handle to the recorded trace, valid after the device has
    /// been moved into a dispatcher.
    pub fn trace(&self) -> Trace {
        Arc::clone(&self.trace)
    }

    fn record(&mut self, event: TraceEvent) -> Result<(), DeviceError> {
        if self.fail_writes {
            return Err(DeviceError::Write(std::io::Error::other("mock write failure")));
        }
        self.trace.lock().expect("trace poisoned").push(event);
        Ok(())
    }
}

impl VirtualInput for MockDevice {
    fn press(&mut self, code: EventCode) -> Result<(), DeviceError> {
        if !self.held.insert(code) {
            return Ok(());
        }
        self.record(TraceEvent::Press(code))
    }

    fn release(&mut self, code: EventCode) -> Result<(), DeviceError> {
        if !self.held.remove(code) {
            return Ok(());
        }
        self.record(TraceEvent::Release(code))
    }

    fn move_rel(&mut self, dx: i32, dy: i32) -> Result<(), DeviceError> {
        if dx == 0 && dy == 0 {
            return Ok(());
        }
        self.record(TraceEvent::MoveRel { dx, dy })
    }

    fn move_abs(&mut self, x: i32, y: i32) -> Result<(), DeviceError> {
        if !self.abs_capable {
            return Err(DeviceError::UnsupportedOperation);
        }
        self.record(TraceEvent::MoveAbs { x, y })
    }

    fn wheel(&mut self, dx: i16, dy: i16) -> Result<(), DeviceError> {
        let h_ticks = wheel_ticks(dx);
        let v_ticks = wheel_ticks(dy);
        if h_ticks == 0 && v_ticks == 0 {
            return Ok(());
        }
        self.record(TraceEvent::Wheel { h_ticks, v_ticks })
    }

    fn reset(&mut self) -> Result<(), DeviceError> {
        for code in self.held.drain() {
            self.record(TraceEvent::Release(code))?;
        }
        Ok(())
    }

    fn held(&self) -> Vec<EventCode> {
        self.held.as_slice().to_vec()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
