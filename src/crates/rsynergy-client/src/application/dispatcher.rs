//! Message dispatch: decoded protocol messages in, device actions and
//! reply messages out.
//!
//! The dispatcher is an exhaustive match over [`Message`] — the compiler
//! guarantees no opcode handler can be forgotten.  It owns the
//! post-handshake session mode: whether input is active, whether screen
//! info has been sent, the mouse-move throttle, and the record of keys it
//! has actually pressed.
//!
//! # Mouse-move policy
//!
//! `DMMV` carries absolute screen coordinates.  In absolute mode they are
//! rescaled to the device's 0..=65535 axis range.  In relative mode the
//! dispatcher derives a delta against an anchor: every
//! `mouse_pos_sync_freq` moves the anchor is refreshed from the compositor
//! probe (preventing drift), otherwise it is the last position this
//! dispatcher injected.  Moves arriving faster than the configured
//! threshold coalesce with last-wins semantics and are flushed by the next
//! move, by any non-move event, or by the session's flush timer.
//!
//! # Key release correctness
//!
//! A `DKDN` whose translation is unknown is dropped — and the matching
//! `DKUP` must not press-leak.  The dispatcher records the
//! `(id, mask) → event code` pair it actually pressed and releases from
//! that record; re-translation is only a fallback for the
//! modifier-changed-between-press-and-release case.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rsynergy_core::{EventCode, KeyCodeTables, Message, ModifierMask, ScreenDescriptor};
use tracing::{debug, info, trace};

use crate::infrastructure::cursor::CursorContext;
use crate::infrastructure::device::{DeviceError, VirtualInput};

/// Dispatcher tuning derived from the configuration record.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// Inject absolute positions instead of reconciled relative deltas.
    pub abs_mouse_move: bool,
    /// Minimum interval between emitted mouse moves.
    pub mouse_move_threshold: Duration,
    /// Refresh the cursor probe every N moves in relative mode.
    pub mouse_pos_sync_freq: u32,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            abs_mouse_move: false,
            mouse_move_threshold: Duration::from_millis(8),
            mouse_pos_sync_freq: 2,
        }
    }
}

/// Why the dispatcher wants the session to end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The server asked for a graceful close (`CBYE`).
    CloseRequested,
    /// The server reported a fatal protocol error (`EBAD`/`EBSY`/`EUNK`/`EICV`).
    ServerError(String),
}

/// Result of handling one message.
#[derive(Debug, Default)]
pub struct Outcome {
    /// Messages to write back to the server, in order.
    pub replies: Vec<Message>,
    /// Set when the session must terminate.
    pub end: Option<SessionEnd>,
}

impl Outcome {
    fn reply(msg: Message) -> Self {
        Self {
            replies: vec![msg],
            end: None,
        }
    }

    fn end(end: SessionEnd) -> Self {
        Self {
            replies: Vec::new(),
            end: Some(end),
        }
    }
}

/// Stateful message → action mapper.  One per session.
pub struct Dispatcher {
    device: Box<dyn VirtualInput>,
    cursor: Box<dyn CursorContext>,
    tables: Arc<KeyCodeTables>,
    settings: DispatchSettings,

    screen: ScreenDescriptor,
    /// DINF has been sent; mouse moves are dropped until then.
    info_sent: bool,
    /// Entered via CIAK or CINN; input events are dropped until then.
    active: bool,

    last_emit: Option<Instant>,
    pending_move: Option<(i32, i32)>,
    last_reported: Option<(i32, i32)>,
    sync_counter: u32,

    /// (id, mask) → event code actually pressed, the release source of truth.
    pressed: HashMap<(u16, u16), EventCode>,
    /// Options received via DSOP; cleared by CROP.
    options: Vec<u32>,
}

impl Dispatcher {
    pub fn new(
        device: Box<dyn VirtualInput>,
        cursor: Box<dyn CursorContext>,
        tables: Arc<KeyCodeTables>,
        screen: ScreenDescriptor,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            device,
            cursor,
            tables,
            settings,
            screen,
            info_sent: false,
            active: false,
            last_emit: None,
            pending_move: None,
            last_reported: None,
            sync_counter: 0,
            pressed: HashMap::new(),
            options: Vec::new(),
        }
    }

    /// Handles one decoded message at time `now`.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] when a device write fails; fatal to the
    /// session.
    pub fn handle(&mut self, msg: Message, now: Instant) -> Result<Outcome, DeviceError> {
        let opcode = msg.opcode();
        trace!(opcode, "dispatch");

        // A coalesced move must reach the device before any later event so
        // ordering is preserved; only a further DMMV may keep it pending.
        if !matches!(msg, Message::MouseMove { .. }) {
            self.flush_pending(now)?;
        }

        match msg {
            // ── Handshake / control ─────────────────────────────────────
            Message::QueryInfo => {
                self.refresh_descriptor_mouse();
                self.info_sent = true;
                debug!(
                    width = self.screen.width,
                    height = self.screen.height,
                    "answering QINF"
                );
                Ok(Outcome::reply(Message::Info(self.screen)))
            }
            Message::InfoAck => {
                if !self.active {
                    info!("server acknowledged screen info; input active");
                }
                self.active = true;
                Ok(Outcome::default())
            }
            Message::KeepAlive => Ok(Outcome::reply(Message::KeepAlive)),
            Message::Noop => Ok(Outcome::default()),
            Message::Close => {
                info!("server requested close");
                Ok(Outcome::end(SessionEnd::CloseRequested))
            }
            Message::Enter { x, y, sequence, mask } => self.on_enter(x, y, sequence, mask),
            Message::Leave => {
                debug!("cursor left; releasing held keys");
                self.device.reset()?;
                self.pressed.clear();
                self.active = false;
                Ok(Outcome::default())
            }
            Message::ResetOptions => {
                self.options.clear();
                Ok(Outcome::default())
            }
            Message::ScreenSaver { started } => {
                debug!(started, "screensaver state");
                Ok(Outcome::default())
            }

            // ── Keyboard ────────────────────────────────────────────────
            Message::KeyDown { id, mask, button } => self.on_key_down(id, mask, button),
            Message::KeyDownLang { id, mask, button, .. } => self.on_key_down(id, mask, button),
            Message::KeyRepeat { id, mask, button, .. } => self.on_key_repeat(id, mask, button),
            Message::KeyUp { id, mask, .. } => self.on_key_up(id, mask),

            // ── Mouse ───────────────────────────────────────────────────
            Message::MouseDown { button } => self.on_mouse_button(button, true),
            Message::MouseUp { button } => self.on_mouse_button(button, false),
            Message::MouseMove { x, y } => self.on_mouse_move(x, y, now),
            Message::MouseRelMove { dx, dy } => self.on_mouse_rel_move(dx, dy),
            Message::MouseWheel { x, y } => {
                if self.active {
                    self.device.wheel(x, y)?;
                }
                Ok(Outcome::default())
            }

            // ── Data ────────────────────────────────────────────────────
            Message::SetOptions(options) => {
                debug!(count = options.len(), "stored options");
                self.options = options;
                Ok(Outcome::default())
            }
            Message::ClipboardGrab { .. } | Message::Clipboard { .. } => {
                // Clipboard sync is out of scope; accept and discard.
                trace!("ignoring clipboard message");
                Ok(Outcome::default())
            }

            // ── Errors ──────────────────────────────────────────────────
            Message::ErrorBad => Ok(Outcome::end(SessionEnd::ServerError(
                "server reported a protocol violation".into(),
            ))),
            Message::ErrorBusy => Ok(Outcome::end(SessionEnd::ServerError(
                "client name already in use".into(),
            ))),
            Message::ErrorUnknown => Ok(Outcome::end(SessionEnd::ServerError(
                "client name unknown to the server".into(),
            ))),
            Message::ErrorIncompatible { major, minor } => {
                Ok(Outcome::end(SessionEnd::ServerError(format!(
                    "incompatible protocol version {major}.{minor}"
                ))))
            }

            // ── Everything else ─────────────────────────────────────────
            Message::Hello { .. } | Message::HelloBack { .. } | Message::Info(_) => {
                debug!(opcode, "unexpected message, ignored");
                Ok(Outcome::default())
            }
            Message::Opaque { opcode, .. } => {
                trace!(
                    opcode = %String::from_utf8_lossy(&opcode),
                    "ignoring unknown opcode"
                );
                Ok(Outcome::default())
            }
        }
    }

    /// Emits the coalesced move when one is due.  Called by the session's
    /// flush timer and on drain.
    pub fn flush_pending(&mut self, now: Instant) -> Result<(), DeviceError> {
        if let Some((x, y)) = self.pending_move.take() {
            self.emit_move(x, y)?;
            self.last_emit = Some(now);
        }
        Ok(())
    }

    /// When a coalesced move is waiting, the instant the throttle reopens.
    pub fn pending_flush_deadline(&self) -> Option<Instant> {
        self.pending_move.as_ref()?;
        Some(self.last_emit.map_or_else(Instant::now, |t| t + self.settings.mouse_move_threshold))
    }

    /// Drain path: flush the throttled move, release everything held.
    pub fn drain(&mut self, now: Instant) -> Result<(), DeviceError> {
        self.flush_pending(now)?;
        self.pressed.clear();
        self.device.reset()
    }

    /// Input has been activated via CIAK or CINN.
    pub fn is_active(&self) -> bool {
        self.active
    }

    // ── Handlers ─────────────────────────────────────────────────────────────

    fn on_enter(
        &mut self,
        x: i16,
        y: i16,
        sequence: u32,
        mask: ModifierMask,
    ) -> Result<Outcome, DeviceError> {
        debug!(x, y, sequence, mask = mask.0, "cursor entered screen");
        let (cx, cy) = self.clamp(i32::from(x), i32::from(y));
        if self.settings.abs_mouse_move {
            let (sx, sy) = self.scale_to_device(cx, cy);
            self.device.move_abs(sx, sy)?;
        }
        self.last_reported = Some((cx, cy));
        self.sync_counter = 0;
        self.active = true;
        Ok(Outcome::default())
    }

    fn on_key_down(
        &mut self,
        id: u16,
        mask: ModifierMask,
        button: u16,
    ) -> Result<Outcome, DeviceError> {
        if !self.active {
            debug!(id, button, "key down while inactive, dropped");
            return Ok(Outcome::default());
        }
        if let Some(code) = self.tables.synergy_to_event(id, mask) {
            self.device.press(code)?;
            self.pressed.insert((id, mask.0), code);
        }
        Ok(Outcome::default())
    }

    fn on_key_repeat(
        &mut self,
        id: u16,
        mask: ModifierMask,
        button: u16,
    ) -> Result<Outcome, DeviceError> {
        if !self.active {
            debug!(id, button, "key repeat while inactive, dropped");
            return Ok(Outcome::default());
        }
        let code = self
            .pressed
            .get(&(id, mask.0))
            .copied()
            .or_else(|| self.tables.synergy_to_event(id, mask));
        if let Some(code) = code {
            // Release-then-press so Wayland clients see a fresh edge per
            // repeat rather than relying on kernel auto-repeat.
            self.device.release(code)?;
            self.device.press(code)?;
            self.pressed.insert((id, mask.0), code);
        }
        Ok(Outcome::default())
    }

    fn on_key_up(&mut self, id: u16, mask: ModifierMask) -> Result<Outcome, DeviceError> {
        if !self.active {
            return Ok(Outcome::default());
        }
        // The press record is authoritative: a drop-on-press must not leak
        // a release to some other code.
        match self.pressed.remove(&(id, mask.0)) {
            Some(code) => self.device.release(code)?,
            None => {
                if let Some(code) = self.tables.synergy_to_event(id, mask) {
                    // Tolerated: release of an unheld code is a device no-op.
                    self.device.release(code)?;
                }
            }
        }
        Ok(Outcome::default())
    }

    fn on_mouse_button(&mut self, button: i8, down: bool) -> Result<Outcome, DeviceError> {
        if !self.active {
            debug!(button, "mouse button while inactive, dropped");
            return Ok(Outcome::default());
        }
        if let Some(code) = self.tables.mouse_button_to_event(button) {
            if down {
                self.device.press(code)?;
            } else {
                self.device.release(code)?;
            }
        }
        Ok(Outcome::default())
    }

    fn on_mouse_move(&mut self, x: i16, y: i16, now: Instant) -> Result<Outcome, DeviceError> {
        if !self.info_sent {
            trace!("mouse move before DINF, dropped");
            return Ok(Outcome::default());
        }
        if !self.active {
            trace!("mouse move while inactive, dropped");
            return Ok(Outcome::default());
        }

        let target = self.clamp(i32::from(x), i32::from(y));
        // Last wins: a newer target always replaces a coalesced one.
        self.pending_move = Some(target);

        let throttle_open = self
            .last_emit
            .map_or(true, |t| now.saturating_duration_since(t) >= self.settings.mouse_move_threshold);
        if throttle_open {
            self.flush_pending(now)?;
        }
        Ok(Outcome::default())
    }

    fn on_mouse_rel_move(&mut self, dx: i16, dy: i16) -> Result<Outcome, DeviceError> {
        if !self.active {
            return Ok(Outcome::default());
        }
        self.device.move_rel(i32::from(dx), i32::from(dy))?;
        // Keep the integration anchor in step with the raw delta.
        if let Some((ax, ay)) = self.last_reported {
            self.last_reported = Some(self.clamp(ax + i32::from(dx), ay + i32::from(dy)));
        }
        Ok(Outcome::default())
    }

    // ── Mouse-move mechanics ─────────────────────────────────────────────────

    fn emit_move(&mut self, x: i32, y: i32) -> Result<(), DeviceError> {
        if self.settings.abs_mouse_move {
            let (sx, sy) = self.scale_to_device(x, y);
            self.device.move_abs(sx, sy)?;
            self.last_reported = Some((x, y));
            return Ok(());
        }

        // Relative mode: periodically re-anchor on the live cursor so the
        // integration cannot drift from compositor-side acceleration.
        let probe_due = self.sync_counter % self.settings.mouse_pos_sync_freq == 0;
        self.sync_counter = self.sync_counter.wrapping_add(1);
        let anchor = if probe_due {
            self.cursor.current().or(self.last_reported)
        } else {
            self.last_reported.or_else(|| self.cursor.current())
        };

        match anchor {
            Some((ax, ay)) => {
                let (dx, dy) = (x - ax, y - ay);
                if dx != 0 || dy != 0 {
                    self.device.move_rel(dx, dy)?;
                }
            }
            // No anchor yet: this move establishes one, nothing to emit.
            None => trace!("no cursor anchor yet"),
        }
        self.last_reported = Some((x, y));
        Ok(())
    }

    /// Clamps screen coordinates to `[0, w-1] × [0, h-1]`.
    fn clamp(&self, x: i32, y: i32) -> (i32, i32) {
        let max_x = i32::from(self.screen.width).saturating_sub(1).max(0);
        let max_y = i32::from(self.screen.height).saturating_sub(1).max(0);
        (x.clamp(0, max_x), y.clamp(0, max_y))
    }

    /// Rescales clamped screen coordinates to the 0..=65535 absolute axis.
    fn scale_to_device(&self, x: i32, y: i32) -> (i32, i32) {
        let scale = |v: i32, extent: u16| -> i32 {
            let span = i64::from(extent).saturating_sub(1).max(1);
            ((i64::from(v) * 65535) / span) as i32
        };
        (scale(x, self.screen.width), scale(y, self.screen.height))
    }

    fn refresh_descriptor_mouse(&mut self) {
        if let Some((x, y)) = self.cursor.current().or(self.last_reported) {
            let (cx, cy) = self.clamp(x, y);
            self.screen.mouse_x = cx.min(i32::from(i16::MAX)) as i16;
            self.screen.mouse_y = cy.min(i32::from(i16::MAX)) as i16;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
