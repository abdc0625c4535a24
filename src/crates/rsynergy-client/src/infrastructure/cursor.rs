//! Compositor cursor-position probes.
//!
//! Wayland has no portable "where is the cursor" query, so the probe is a
//! chain of compositor-specific attempts: `hyprctl cursorpos` on Hyprland,
//! the KWin D-Bus property on KDE.  Anything else returns `None` and the
//! dispatcher falls back to integrating the positions it has injected
//! itself.  The probe is consulted at most once every
//! `mouse_pos_sync_freq` moves, so the subprocess cost stays bounded.

use std::process::Command;
use std::time::Duration;

use tracing::{debug, trace};

/// Best-effort supplier of the live cursor position in screen coordinates.
pub trait CursorContext: Send {
    /// The current cursor position, or `None` when it cannot be determined.
    fn current(&mut self) -> Option<(i32, i32)>;
}

/// Probe chain for Wayland compositors.
#[derive(Debug, Default)]
pub struct CompositorCursor {
    /// Remembers which probe answered last so later calls skip the dead ones.
    preferred: Option<Probe>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Probe {
    Hyprland,
    Kwin,
}

/// Subprocess probes must not stall the event loop; anything slower than
/// this is treated as absent.
const PROBE_TIMEOUT: Duration = Duration::from_millis(500);

impl CompositorCursor {
    pub fn new() -> Self {
        Self::default()
    }

    fn run(&mut self, probe: Probe) -> Option<(i32, i32)> {
        let output = match probe {
            Probe::Hyprland => run_with_timeout("hyprctl", &["cursorpos"])?,
            Probe::Kwin => run_with_timeout(
                "qdbus",
                &["org.kde.KWin", "/KWin", "org.kde.KWin.cursorPos"],
            )?,
        };
        let pos = parse_point(&output)?;
        self.preferred = Some(probe);
        Some(pos)
    }
}

impl CursorContext for CompositorCursor {
    fn current(&mut self) -> Option<(i32, i32)> {
        let order = match self.preferred {
            Some(Probe::Kwin) => [Probe::Kwin, Probe::Hyprland],
            _ => [Probe::Hyprland, Probe::Kwin],
        };
        for probe in order {
            if let Some(pos) = self.run(probe) {
                trace!(?probe, x = pos.0, y = pos.1, "cursor probe");
                return Some(pos);
            }
        }
        debug!("no cursor probe answered");
        None
    }
}

/// A probe that never knows; for tests and headless runs.
#[derive(Debug, Default)]
pub struct NullCursor;

impl CursorContext for NullCursor {
    fn current(&mut self) -> Option<(i32, i32)> {
        None
    }
}

/// Fixed-position probe for tests.
#[derive(Debug)]
pub struct FixedCursor(pub i32, pub i32);

impl CursorContext for FixedCursor {
    fn current(&mut self) -> Option<(i32, i32)> {
        Some((self.0, self.1))
    }
}

fn run_with_timeout(program: &str, args: &[&str]) -> Option<String> {
    // std::process has no built-in timeout; waiting on a thread keeps the
    // blocking bounded without pulling the probe into the async runtime.
    let mut cmd = Command::new(program);
    cmd.args(args);
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let _ = tx.send(cmd.output());
    });
    match rx.recv_timeout(PROBE_TIMEOUT) {
        Ok(Ok(out)) if out.status.success() => String::from_utf8(out.stdout).ok(),
        _ => None,
    }
}

/// Parses the probe output formats seen in the wild: `"x, y"` from
/// hyprctl, `"QPoint(x, y)"` from older qdbus, bare `"x y"` variants.
fn parse_point(text: &str) -> Option<(i32, i32)> {
    let cleaned: String = text
        .chars()
        .map(|c| {
            if c.is_ascii_digit() || c == '-' {
                c
            } else {
                ' '
            }
        })
        .collect();
    let mut nums = cleaned.split_whitespace().filter_map(|t| t.parse::<i32>().ok());
    let x = nums.next()?;
    let y = nums.next()?;
    Some((x, y))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
