//! One-shot screen-size probe for hosts that do not configure dimensions.
//!
//! Wayland again offers no portable query, so the probe reads the kernel's
//! own view: the first connected DRM connector's active mode from
//! `/sys/class/drm/card*-*/modes`.  Failing that, the
//! `SCREEN_WIDTH`/`SCREEN_HEIGHT` environment variables are honoured, and
//! the final fallback is 1920×1080 with a warning — a wrong size degrades
//! clamping accuracy but keeps the session usable.

use std::path::Path;

use tracing::{debug, warn};

/// Fallback dimensions when nothing can be probed.
pub const FALLBACK: (u16, u16) = (1920, 1080);

/// Probes the active screen size, in preference order: DRM sysfs, the
/// environment, the fallback constant.
pub fn probe_screen_size() -> (u16, u16) {
    if let Some(size) = drm_active_mode("/sys/class/drm") {
        debug!(width = size.0, height = size.1, "screen size from DRM sysfs");
        return size;
    }
    if let Some(size) = from_env() {
        debug!(width = size.0, height = size.1, "screen size from environment");
        return size;
    }
    warn!(
        width = FALLBACK.0,
        height = FALLBACK.1,
        "could not probe screen size, using fallback"
    );
    FALLBACK
}

/// Reads the first connected connector's first listed mode, which the
/// kernel orders with the active/preferred mode first.
fn drm_active_mode(base: impl AsRef<Path>) -> Option<(u16, u16)> {
    let entries = std::fs::read_dir(base).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        // Connector directories look like "card1-DP-1"; bare "card1" is the
        // device itself.
        if !name.starts_with("card") || !name.contains('-') {
            continue;
        }
        let status = std::fs::read_to_string(path.join("status")).ok();
        if status.as_deref().map(str::trim) != Some("connected") {
            continue;
        }
        let modes = std::fs::read_to_string(path.join("modes")).ok()?;
        if let Some(first) = modes.lines().next() {
            if let Some(size) = parse_mode(first) {
                return Some(size);
            }
        }
    }
    None
}

fn from_env() -> Option<(u16, u16)> {
    let w = std::env::var("SCREEN_WIDTH").ok()?.trim().parse().ok()?;
    let h = std::env::var("SCREEN_HEIGHT").ok()?.trim().parse().ok()?;
    if w == 0 || h == 0 {
        return None;
    }
    Some((w, h))
}

/// Parses a DRM mode line like `2560x1440`.
fn parse_mode(line: &str) -> Option<(u16, u16)> {
    let (w, h) = line.trim().split_once('x')?;
    let w: u16 = w.parse().ok()?;
    let h: u16 = h.parse().ok()?;
    if w == 0 || h == 0 {
        return None;
    }
    Some((w, h))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
