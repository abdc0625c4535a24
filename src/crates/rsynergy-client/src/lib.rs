//! rsynergy-client library entry point.
//!
//! Re-exports the module tree so the binary in `main.rs` and the
//! integration tests in `tests/` share the same code paths.
//!
//! The client is the *controlled* end of a Synergy/Barrier pair: it
//! connects out to the server, answers the screen-information handshake,
//! and then replays the server's keyboard and mouse stream into the kernel
//! through a uinput virtual device.  Wayland compositors without a
//! remote-input portal cannot be driven through the display server, which
//! is why injection happens at the kernel boundary instead.

/// Application layer: message dispatch and session policy.
pub mod application;

/// Infrastructure layer: configuration, transport, uinput, probes.
pub mod infrastructure;
