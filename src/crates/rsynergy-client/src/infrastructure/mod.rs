//! Infrastructure layer: everything that touches the OS or the network.
//!
//! - **`config`**  – TOML configuration schema, loading, validation.
//! - **`device`**  – the virtual-input capability trait, the uinput
//!   backend, and the recording mock.
//! - **`cursor`**  – compositor cursor-position probes.
//! - **`screen`**  – one-shot screen-size probe for unconfigured hosts.
//! - **`session`** – transport, handshake, heartbeat, the event loop.

pub mod config;
pub mod cursor;
pub mod device;
pub mod screen;
pub mod session;
