//! Application layer: turns decoded protocol messages into device actions
//! and reply messages.

pub mod dispatcher;
