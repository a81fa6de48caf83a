//! Inbound control channel: OSC over UDP

pub mod listener;

pub use listener::{decode_datagram, extract_texts, ControlHandler, ControlListener, DEFAULT_ENDPOINT};
