//! Default configuration values
//!
//! Every config field falls back to one of these, so partial files load.

use sigmundr_core::{DEFAULT_BAUD_RATE, DEFAULT_BONJOUR, HANDSHAKE_TIMEOUT, READ_TIMEOUT};
use sigmundr_sources::SIGMUNDR_LAYOUT_ID;
use std::path::PathBuf;

/// Current config format version
pub const CONFIG_VERSION: u32 = 2;

pub(crate) fn default_version() -> u32 {
    CONFIG_VERSION
}

pub(crate) fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

pub(crate) fn default_bonjour() -> String {
    DEFAULT_BONJOUR.to_string()
}

pub(crate) fn default_handshake_timeout_ms() -> u64 {
    HANDSHAKE_TIMEOUT.as_millis() as u64
}

pub(crate) fn default_read_timeout_ms() -> u64 {
    READ_TIMEOUT.as_millis() as u64
}

pub(crate) fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

pub(crate) fn default_true() -> bool {
    true
}

pub(crate) fn default_layout() -> String {
    SIGMUNDR_LAYOUT_ID.to_string()
}
