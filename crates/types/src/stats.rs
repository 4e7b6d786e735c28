//! Counters for recoverable conditions seen during ingestion

use serde::{Deserialize, Serialize};

/// Running counters kept by an ingestion session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionStats {
    /// Lines handed to the framer, including dropped ones
    pub lines_received: u64,
    /// Lines that were not ASCII or carried malformed counters
    pub decode_errors: u64,
    /// Lines without a known tag
    pub lines_ignored: u64,
    /// Data lines accepted and forwarded to the log
    pub data_rows: u64,
    /// Data lines dropped because no header had been captured
    pub data_before_header: u64,
    /// Header and calibration lines absorbed after the first capture
    pub repeated_captures: u64,
    /// Message lines appended to the message log
    pub messages: u64,
    /// Composite frames decoded
    pub frames_decoded: u64,
    /// Per-sensor decode failures inside composite frames
    pub sensor_errors: u64,
    /// Rows the persistence sink failed to write
    pub sink_errors: u64,
}

impl IngestionStats {
    /// Total recoverable problems seen so far
    pub fn total_errors(&self) -> u64 {
        self.decode_errors + self.sensor_errors + self.sink_errors
    }
}
