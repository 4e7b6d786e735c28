//! Error taxonomy shared by the decoding core and its collaborators

use thiserror::Error;

/// Errors raised while decoding telemetry
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Bytes that should be ASCII text are not, or a text field is malformed.
    /// Recoverable: the offending line is dropped and the stream continues.
    #[error("decode error: {0}")]
    Decode(String),

    /// A field descriptor reaches past the end of the sample it reads from.
    #[error("field `{field}` spans bytes {start}..{end} but the sample is only {len} bytes")]
    OutOfRange {
        field: String,
        start: usize,
        end: usize,
        len: usize,
    },

    /// Clock fields that do not form a valid time of day
    #[error("invalid clock reading {hour:02}:{minute:02}:{second:02}.{microsecond:06}")]
    InvalidClock {
        hour: i64,
        minute: i64,
        second: i64,
        microsecond: i64,
    },

    /// No candidate port answered with the expected identification line
    #[error("device not found: no port answered with `{0}`")]
    HandshakeNotFound(String),

    /// Composite layout rejected at construction time
    #[error("invalid frame layout: {0}")]
    Layout(String),

    /// I/O error from a sink or transport
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TelemetryError {
    /// Whether the ingestion worker may drop the input and carry on
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TelemetryError::Decode(_)
                | TelemetryError::InvalidClock { .. }
                | TelemetryError::HandshakeNotFound(_)
                | TelemetryError::Io(_)
        )
    }
}

/// Result type alias using TelemetryError
pub type Result<T> = std::result::Result<T, TelemetryError>;
