//! Shared constants for the decoding core

use std::time::Duration;

/// Synthetic first column of the header and of every persisted data row
pub const TIME_COLUMN: &str = "Time";

/// Field names a clock source sensor must define
pub const CLOCK_HOUR_FIELD: &str = "hour";
pub const CLOCK_MINUTE_FIELD: &str = "minute";
pub const CLOCK_SECOND_FIELD: &str = "second";
pub const CLOCK_MICROSECOND_FIELD: &str = "microsecond";

/// Identification line the telemetry receiver sends after reset
pub const DEFAULT_BONJOUR: &str = "TELEMETRY";

/// Serial link speed used by the telemetry receiver
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// How long a candidate port gets to send its identification line.
/// Long enough for the receiver to reset and say hello.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(2);

/// Read timeout of the ingestion loop; bounds how late a stop request is seen
pub const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Seconds in one day, added on each midnight crossing
pub const SECONDS_PER_DAY: f64 = 86_400.0;
