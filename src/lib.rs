//! sigmundr-telemetry: ground-side telemetry ingestion for the Sigmundr
//! flight computer
//!
//! This library ties the decoding core to the outside world:
//! - Configuration management
//! - The ingestion worker and the transport readers feeding it
//! - The device handshake and the CSV data log

pub mod config;
pub mod core;

// Re-export commonly used types
pub use config::AppConfig;
pub use self::core::{CsvLogSink, IngestionWorker, WireInput};
