//! sigmundr-types: Shared data types for the Sigmundr telemetry core.
//!
//! This crate contains pure data types (field descriptors, sensor
//! definitions, decoded rows, the line protocol tag table, errors and
//! counters) shared by every other crate in the workspace. It has no I/O
//! of its own.

pub mod descriptor;
pub mod error;
pub mod field;
pub mod frame;
pub mod sensor;
pub mod stats;

// Re-export commonly used types at the crate root for convenience
pub use descriptor::{ByteOrder, Conversion, FieldDescriptor, PhysicalValue};
pub use error::{Result, TelemetryError};
pub use field::{FieldMetadata, FieldPurpose, FieldType};
pub use frame::{
    FrameKind, LineFrame, DATA_SEPARATOR, PAIR_SEPARATOR, START_CALIBRATION, START_DATA,
    START_HEADER, START_MESSAGE,
};
pub use sensor::{SensorDefinition, SensorRow};
pub use stats::IngestionStats;
