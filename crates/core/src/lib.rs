//! sigmundr-core: decoding core for Sigmundr rocket telemetry.
//!
//! This crate contains the line framer, the field extraction engine, the
//! per-sensor time-series stores, the composite frame decoder, the ingestion
//! session and the consumer-facing traits (DataSource, RowSink) and registry.

pub mod composite;
pub mod constants;
mod data_source;
pub mod extract;
pub mod framer;
mod registry;
pub mod session;
pub mod sink;
pub mod store;

pub use composite::{CompositeDecoder, FrameReport};
pub use constants::{
    CLOCK_HOUR_FIELD, CLOCK_MICROSECOND_FIELD, CLOCK_MINUTE_FIELD, CLOCK_SECOND_FIELD,
    DEFAULT_BAUD_RATE, DEFAULT_BONJOUR, HANDSHAKE_TIMEOUT, READ_TIMEOUT, TIME_COLUMN,
};
pub use data_source::{BoxedDataSource, DataSource, SourceMetadata};
pub use extract::{decode_sample, extract_field, extract_samples, read_raw};
pub use framer::{decode_ascii, DataPoint, LineFramer, LineOutcome, RECEIPT_TIME_FORMAT};
pub use registry::{global_registry, global_registry_mut, LayoutFactory, LayoutInfo, Registry};
pub use session::{read_session, write_session, SessionSnapshot, SharedSession, TelemetrySession};
pub use sink::{BoxedRowSink, MemorySink, NullSink, RowSink};
pub use store::SensorStore;

// Re-export types used in trait signatures for convenience
pub use sigmundr_types::{FieldMetadata, FieldPurpose, FieldType};
