//! Ingestion runtime: worker thread, transport readers, device handshake
//! and the CSV data log

mod csv_log;
mod handshake;
mod worker;

pub use csv_log::{data_file_name, CsvLogSink};
pub use handshake::{find_device, find_link_device, PathProbe, PortProbe};
pub use worker::{spawn_frame_reader, spawn_line_reader, IngestionWorker, WireInput};
