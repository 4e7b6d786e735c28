//! Ingestion session: the one context object that owns all decoded state
//!
//! A session is created when reading starts and dropped when it ends. The
//! ingestion worker is its only writer; dashboards and exporters read it
//! through [`SharedSession`] under brief read locks.

use chrono::{Local, NaiveDateTime};
use log::{error, warn};
use serde::Serialize;
use sigmundr_types::{IngestionStats, Result, SensorDefinition};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::composite::{CompositeDecoder, FrameReport};
use crate::framer::{LineFramer, LineOutcome};
use crate::sink::BoxedRowSink;

/// Thread-safe handle to a session
pub type SharedSession = Arc<RwLock<TelemetrySession>>;

/// Take a read lock, recovering from a poisoned lock.
/// Rows are appended whole under the write lock, so the data stays consistent.
pub fn read_session(session: &SharedSession) -> RwLockReadGuard<'_, TelemetrySession> {
    session.read().unwrap_or_else(|poisoned| {
        warn!("Session lock was poisoned, recovering");
        poisoned.into_inner()
    })
}

/// Take the write lock, recovering from a poisoned lock
pub fn write_session(session: &SharedSession) -> RwLockWriteGuard<'_, TelemetrySession> {
    session.write().unwrap_or_else(|poisoned| {
        warn!("Session lock was poisoned, recovering");
        poisoned.into_inner()
    })
}

/// Owns the framer state, the sensor stores, the counters and the row sink
pub struct TelemetrySession {
    framer: LineFramer,
    decoder: CompositeDecoder,
    stats: IngestionStats,
    sink: BoxedRowSink,
    started_at: NaiveDateTime,
    port: Option<String>,
    reading: bool,
}

impl TelemetrySession {
    /// Start a session for a composite frame layout
    pub fn new(layout: Vec<SensorDefinition>, sink: BoxedRowSink) -> Result<Self> {
        Ok(Self {
            framer: LineFramer::new(),
            decoder: CompositeDecoder::new(layout)?,
            stats: IngestionStats::default(),
            sink,
            started_at: Local::now().naive_local(),
            port: None,
            reading: false,
        })
    }

    pub fn into_shared(self) -> SharedSession {
        Arc::new(RwLock::new(self))
    }

    /// Handle one line received now
    pub fn process_line(&mut self, line: &[u8]) -> Result<LineOutcome> {
        self.process_line_at(line, Local::now().naive_local())
    }

    /// Handle one line received at `received_at`.
    ///
    /// Decode errors are counted and returned; the line is dropped and the
    /// session stays usable.
    pub fn process_line_at(
        &mut self,
        line: &[u8],
        received_at: NaiveDateTime,
    ) -> Result<LineOutcome> {
        self.stats.lines_received += 1;

        let outcome = match self.framer.process_line(line, received_at) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.stats.decode_errors += 1;
                return Err(e);
            }
        };

        match &outcome {
            LineOutcome::Empty => {}
            LineOutcome::Ignored => self.stats.lines_ignored += 1,
            LineOutcome::HeaderCaptured(header) => self.persist(header),
            LineOutcome::HeaderRepeated | LineOutcome::CalibrationRepeated => {
                self.stats.repeated_captures += 1
            }
            LineOutcome::DataAccepted(row) => {
                self.stats.data_rows += 1;
                self.persist(row);
            }
            LineOutcome::DataBeforeHeader => {
                self.stats.data_before_header += 1;
                warn!("Data line received before any header, dropped");
            }
            LineOutcome::CalibrationCaptured => {}
            LineOutcome::MessageAppended => self.stats.messages += 1,
        }
        Ok(outcome)
    }

    /// Decode one composite binary frame into the sensor stores
    pub fn process_frame(&mut self, frame: &[u8]) -> FrameReport {
        let report = self.decoder.decode_frame(frame);
        self.stats.frames_decoded += 1;
        self.stats.sensor_errors += report.errors.len() as u64;
        report
    }

    fn persist(&mut self, row: &[String]) {
        if let Err(e) = self.sink.write_row(row) {
            self.stats.sink_errors += 1;
            error!("Failed to persist row: {e}");
        }
    }

    /// Flush the sink, e.g. when reading stops
    pub fn flush(&mut self) {
        if let Err(e) = self.sink.flush() {
            self.stats.sink_errors += 1;
            error!("Failed to flush row sink: {e}");
        }
    }

    pub fn framer(&self) -> &LineFramer {
        &self.framer
    }

    pub fn decoder(&self) -> &CompositeDecoder {
        &self.decoder
    }

    pub fn stats(&self) -> &IngestionStats {
        &self.stats
    }

    pub fn started_at(&self) -> NaiveDateTime {
        self.started_at
    }

    pub fn port(&self) -> Option<&str> {
        self.port.as_deref()
    }

    pub fn set_port(&mut self, port: Option<String>) {
        self.port = port;
    }

    pub fn is_reading(&self) -> bool {
        self.reading
    }

    pub fn set_reading(&mut self, reading: bool) {
        self.reading = reading;
    }

    /// Clear decoded state and counters but keep layout, sink and port
    pub fn reset(&mut self) {
        self.framer.reset();
        self.decoder.reset();
        self.stats = IngestionStats::default();
        self.started_at = Local::now().naive_local();
    }

    /// Immutable summary for status displays
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            started_at: self.started_at,
            port: self.port.clone(),
            reading: self.reading,
            header: self.framer.header().map(<[String]>::to_vec),
            calibration: self.framer.calibration().cloned(),
            message_count: self.framer.messages().len(),
            last_message: self.framer.messages().last().cloned(),
            data_points: self.framer.data_points().len(),
            row_counts: self
                .decoder
                .stores()
                .iter()
                .map(|s| (s.id().to_string(), s.len()))
                .collect(),
            stats: self.stats.clone(),
        }
    }
}

/// Point-in-time copy of a session's status
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub started_at: NaiveDateTime,
    pub port: Option<String>,
    pub reading: bool,
    pub header: Option<Vec<String>>,
    pub calibration: Option<BTreeMap<String, String>>,
    pub message_count: usize,
    pub last_message: Option<String>,
    pub data_points: usize,
    pub row_counts: BTreeMap<String, usize>,
    pub stats: IngestionStats,
}
