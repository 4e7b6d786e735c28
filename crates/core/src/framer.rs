//! Line framer for the tagged ASCII protocol
//!
//! Each line starts with a one-character tag (header, data, calibration or
//! message). The framer keeps the write-once header and calibration, the
//! message log and a small buffer of the data counters for inline inspection.

use chrono::NaiveDateTime;
use log::{debug, info, warn};
use serde::Serialize;
use sigmundr_types::{FrameKind, LineFrame, Result, TelemetryError, PAIR_SEPARATOR};
use std::collections::BTreeMap;

use crate::constants::TIME_COLUMN;

/// Receipt timestamp format of persisted rows (ISO-8601, microseconds)
pub const RECEIPT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Counters carried by one accepted data line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataPoint {
    pub received_at: NaiveDateTime,
    /// Frame sequence number
    pub sequence: i64,
    /// Secondary counter
    pub counter: i64,
}

/// What the framer did with one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// Empty line
    Empty,
    /// Line without a known tag
    Ignored,
    /// First header; the full header row, `Time` column included
    HeaderCaptured(Vec<String>),
    /// Header absorbed because one is already captured
    HeaderRepeated,
    /// Data row to persist: receipt timestamp followed by the payload fields
    DataAccepted(Vec<String>),
    /// Data dropped because no header has been captured yet
    DataBeforeHeader,
    CalibrationCaptured,
    CalibrationRepeated,
    MessageAppended,
}

/// Stateful decoder of tagged ASCII lines
#[derive(Debug, Clone, Default)]
pub struct LineFramer {
    header: Option<Vec<String>>,
    calibration: Option<BTreeMap<String, String>>,
    messages: Vec<String>,
    data_points: Vec<DataPoint>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one line, already stripped of its terminator.
    ///
    /// Fails with `Decode` if the bytes are not ASCII or a data line's
    /// counters are not integers; the framer state is unchanged in that case.
    pub fn process_line(&mut self, line: &[u8], received_at: NaiveDateTime) -> Result<LineOutcome> {
        let text = decode_ascii(line)?;
        if text.is_empty() {
            return Ok(LineOutcome::Empty);
        }
        let Some(frame) = LineFrame::parse(text) else {
            debug!("Ignoring untagged line: {text:?}");
            return Ok(LineOutcome::Ignored);
        };

        let outcome = match frame.kind {
            FrameKind::Header => self.process_header(&frame),
            FrameKind::Data => self.process_data(&frame, received_at)?,
            FrameKind::Calibration => self.process_calibration(&frame),
            FrameKind::Message => self.process_message(&frame),
        };
        Ok(outcome)
    }

    fn process_header(&mut self, frame: &LineFrame<'_>) -> LineOutcome {
        if self.header.is_some() {
            return LineOutcome::HeaderRepeated;
        }
        let header: Vec<String> = std::iter::once(TIME_COLUMN)
            .chain(frame.fields())
            .map(str::to_string)
            .collect();
        info!("Header : {header:?}");
        self.header = Some(header.clone());
        LineOutcome::HeaderCaptured(header)
    }

    fn process_data(
        &mut self,
        frame: &LineFrame<'_>,
        received_at: NaiveDateTime,
    ) -> Result<LineOutcome> {
        let Some(header) = &self.header else {
            return Ok(LineOutcome::DataBeforeHeader);
        };

        let fields: Vec<&str> = frame.fields().collect();
        let counter = |index: usize, name: &str| -> Result<i64> {
            let raw = fields.get(index).ok_or_else(|| {
                TelemetryError::Decode(format!("data line has no {name} field"))
            })?;
            raw.trim().parse::<i64>().map_err(|e| {
                TelemetryError::Decode(format!("{name} `{raw}` is not an integer: {e}"))
            })
        };
        let sequence = counter(0, "sequence number")?;
        let secondary = counter(1, "secondary counter")?;

        if fields.len() + 1 != header.len() {
            debug!(
                "Data line has {} field(s), header has {} column(s)",
                fields.len() + 1,
                header.len()
            );
        }

        let mut row = Vec::with_capacity(fields.len() + 1);
        row.push(received_at.format(RECEIPT_TIME_FORMAT).to_string());
        row.extend(fields.iter().map(|f| f.to_string()));

        self.data_points.push(DataPoint {
            received_at,
            sequence,
            counter: secondary,
        });
        Ok(LineOutcome::DataAccepted(row))
    }

    fn process_calibration(&mut self, frame: &LineFrame<'_>) -> LineOutcome {
        if self.calibration.is_some() {
            return LineOutcome::CalibrationRepeated;
        }
        let mut calibration = BTreeMap::new();
        for pair in frame.fields() {
            match pair.split_once(PAIR_SEPARATOR) {
                Some((key, value)) => {
                    calibration.insert(key.to_string(), value.to_string());
                }
                None => warn!("Calibration element without `{PAIR_SEPARATOR}`: {pair:?}"),
            }
        }
        info!("Calibration data : {calibration:?}");
        self.calibration = Some(calibration);
        LineOutcome::CalibrationCaptured
    }

    fn process_message(&mut self, frame: &LineFrame<'_>) -> LineOutcome {
        info!("Message : {}", frame.payload);
        self.messages.push(frame.payload.to_string());
        LineOutcome::MessageAppended
    }

    /// Captured header, `Time` column first
    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    pub fn calibration(&self) -> Option<&BTreeMap<String, String>> {
        self.calibration.as_ref()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn data_points(&self) -> &[DataPoint] {
        &self.data_points
    }

    /// Forget everything captured, for a new session
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Decode a line as ASCII text
pub fn decode_ascii(line: &[u8]) -> Result<&str> {
    if let Some(position) = line.iter().position(|b| !b.is_ascii()) {
        return Err(TelemetryError::Decode(format!(
            "non-ASCII byte 0x{:02X} at position {position}",
            line[position]
        )));
    }
    std::str::from_utf8(line).map_err(|e| TelemetryError::Decode(e.to_string()))
}
