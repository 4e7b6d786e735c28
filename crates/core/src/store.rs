//! Sensor time-series store
//!
//! Holds the decoded rows of one sensor as an append-only table and tracks the
//! elapsed time since the sensor's first row.

use chrono::NaiveTime;
use log::{trace, warn};
use sigmundr_types::{PhysicalValue, Result, SensorDefinition, SensorRow, TelemetryError};

use crate::constants::{
    CLOCK_HOUR_FIELD, CLOCK_MICROSECOND_FIELD, CLOCK_MINUTE_FIELD, CLOCK_SECOND_FIELD,
    SECONDS_PER_DAY,
};
use crate::extract::{decode_sample, extract_samples};

/// Field positions of the time-of-day parts in a clock sensor's sample
#[derive(Debug, Clone, Copy)]
struct ClockFields {
    hour: usize,
    minute: usize,
    second: usize,
    microsecond: usize,
}

impl ClockFields {
    fn locate(definition: &SensorDefinition) -> Result<Self> {
        let find = |name: &str| {
            definition.field_index(name).ok_or_else(|| {
                TelemetryError::Layout(format!(
                    "clock sensor `{}` has no `{}` field",
                    definition.id, name
                ))
            })
        };
        Ok(Self {
            hour: find(CLOCK_HOUR_FIELD)?,
            minute: find(CLOCK_MINUTE_FIELD)?,
            second: find(CLOCK_SECOND_FIELD)?,
            microsecond: find(CLOCK_MICROSECOND_FIELD)?,
        })
    }

    fn time_of_day(&self, values: &[PhysicalValue]) -> Result<NaiveTime> {
        let hour = values[self.hour].as_i64();
        let minute = values[self.minute].as_i64();
        let second = values[self.second].as_i64();
        let microsecond = values[self.microsecond].as_i64();

        let part = |v: i64| u32::try_from(v).ok();
        part(hour)
            .zip(part(minute))
            .zip(part(second))
            .zip(part(microsecond))
            .and_then(|(((h, m), s), us)| {
                // Reject the leap-second encoding chrono accepts above 999_999 µs
                (us < 1_000_000).then_some(())?;
                NaiveTime::from_hms_micro_opt(h, m, s, us)
            })
            .ok_or(TelemetryError::InvalidClock {
                hour,
                minute,
                second,
                microsecond,
            })
    }
}

/// Where a row's time label comes from
#[derive(Debug, Clone, Copy)]
enum TimeLabel {
    Clock(ClockFields),
    Shared(NaiveTime),
}

/// Append-only table of decoded rows for one sensor
#[derive(Debug, Clone)]
pub struct SensorStore {
    definition: SensorDefinition,
    clock: Option<ClockFields>,
    rows: Vec<SensorRow>,
    /// Midnight crossings seen since the first row
    day_offset: u32,
}

impl SensorStore {
    /// Create an empty store.
    ///
    /// Fails on field widths that cannot be read or a clock source without
    /// time-of-day fields. Fields reaching past the sample are only reported
    /// here; they fail each decode call with `OutOfRange`.
    pub fn new(definition: SensorDefinition) -> Result<Self> {
        if definition.sample_width == 0 {
            return Err(TelemetryError::Layout(format!(
                "sensor `{}` has a zero sample width",
                definition.id
            )));
        }
        if definition.checked_region_end().is_none() {
            return Err(TelemetryError::Layout(format!(
                "region of sensor `{}` does not fit in memory",
                definition.id
            )));
        }
        for field in &definition.fields {
            field.validate_width()?;
            if field.range().end > definition.sample_width {
                warn!(
                    "{}: field `{}` ends at byte {} of a {}-byte sample",
                    definition.id,
                    field.name,
                    field.range().end,
                    definition.sample_width
                );
            }
        }
        let clock = if definition.is_clock_source {
            Some(ClockFields::locate(&definition)?)
        } else {
            None
        };
        Ok(Self {
            definition,
            clock,
            rows: Vec::new(),
            day_offset: 0,
        })
    }

    pub fn definition(&self) -> &SensorDefinition {
        &self.definition
    }

    pub fn id(&self) -> &str {
        &self.definition.id
    }

    pub fn is_clock_source(&self) -> bool {
        self.clock.is_some()
    }

    /// Decode this sensor's samples out of `frame` and append one row per sample.
    ///
    /// A clock source labels its rows with its own time of day; every other
    /// sensor uses `shared_time` and appends nothing without it. All samples
    /// are decoded before any row is appended, so an error leaves the store
    /// untouched. Returns the number of rows appended.
    pub fn decode_into(&mut self, frame: &[u8], shared_time: Option<NaiveTime>) -> Result<usize> {
        let label = match (self.clock, shared_time) {
            (Some(clock), _) => TimeLabel::Clock(clock),
            (None, Some(time)) => TimeLabel::Shared(time),
            (None, None) => return Ok(0),
        };

        let def = &self.definition;
        let samples = extract_samples(frame, def.start_offset, def.sample_width, def.sample_count);

        let first = self.rows.first().map(|row| row.time);
        let mut previous = self.rows.last().map(|row| row.time);
        let mut day_offset = self.day_offset;
        let mut pending: Vec<SensorRow> = Vec::with_capacity(samples.len());

        for sample in samples {
            let values = decode_sample(sample, &def.fields)?;
            let time = match label {
                TimeLabel::Clock(clock) => clock.time_of_day(&values)?,
                TimeLabel::Shared(time) => time,
            };

            if previous.is_some_and(|prev| time < prev) {
                day_offset += 1;
            }
            previous = Some(time);

            let elapsed_seconds = match first.or_else(|| pending.first().map(|row| row.time)) {
                None => 0.0,
                Some(first) => {
                    seconds_between(first, time) + f64::from(day_offset) * SECONDS_PER_DAY
                }
            };

            pending.push(SensorRow {
                time,
                elapsed_seconds,
                values,
            });
        }

        let appended = pending.len();
        self.day_offset = day_offset;
        self.rows.extend(pending);
        trace!(
            "{}: appended {} row(s), {} total",
            self.definition.id,
            appended,
            self.rows.len()
        );
        Ok(appended)
    }

    pub fn rows(&self) -> &[SensorRow] {
        &self.rows
    }

    pub fn latest(&self) -> Option<&SensorRow> {
        self.rows.last()
    }

    /// Time label of the most recent row
    pub fn latest_time(&self) -> Option<NaiveTime> {
        self.rows.last().map(|row| row.time)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of a named field in a row of this store
    pub fn value(&self, row: &SensorRow, field: &str) -> Option<PhysicalValue> {
        let index = self.definition.field_index(field)?;
        row.values.get(index).copied()
    }

    /// Every value of one field, in row order
    pub fn column(&self, field: &str) -> Option<Vec<PhysicalValue>> {
        let index = self.definition.field_index(field)?;
        Some(self.rows.iter().map(|row| row.values[index]).collect())
    }

    /// Elapsed seconds of every row, in row order
    pub fn elapsed_series(&self) -> Vec<f64> {
        self.rows.iter().map(|row| row.elapsed_seconds).collect()
    }

    /// Drop every row, e.g. at the start of a new session
    pub fn reset(&mut self) {
        self.rows.clear();
        self.day_offset = 0;
    }
}

fn seconds_between(from: NaiveTime, to: NaiveTime) -> f64 {
    let delta = to.signed_duration_since(from);
    delta.num_microseconds().unwrap_or_default() as f64 / 1_000_000.0
}
