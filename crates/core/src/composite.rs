//! Composite frame decoder
//!
//! A composite frame carries the sample regions of several sensors at fixed
//! offsets. The clock source is decoded first and its latest time label is
//! shared with every other sensor of the same frame.

use chrono::NaiveTime;
use log::{debug, warn};
use sigmundr_types::{Result, SensorDefinition, TelemetryError};
use std::collections::HashSet;

use crate::store::SensorStore;

/// What one call to [`CompositeDecoder::decode_frame`] did
#[derive(Debug, Default)]
pub struct FrameReport {
    /// Time label shared with the dependent sensors
    pub shared_time: Option<NaiveTime>,
    /// Rows appended per sensor id, in layout order
    pub rows_appended: Vec<(String, usize)>,
    /// Sensors whose decode was aborted, with the reason
    pub errors: Vec<(String, TelemetryError)>,
}

impl FrameReport {
    pub fn total_rows(&self) -> usize {
        self.rows_appended.iter().map(|(_, n)| n).sum()
    }

    /// Rows appended for one sensor
    pub fn rows_for(&self, id: &str) -> usize {
        self.rows_appended
            .iter()
            .find(|(sensor, _)| sensor == id)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }
}

/// Decodes composite frames into one [`SensorStore`] per sensor
#[derive(Debug, Clone)]
pub struct CompositeDecoder {
    stores: Vec<SensorStore>,
    clock: usize,
}

impl CompositeDecoder {
    /// Build a decoder for a layout with exactly one clock source.
    ///
    /// Rejects duplicate sensor ids. Overlapping regions are allowed since a
    /// flight frame may map two sensors onto the same bytes; they are logged.
    pub fn new(definitions: Vec<SensorDefinition>) -> Result<Self> {
        let clocks: Vec<&str> = definitions
            .iter()
            .filter(|d| d.is_clock_source)
            .map(|d| d.id.as_str())
            .collect();
        if clocks.len() != 1 {
            return Err(TelemetryError::Layout(format!(
                "expected exactly one clock source, found {} ({})",
                clocks.len(),
                clocks.join(", ")
            )));
        }

        let mut ids = HashSet::new();
        for def in &definitions {
            if !ids.insert(def.id.as_str()) {
                return Err(TelemetryError::Layout(format!(
                    "sensor id `{}` is used twice",
                    def.id
                )));
            }
        }

        let mut regions: Vec<(usize, usize, &str)> = definitions
            .iter()
            .map(|d| (d.start_offset, d.region_end(), d.id.as_str()))
            .collect();
        regions.sort_unstable();
        for pair in regions.windows(2) {
            let ((_, end, a), (start, _, b)) = (pair[0], pair[1]);
            if start < end {
                warn!("Regions of `{a}` and `{b}` overlap on bytes {start}..{end}");
            }
        }

        let stores = definitions
            .into_iter()
            .map(SensorStore::new)
            .collect::<Result<Vec<_>>>()?;
        let clock = stores
            .iter()
            .position(SensorStore::is_clock_source)
            .ok_or_else(|| TelemetryError::Layout("no clock source".into()))?;

        Ok(Self { stores, clock })
    }

    /// Decode one composite frame, appending rows to every sensor store.
    ///
    /// Short frames are not errors: sensors whose region is missing just
    /// yield no rows. A sensor whose decode fails is skipped and reported
    /// without affecting the others.
    pub fn decode_frame(&mut self, frame: &[u8]) -> FrameReport {
        let mut report = FrameReport::default();

        let clock = &mut self.stores[self.clock];
        let clock_id = clock.id().to_string();
        match clock.decode_into(frame, None) {
            Ok(n) => report.rows_appended.push((clock_id, n)),
            Err(e) => {
                debug!("{clock_id}: clock decode failed: {e}");
                report.errors.push((clock_id, e));
            }
        }

        // Latest label, possibly from an earlier frame if this one had no clock
        let shared_time = clock.latest_time();
        report.shared_time = shared_time;
        if shared_time.is_none() {
            debug!("No clock reading yet; dependent sensors skipped");
        }

        for (index, store) in self.stores.iter_mut().enumerate() {
            if index == self.clock {
                continue;
            }
            let id = store.id().to_string();
            match store.decode_into(frame, shared_time) {
                Ok(n) => report.rows_appended.push((id, n)),
                Err(e) => {
                    debug!("{id}: decode failed: {e}");
                    report.errors.push((id, e));
                }
            }
        }

        report
    }

    pub fn stores(&self) -> &[SensorStore] {
        &self.stores
    }

    /// Store of one sensor by id
    pub fn store(&self, id: &str) -> Option<&SensorStore> {
        self.stores.iter().find(|s| s.id() == id)
    }

    pub fn clock_store(&self) -> &SensorStore {
        &self.stores[self.clock]
    }

    /// Bytes needed for every sensor to yield all of its samples
    pub fn frame_len(&self) -> usize {
        self.stores
            .iter()
            .map(|s| s.definition().region_end())
            .max()
            .unwrap_or(0)
    }

    /// Drop every decoded row
    pub fn reset(&mut self) {
        for store in &mut self.stores {
            store.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigmundr_types::{ByteOrder, Conversion, FieldDescriptor};

    fn clock(offset: usize) -> SensorDefinition {
        let part = |name: &str, at, conversion| {
            FieldDescriptor::new(name, at, 1, ByteOrder::Big, false, conversion)
        };
        SensorDefinition::new(
            "rtc",
            "RTC",
            offset,
            4,
            vec![
                part("hour", 0, Conversion::Identity),
                part("minute", 1, Conversion::Identity),
                part("second", 2, Conversion::Identity),
                part(
                    "microsecond",
                    3,
                    Conversion::SubsecondMicros { divisions: 256.0 },
                ),
            ],
        )
        .as_clock_source()
    }

    fn word(id: &str, offset: usize) -> SensorDefinition {
        SensorDefinition::new(
            id,
            id,
            offset,
            2,
            vec![FieldDescriptor::new(
                "value",
                0,
                2,
                ByteOrder::Big,
                false,
                Conversion::Identity,
            )],
        )
    }

    fn layout() -> Vec<SensorDefinition> {
        vec![word("a", 0), clock(2), word("b", 6)]
    }

    #[test]
    fn test_requires_exactly_one_clock() {
        assert!(matches!(
            CompositeDecoder::new(vec![word("a", 0)]),
            Err(TelemetryError::Layout(_))
        ));
        assert!(matches!(
            CompositeDecoder::new(vec![clock(0), clock(4)]),
            Err(TelemetryError::Layout(_))
        ));
    }

    #[test]
    fn test_rejects_duplicates_but_allows_overlap() {
        let duplicated = vec![clock(0), word("a", 4), word("a", 6)];
        assert!(CompositeDecoder::new(duplicated).is_err());

        let overlapping = vec![clock(0), word("a", 4), word("b", 5)];
        let mut decoder = CompositeDecoder::new(overlapping).unwrap();
        let report = decoder.decode_frame(&[0, 1, 12, 30, 0, 0, 0]);
        assert_eq!(report.rows_for("a"), 1);
        assert_eq!(report.rows_for("b"), 1);
    }

    #[test]
    fn test_clock_label_is_shared() {
        let mut decoder = CompositeDecoder::new(layout()).unwrap();
        let report = decoder.decode_frame(&[0, 1, 12, 30, 0, 0, 0, 2]);
        assert!(report.errors.is_empty());
        assert_eq!(report.total_rows(), 3);

        let expected = NaiveTime::from_hms_opt(12, 30, 0).unwrap();
        assert_eq!(report.shared_time, Some(expected));
        assert_eq!(decoder.store("a").unwrap().latest().unwrap().time, expected);
        assert_eq!(decoder.store("b").unwrap().latest().unwrap().time, expected);
    }

    #[test]
    fn test_truncated_frame_yields_rows_for_present_regions() {
        let mut decoder = CompositeDecoder::new(layout()).unwrap();
        let report = decoder.decode_frame(&[0, 1, 12, 30, 0, 0, 0]);
        assert!(report.errors.is_empty());
        assert_eq!(report.rows_for("rtc"), 1);
        assert_eq!(report.rows_for("a"), 1);
        assert_eq!(report.rows_for("b"), 0);
        assert_eq!(decoder.frame_len(), 8);
    }

    #[test]
    fn test_no_clock_yet_skips_dependents() {
        let mut decoder = CompositeDecoder::new(layout()).unwrap();
        let report = decoder.decode_frame(&[0, 1]);
        assert!(report.shared_time.is_none());
        assert_eq!(report.total_rows(), 0);
    }

    #[test]
    fn test_missing_clock_region_reuses_previous_label() {
        let mut decoder = CompositeDecoder::new(vec![word("a", 0), clock(4)]).unwrap();
        decoder.decode_frame(&[0, 1, 0, 0, 8, 0, 0, 0]);
        let report = decoder.decode_frame(&[0, 2]);
        assert_eq!(report.rows_for("rtc"), 0);
        assert_eq!(report.rows_for("a"), 1);
        assert_eq!(report.shared_time, NaiveTime::from_hms_opt(8, 0, 0));
    }

    #[test]
    fn test_failed_sensor_does_not_abort_frame() {
        let mut bad = word("bad", 8);
        bad.fields[0].offset = 1;
        let mut decoder = CompositeDecoder::new(vec![clock(0), word("a", 4), bad]).unwrap();
        let report = decoder.decode_frame(&[1, 0, 0, 0, 0, 9, 0, 0, 0, 0]);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].0, "bad");
        assert!(matches!(
            report.errors[0].1,
            TelemetryError::OutOfRange { .. }
        ));
        assert_eq!(report.rows_for("a"), 1);
        assert!(decoder.store("bad").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_clock_is_reported() {
        let mut decoder = CompositeDecoder::new(layout()).unwrap();
        let report = decoder.decode_frame(&[0, 1, 99, 0, 0, 0, 0, 2]);
        assert_eq!(report.errors.len(), 1);
        assert!(matches!(
            report.errors[0].1,
            TelemetryError::InvalidClock { .. }
        ));
        assert_eq!(report.total_rows(), 0);
    }

    #[test]
    fn test_reset_clears_all_stores() {
        let mut decoder = CompositeDecoder::new(layout()).unwrap();
        decoder.decode_frame(&[0, 1, 12, 30, 0, 0, 0, 2]);
        decoder.reset();
        assert!(decoder.stores().iter().all(SensorStore::is_empty));
    }
}
