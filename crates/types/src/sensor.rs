//! Sensor definitions and decoded rows

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::descriptor::{FieldDescriptor, PhysicalValue};
use crate::error::{Result, TelemetryError};

/// Where one sensor's samples live inside a composite frame and how to read them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorDefinition {
    /// Unique identifier (e.g. "imu")
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Offset of the sensor's region within the composite frame
    pub start_offset: usize,
    /// Bytes per sample
    pub sample_width: usize,
    /// Samples carried per frame
    #[serde(default = "default_sample_count")]
    pub sample_count: usize,
    /// Field layout of one sample
    pub fields: Vec<FieldDescriptor>,
    /// This sensor supplies the shared time label
    #[serde(default)]
    pub is_clock_source: bool,
}

fn default_sample_count() -> usize {
    1
}

impl SensorDefinition {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        start_offset: usize,
        sample_width: usize,
        fields: Vec<FieldDescriptor>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            start_offset,
            sample_width,
            sample_count: 1,
            fields,
            is_clock_source: false,
        }
    }

    pub fn with_sample_count(mut self, sample_count: usize) -> Self {
        self.sample_count = sample_count;
        self
    }

    pub fn as_clock_source(mut self) -> Self {
        self.is_clock_source = true;
        self
    }

    /// One past the last byte of the region, saturating on overflow
    pub fn region_end(&self) -> usize {
        self.checked_region_end().unwrap_or(usize::MAX)
    }

    /// One past the last byte of the region, or `None` if it does not fit a usize
    pub fn checked_region_end(&self) -> Option<usize> {
        self.sample_width
            .checked_mul(self.sample_count)
            .and_then(|len| self.start_offset.checked_add(len))
    }

    /// Index of a field by name
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Check every field against the sample width
    pub fn validate(&self) -> Result<()> {
        if self.sample_width == 0 {
            return Err(TelemetryError::Layout(format!(
                "sensor `{}` has a zero sample width",
                self.id
            )));
        }
        if self.checked_region_end().is_none() {
            return Err(TelemetryError::Layout(format!(
                "region of sensor `{}` does not fit in memory",
                self.id
            )));
        }
        for field in &self.fields {
            field.validate(self.sample_width)?;
        }
        Ok(())
    }
}

/// One decoded sample, appended to a sensor's table and never mutated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRow {
    /// Time-of-day label of the sample
    pub time: NaiveTime,
    /// Seconds since the sensor's first row
    pub elapsed_seconds: f64,
    /// One value per field descriptor, in descriptor order
    pub values: Vec<PhysicalValue>,
}
