//! Data source over one sensor of a telemetry session
//!
//! Copies the latest decoded row of the sensor out of the shared session.

use anyhow::{anyhow, Result};
use serde_json::Value;
use sigmundr_core::{
    read_session, DataSource, FieldMetadata, FieldPurpose, FieldType, SharedSession,
    SourceMetadata,
};
use sigmundr_types::SensorDefinition;
use std::collections::HashMap;
use std::time::Duration;

/// Latest values of one sensor
pub struct SensorSource {
    metadata: SourceMetadata,
    session: SharedSession,
    definition: SensorDefinition,
    rows: usize,

    /// Cached output values - updated in update(), returned by reference in values_ref()
    values: HashMap<String, Value>,
}

impl SensorSource {
    /// Create a source for the sensor `sensor_id` of `session`
    pub fn new(session: SharedSession, sensor_id: &str) -> Result<Self> {
        let definition = read_session(&session)
            .decoder()
            .store(sensor_id)
            .map(|store| store.definition().clone())
            .ok_or_else(|| anyhow!("Unknown sensor: {}", sensor_id))?;

        let mut available_keys = vec![
            "caption".to_string(),
            "time".to_string(),
            "elapsed_seconds".to_string(),
            "rows".to_string(),
        ];
        available_keys.extend(definition.field_names().map(str::to_string));

        let metadata = SourceMetadata {
            id: definition.id.clone(),
            name: definition.name.clone(),
            description: format!(
                "{} sample(s) of {} bytes at frame offset {}",
                definition.sample_count, definition.sample_width, definition.start_offset
            ),
            available_keys,
            default_interval: Duration::from_millis(100),
        };

        Ok(Self {
            metadata,
            session,
            definition,
            rows: 0,
            values: HashMap::with_capacity(16),
        })
    }

    /// Rows the sensor had at the last update
    pub fn row_count(&self) -> usize {
        self.rows
    }
}

impl DataSource for SensorSource {
    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    fn fields(&self) -> Vec<FieldMetadata> {
        let mut fields = vec![
            FieldMetadata::new(
                "caption",
                "Caption",
                "Sensor name",
                FieldType::Text,
                FieldPurpose::Caption,
            ),
            FieldMetadata::new(
                "time",
                "Time",
                "Time of day of the latest row",
                FieldType::Timestamp,
                FieldPurpose::Timestamp,
            ),
            FieldMetadata::new(
                "elapsed_seconds",
                "Seconds since start",
                "Seconds between the first and the latest row",
                FieldType::Numerical,
                FieldPurpose::Elapsed,
            ),
        ];
        fields.extend(
            self.definition
                .fields
                .iter()
                .map(FieldMetadata::from_descriptor),
        );
        fields
    }

    fn update(&mut self) -> Result<()> {
        self.values.clear();
        self.values.insert(
            "caption".to_string(),
            Value::from(self.definition.name.clone()),
        );

        let session = read_session(&self.session);
        let store = session
            .decoder()
            .store(&self.definition.id)
            .ok_or_else(|| anyhow!("Sensor {} left the session", self.definition.id))?;

        self.rows = store.len();
        self.values
            .insert("rows".to_string(), Value::from(self.rows as u64));

        if let Some(row) = store.latest() {
            self.values.insert(
                "time".to_string(),
                Value::from(row.time.format("%H:%M:%S%.6f").to_string()),
            );
            self.values
                .insert("elapsed_seconds".to_string(), Value::from(row.elapsed_seconds));
            for (field, value) in self.definition.fields.iter().zip(&row.values) {
                self.values.insert(field.name.clone(), Value::from(*value));
            }
        }
        Ok(())
    }

    fn get_values(&self) -> HashMap<String, Value> {
        self.values.clone()
    }

    fn values_ref(&self) -> Option<&HashMap<String, Value>> {
        Some(&self.values)
    }

    fn is_available(&self) -> bool {
        self.rows > 0
    }
}
