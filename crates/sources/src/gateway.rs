//! Data source over the status of a telemetry session

use anyhow::{anyhow, Result};
use serde_json::Value;
use sigmundr_core::{
    read_session, DataSource, FieldMetadata, FieldPurpose, FieldType, SharedSession,
    SourceMetadata,
};
use std::collections::HashMap;
use std::time::Duration;

const STATUS_KEYS: [&str; 6] = [
    "reading",
    "port",
    "header_captured",
    "message_count",
    "last_message",
    "total_errors",
];

const COUNTER_KEYS: [&str; 10] = [
    "lines_received",
    "decode_errors",
    "lines_ignored",
    "data_rows",
    "data_before_header",
    "repeated_captures",
    "messages",
    "frames_decoded",
    "sensor_errors",
    "sink_errors",
];

/// Reading state, port, counters and messages of the receiving gateway
pub struct GatewaySource {
    metadata: SourceMetadata,
    session: SharedSession,
    values: HashMap<String, Value>,
}

impl GatewaySource {
    pub fn new(session: SharedSession) -> Self {
        let metadata = SourceMetadata {
            id: "gateway".to_string(),
            name: "Gateway".to_string(),
            description: "Link status and ingestion counters".to_string(),
            available_keys: STATUS_KEYS
                .iter()
                .chain(COUNTER_KEYS.iter())
                .map(|k| k.to_string())
                .collect(),
            default_interval: Duration::from_millis(500),
        };
        Self {
            metadata,
            session,
            values: HashMap::with_capacity(16),
        }
    }
}

impl DataSource for GatewaySource {
    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    fn fields(&self) -> Vec<FieldMetadata> {
        let mut fields = vec![
            FieldMetadata::new(
                "reading",
                "Reading",
                "Whether the link is being read",
                FieldType::Boolean,
                FieldPurpose::Status,
            ),
            FieldMetadata::new(
                "port",
                "Port",
                "Serial port of the receiver",
                FieldType::Text,
                FieldPurpose::Caption,
            ),
            FieldMetadata::new(
                "header_captured",
                "Header captured",
                "Whether a header line has been received",
                FieldType::Boolean,
                FieldPurpose::Status,
            ),
            FieldMetadata::new(
                "message_count",
                "Messages",
                "Message lines received",
                FieldType::Integer,
                FieldPurpose::Value,
            ),
            FieldMetadata::new(
                "last_message",
                "Last message",
                "Most recent message line",
                FieldType::Text,
                FieldPurpose::Value,
            ),
            FieldMetadata::new(
                "total_errors",
                "Errors",
                "Decode, sensor and sink errors so far",
                FieldType::Integer,
                FieldPurpose::Status,
            ),
        ];
        for key in COUNTER_KEYS {
            fields.push(FieldMetadata::new(
                key,
                key.replace('_', " "),
                "Ingestion counter",
                FieldType::Integer,
                FieldPurpose::Other,
            ));
        }
        fields
    }

    fn update(&mut self) -> Result<()> {
        let snapshot = read_session(&self.session).snapshot();

        self.values.clear();
        self.values
            .insert("reading".to_string(), Value::from(snapshot.reading));
        self.values.insert(
            "port".to_string(),
            snapshot.port.map(Value::from).unwrap_or(Value::Null),
        );
        self.values.insert(
            "header_captured".to_string(),
            Value::from(snapshot.header.is_some()),
        );
        self.values.insert(
            "message_count".to_string(),
            Value::from(snapshot.message_count as u64),
        );
        self.values.insert(
            "last_message".to_string(),
            snapshot.last_message.map(Value::from).unwrap_or(Value::Null),
        );
        self.values.insert(
            "total_errors".to_string(),
            Value::from(snapshot.stats.total_errors()),
        );

        let Value::Object(counters) = serde_json::to_value(&snapshot.stats)? else {
            return Err(anyhow!("ingestion counters are not a JSON object"));
        };
        self.values.extend(counters);
        Ok(())
    }

    fn get_values(&self) -> HashMap<String, Value> {
        self.values.clone()
    }

    fn values_ref(&self) -> Option<&HashMap<String, Value>> {
        Some(&self.values)
    }
}
