//! Field metadata for describing what data sources provide

use serde::{Deserialize, Serialize};

use crate::descriptor::{Conversion, FieldDescriptor};

/// Type of data a field contains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldType {
    /// Text data (e.g., a message line)
    Text,
    /// Real-valued reading (e.g., 101325.0 Pa)
    Numerical,
    /// Integer count (e.g., clock hour, frame sequence number)
    Integer,
    /// Single flag
    Boolean,
    /// Time of day or wall-clock timestamp
    Timestamp,
}

/// Purpose/role of a field in the data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldPurpose {
    /// Caption or label (e.g., "IMU")
    Caption,
    /// Decoded sensor value
    Value,
    /// Time label of the latest row
    Timestamp,
    /// Seconds since the sensor's first row
    Elapsed,
    /// Status or error flag
    Status,
    /// Generic/other purpose
    Other,
}

/// Metadata describing a single data field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMetadata {
    /// Unique identifier for this field
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Description of what this field represents
    pub description: String,
    /// Type of data this field contains
    pub field_type: FieldType,
    /// Purpose/role of this field
    pub purpose: FieldPurpose,
    /// Physical unit, empty when dimensionless
    #[serde(default)]
    pub unit: String,
}

impl FieldMetadata {
    /// Create a new field metadata
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        field_type: FieldType,
        purpose: FieldPurpose,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            field_type,
            purpose,
            unit: String::new(),
        }
    }

    /// Describe a decoded field
    pub fn from_descriptor(descriptor: &FieldDescriptor) -> Self {
        let (field_type, purpose) = match descriptor.conversion {
            Conversion::Bit { .. } => (FieldType::Boolean, FieldPurpose::Status),
            Conversion::Identity | Conversion::SubsecondMicros { .. } => {
                (FieldType::Integer, FieldPurpose::Value)
            }
            _ => (FieldType::Numerical, FieldPurpose::Value),
        };
        Self {
            id: descriptor.name.clone(),
            name: descriptor.name.replace('_', " "),
            description: format!(
                "{} bytes at offset {} ({:?} endian, {})",
                descriptor.width,
                descriptor.offset,
                descriptor.byte_order,
                if descriptor.signed { "signed" } else { "unsigned" }
            ),
            field_type,
            purpose,
            unit: descriptor.unit.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ByteOrder;

    #[test]
    fn test_flag_fields_are_status() {
        let descriptor = FieldDescriptor::new(
            "ERR_INIT_MAG",
            0,
            2,
            ByteOrder::Big,
            false,
            Conversion::Bit { bit: 4 },
        );
        let meta = FieldMetadata::from_descriptor(&descriptor);
        assert_eq!(meta.field_type, FieldType::Boolean);
        assert_eq!(meta.purpose, FieldPurpose::Status);
        assert_eq!(meta.name, "ERR INIT MAG");
    }

    #[test]
    fn test_scaled_fields_carry_unit() {
        let descriptor = FieldDescriptor::new(
            "Acc_X",
            0,
            2,
            ByteOrder::Big,
            true,
            Conversion::Quotient {
                divisor: 2048.0,
                offset: 0.0,
            },
        )
        .with_unit("g");
        let meta = FieldMetadata::from_descriptor(&descriptor);
        assert_eq!(meta.field_type, FieldType::Numerical);
        assert_eq!(meta.unit, "g");
        assert!(meta.description.contains("signed"));
    }
}
