//! Field descriptors: how one named value is laid out inside a sample
//! and how its raw integer becomes a physical value.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

use crate::error::{Result, TelemetryError};

/// Byte order of a multi-byte integer field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    #[default]
    Big,
    Little,
}

/// Unit conversion applied to the raw integer of a field
///
/// Every variant is a pure function of one integer, so descriptors stay
/// serializable and can be checked in isolation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Conversion {
    /// Raw count, kept as an integer
    Identity,
    /// Single bit `bit` of the raw word, as 0 or 1
    Bit { bit: u8 },
    /// `raw * factor`
    Scale { factor: f64 },
    /// `raw / divisor + offset`
    Quotient { divisor: f64, offset: f64 },
    /// ADC reading behind a voltage divider: `raw * reference / levels * divider`
    Adc {
        reference: f64,
        levels: f64,
        divider: f64,
    },
    /// Ratiometric transducer: `(raw - low) / (high - low) * range * gain`
    Span {
        low: f64,
        high: f64,
        range: f64,
        gain: f64,
    },
    /// Sub-second fraction in `divisions` steps, as whole microseconds
    SubsecondMicros { divisions: f64 },
}

impl Conversion {
    /// Apply the conversion to a raw integer
    pub fn apply(&self, raw: i64) -> PhysicalValue {
        let x = raw as f64;
        match *self {
            Conversion::Identity => PhysicalValue::Integer(raw),
            Conversion::Bit { bit } => {
                PhysicalValue::Integer(raw.checked_shr(u32::from(bit)).map_or(0, |v| v & 1))
            }
            Conversion::Scale { factor } => PhysicalValue::Real(x * factor),
            Conversion::Quotient { divisor, offset } => PhysicalValue::Real(x / divisor + offset),
            Conversion::Adc {
                reference,
                levels,
                divider,
            } => PhysicalValue::Real(x * reference / levels * divider),
            Conversion::Span {
                low,
                high,
                range,
                gain,
            } => PhysicalValue::Real((x - low) / (high - low) * range * gain),
            // Truncates toward zero, like the firmware's own tooling
            Conversion::SubsecondMicros { divisions } => {
                PhysicalValue::Integer((x * 1_000_000.0 / divisions) as i64)
            }
        }
    }
}

/// A decoded value in physical units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PhysicalValue {
    Integer(i64),
    Real(f64),
}

impl PhysicalValue {
    pub fn as_f64(&self) -> f64 {
        match *self {
            PhysicalValue::Integer(v) => v as f64,
            PhysicalValue::Real(v) => v,
        }
    }

    /// Integer view; real values are truncated toward zero
    pub fn as_i64(&self) -> i64 {
        match *self {
            PhysicalValue::Integer(v) => v,
            PhysicalValue::Real(v) => v as i64,
        }
    }
}

impl fmt::Display for PhysicalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhysicalValue::Integer(v) => write!(f, "{v}"),
            PhysicalValue::Real(v) => write!(f, "{v}"),
        }
    }
}

impl From<PhysicalValue> for serde_json::Value {
    fn from(value: PhysicalValue) -> Self {
        match value {
            PhysicalValue::Integer(v) => serde_json::Value::from(v),
            PhysicalValue::Real(v) => serde_json::Value::from(v),
        }
    }
}

/// Static schema entry for one named field of a sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Column name
    pub name: String,
    /// Byte offset within the sample
    pub offset: usize,
    /// Width in bytes (1 to 8)
    pub width: usize,
    #[serde(default)]
    pub byte_order: ByteOrder,
    /// Two's-complement when true
    #[serde(default)]
    pub signed: bool,
    pub conversion: Conversion,
    /// Physical unit, for display only
    #[serde(default)]
    pub unit: String,
}

impl FieldDescriptor {
    pub fn new(
        name: impl Into<String>,
        offset: usize,
        width: usize,
        byte_order: ByteOrder,
        signed: bool,
        conversion: Conversion,
    ) -> Self {
        Self {
            name: name.into(),
            offset,
            width,
            byte_order,
            signed,
            conversion,
            unit: String::new(),
        }
    }

    /// Attach a display unit
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Byte range read from the sample. The end saturates, so an offset near
    /// `usize::MAX` lands outside every sample instead of wrapping.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset.saturating_add(self.width)
    }

    /// Check that the width can be read into an i64 and that a bit flag
    /// lies inside the field
    pub fn validate_width(&self) -> Result<()> {
        if self.width == 0 || self.width > 8 {
            return Err(TelemetryError::Layout(format!(
                "field `{}` has unsupported width {} (expected 1 to 8 bytes)",
                self.name, self.width
            )));
        }
        if !self.signed && self.width == 8 {
            return Err(TelemetryError::Layout(format!(
                "unsigned field `{}` is wider than 7 bytes and would not fit an i64",
                self.name
            )));
        }
        if let Conversion::Bit { bit } = self.conversion {
            if usize::from(bit) >= 8 * self.width {
                return Err(TelemetryError::Layout(format!(
                    "bit {bit} of field `{}` is outside its {} byte(s)",
                    self.name, self.width
                )));
            }
        }
        Ok(())
    }

    /// Check the descriptor against the width of the samples it will read
    pub fn validate(&self, sample_width: usize) -> Result<()> {
        self.validate_width()?;
        if self.range().end > sample_width {
            return Err(TelemetryError::OutOfRange {
                field: self.name.clone(),
                start: self.offset,
                end: self.range().end,
                len: sample_width,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_conversion_extracts_single_flag() {
        let conversion = Conversion::Bit { bit: 10 };
        assert_eq!(
            conversion.apply(0b0000_0100_0000_0000),
            PhysicalValue::Integer(1)
        );
        assert_eq!(
            conversion.apply(0b0000_0011_1111_1111),
            PhysicalValue::Integer(0)
        );
    }

    #[test]
    fn test_bit_past_the_word_reads_zero() {
        let all_set = -1;
        assert_eq!(Conversion::Bit { bit: 70 }.apply(all_set).as_i64(), 0);
        assert_eq!(Conversion::Bit { bit: 63 }.apply(all_set).as_i64(), 1);
    }

    #[test]
    fn test_validate_rejects_bit_outside_field() {
        let json = r#"{"name":"flag","offset":0,"width":2,"conversion":{"kind":"bit","bit":70}}"#;
        let descriptor: FieldDescriptor = serde_json::from_str(json).unwrap();
        assert!(matches!(
            descriptor.validate(2),
            Err(TelemetryError::Layout(_))
        ));

        let flag = |bit| {
            FieldDescriptor::new("flag", 0, 2, ByteOrder::Big, false, Conversion::Bit { bit })
        };
        assert!(flag(16).validate(2).is_err());
        assert!(flag(15).validate(2).is_ok());
    }

    #[test]
    fn test_range_saturates_near_usize_max() {
        let descriptor = FieldDescriptor::new(
            "far",
            usize::MAX,
            2,
            ByteOrder::Big,
            false,
            Conversion::Identity,
        );
        assert_eq!(descriptor.range(), usize::MAX..usize::MAX);
        assert!(matches!(
            descriptor.validate(8),
            Err(TelemetryError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_subsecond_truncates_to_whole_microseconds() {
        let conversion = Conversion::SubsecondMicros { divisions: 256.0 };
        // 11 * 1e6 / 256 = 42968.75
        assert_eq!(conversion.apply(11), PhysicalValue::Integer(42968));
    }

    #[test]
    fn test_conversion_serializes_with_kind_tag() {
        let conversion = Conversion::Quotient {
            divisor: 2048.0,
            offset: 0.0,
        };
        let json = serde_json::to_string(&conversion).unwrap();
        assert!(json.contains("\"kind\":\"quotient\""));

        let back: Conversion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, conversion);
    }

    #[test]
    fn test_descriptor_defaults_when_deserializing() {
        let json = r#"{"name":"Timer","offset":0,"width":4,"conversion":{"kind":"identity"}}"#;
        let descriptor: FieldDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(descriptor.byte_order, ByteOrder::Big);
        assert!(!descriptor.signed);
        assert!(descriptor.unit.is_empty());
    }

    #[test]
    fn test_validate_rejects_field_past_sample_end() {
        let descriptor = FieldDescriptor::new(
            "Pressure",
            4,
            4,
            ByteOrder::Little,
            true,
            Conversion::Identity,
        );
        assert!(descriptor.validate(8).is_ok());
        assert!(matches!(
            descriptor.validate(6),
            Err(TelemetryError::OutOfRange { end: 8, len: 6, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_wide_unsigned() {
        let descriptor =
            FieldDescriptor::new("Wide", 0, 8, ByteOrder::Big, false, Conversion::Identity);
        assert!(matches!(
            descriptor.validate(8),
            Err(TelemetryError::Layout(_))
        ));
    }

    #[test]
    fn test_physical_value_into_json() {
        let value: serde_json::Value = PhysicalValue::Real(1.5).into();
        assert_eq!(value, serde_json::json!(1.5));
        let value: serde_json::Value = PhysicalValue::Integer(7).into();
        assert_eq!(value, serde_json::json!(7));
    }
}
