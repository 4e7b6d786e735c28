//! Field extraction engine
//!
//! Slices fixed-width samples out of a frame and reads typed integers out of
//! each sample according to a [`FieldDescriptor`].

use sigmundr_types::{ByteOrder, FieldDescriptor, PhysicalValue, Result, TelemetryError};

/// Split up to `sample_count` consecutive samples of `sample_width` bytes out
/// of `frame`, starting at `start_offset`.
///
/// Short frames yield fewer samples; a trailing partial sample is dropped.
pub fn extract_samples(
    frame: &[u8],
    start_offset: usize,
    sample_width: usize,
    sample_count: usize,
) -> Vec<&[u8]> {
    if sample_width == 0 || start_offset >= frame.len() {
        return Vec::new();
    }
    frame[start_offset..]
        .chunks_exact(sample_width)
        .take(sample_count)
        .collect()
}

/// Read the raw integer a descriptor points at, before conversion
pub fn read_raw(sample: &[u8], descriptor: &FieldDescriptor) -> Result<i64> {
    let range = descriptor.range();
    let bytes = sample
        .get(range.clone())
        .filter(|b| !b.is_empty() && b.len() <= 8)
        .ok_or_else(|| TelemetryError::OutOfRange {
            field: descriptor.name.clone(),
            start: range.start,
            end: range.end,
            len: sample.len(),
        })?;

    let width = bytes.len();
    let mut unsigned: u64 = 0;
    match descriptor.byte_order {
        ByteOrder::Big => {
            for &b in bytes {
                unsigned = (unsigned << 8) | u64::from(b);
            }
        }
        ByteOrder::Little => {
            for &b in bytes.iter().rev() {
                unsigned = (unsigned << 8) | u64::from(b);
            }
        }
    }

    if descriptor.signed && width < 8 {
        // Sign-extend from the field's top bit
        let shift = 64 - 8 * width as u32;
        Ok(((unsigned << shift) as i64) >> shift)
    } else {
        Ok(unsigned as i64)
    }
}

/// Read one field from a sample and convert it to a physical value
pub fn extract_field(sample: &[u8], descriptor: &FieldDescriptor) -> Result<PhysicalValue> {
    let raw = read_raw(sample, descriptor)?;
    Ok(descriptor.conversion.apply(raw))
}

/// Decode every field of a sample, in descriptor order
pub fn decode_sample(sample: &[u8], descriptors: &[FieldDescriptor]) -> Result<Vec<PhysicalValue>> {
    descriptors
        .iter()
        .map(|descriptor| extract_field(sample, descriptor))
        .collect()
}
