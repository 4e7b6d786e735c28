//! Tagged ASCII line protocol: tag table and decoded line frames

use serde::{Deserialize, Serialize};

/// First character of a header line
pub const START_HEADER: char = '@';
/// First character of a data line
pub const START_DATA: char = '#';
/// First character of a calibration line
pub const START_CALIBRATION: char = '%';
/// First character of a message line
pub const START_MESSAGE: char = '$';
/// Separates fields in header, data and calibration payloads
pub const DATA_SEPARATOR: char = '&';
/// Separates key from value in a calibration pair
pub const PAIR_SEPARATOR: char = ':';

/// Kind of a tagged line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    Header,
    Data,
    Calibration,
    Message,
}

impl FrameKind {
    /// Look up the frame kind for a tag character
    pub fn from_tag(tag: char) -> Option<Self> {
        match tag {
            START_HEADER => Some(FrameKind::Header),
            START_DATA => Some(FrameKind::Data),
            START_CALIBRATION => Some(FrameKind::Calibration),
            START_MESSAGE => Some(FrameKind::Message),
            _ => None,
        }
    }

    pub fn tag(&self) -> char {
        match self {
            FrameKind::Header => START_HEADER,
            FrameKind::Data => START_DATA,
            FrameKind::Calibration => START_CALIBRATION,
            FrameKind::Message => START_MESSAGE,
        }
    }
}

/// A decoded line: its kind and the payload after the tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineFrame<'a> {
    pub kind: FrameKind,
    pub payload: &'a str,
}

impl<'a> LineFrame<'a> {
    /// Split a line into tag and payload. `None` for empty or untagged lines.
    pub fn parse(line: &'a str) -> Option<Self> {
        let mut chars = line.chars();
        let kind = FrameKind::from_tag(chars.next()?)?;
        Some(Self {
            kind,
            payload: chars.as_str(),
        })
    }

    /// Payload split on the field separator
    pub fn fields(&self) -> impl Iterator<Item = &'a str> {
        self.payload.split(DATA_SEPARATOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_table_round_trip() {
        for kind in [
            FrameKind::Header,
            FrameKind::Data,
            FrameKind::Calibration,
            FrameKind::Message,
        ] {
            assert_eq!(FrameKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(FrameKind::from_tag(DATA_SEPARATOR), None);
        assert_eq!(FrameKind::from_tag(PAIR_SEPARATOR), None);
    }

    #[test]
    fn test_parse_splits_tag_from_payload() {
        let frame = LineFrame::parse("#12&3&4.5").unwrap();
        assert_eq!(frame.kind, FrameKind::Data);
        assert_eq!(frame.payload, "12&3&4.5");
        assert_eq!(frame.fields().collect::<Vec<_>>(), ["12", "3", "4.5"]);
    }

    #[test]
    fn test_parse_rejects_empty_and_untagged() {
        assert!(LineFrame::parse("").is_none());
        assert!(LineFrame::parse("TELEMETRY").is_none());
    }

    #[test]
    fn test_tag_only_line_has_empty_payload() {
        let frame = LineFrame::parse("$").unwrap();
        assert_eq!(frame.kind, FrameKind::Message);
        assert_eq!(frame.payload, "");
    }
}
