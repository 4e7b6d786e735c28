//! CSV data log, one file per session

use chrono::NaiveDateTime;
use log::info;
use sigmundr_core::RowSink;
use sigmundr_types::Result;
use std::borrow::Cow;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Name of the data file of a session started at `session_start`
///
/// ISO-8601 to whole seconds with `:` replaced by `-`, so the name is valid
/// on every filesystem.
pub fn data_file_name(session_start: NaiveDateTime) -> String {
    let stamp = session_start.format("%Y-%m-%dT%H:%M:%S").to_string();
    format!("{}_data.csv", stamp.replace(':', "-"))
}

/// Row sink appending to a CSV file
///
/// Each row is written through to the file as soon as it arrives, so a
/// crash loses at most the row being written.
pub struct CsvLogSink {
    path: PathBuf,
    file: File,
}

impl CsvLogSink {
    /// Create the data directory if needed and an empty data file in it
    pub fn create(data_dir: &Path, session_start: NaiveDateTime) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let path = data_dir.join(data_file_name(session_start));
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;
        info!("Data file created: {}", path.display());
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RowSink for CsvLogSink {
    fn write_row(&mut self, row: &[String]) -> Result<()> {
        let mut line = row
            .iter()
            .map(|field| escape_field(field))
            .collect::<Vec<_>>()
            .join(",");
        line.push_str("\r\n");
        self.file.write_all(line.as_bytes())?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.file.sync_data()?;
        Ok(())
    }
}

/// Quote a field when it holds a delimiter, a quote or a line break
fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\r', '\n']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_micro_opt(14, 3, 7, 912_000)
            .unwrap()
    }

    fn row(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_file_name_has_no_colons() {
        assert_eq!(data_file_name(start()), "2024-06-01T14-03-07_data.csv");
    }

    #[test]
    fn test_escaping() {
        assert_eq!(escape_field("12.5"), "12.5");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_rows_are_appended_in_order() {
        let dir = tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let mut sink = CsvLogSink::create(&data_dir, start()).unwrap();
        sink.write_row(&row(&["Time", "seq", "cnt"])).unwrap();
        sink.write_row(&row(&["2024-06-01T14:03:08.000001", "1", "x,y"]))
            .unwrap();
        sink.flush().unwrap();

        assert!(sink.path().starts_with(&data_dir));
        let content = std::fs::read_to_string(sink.path()).unwrap();
        assert_eq!(
            content,
            "Time,seq,cnt\r\n2024-06-01T14:03:08.000001,1,\"x,y\"\r\n"
        );
    }
}
