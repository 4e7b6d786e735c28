//! Persistence seam for accepted data rows

use sigmundr_types::Result;
use std::sync::{Arc, Mutex};

/// Destination of the header row and of every accepted data row
pub trait RowSink: Send + Sync {
    /// Append one row
    fn write_row(&mut self, row: &[String]) -> Result<()>;

    /// Flush buffered rows, if any
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Type-erased sink for dynamic dispatch
pub type BoxedRowSink = Box<dyn RowSink>;

/// Sink that discards everything, used when logging to disk is disabled
#[derive(Debug, Default)]
pub struct NullSink;

impl RowSink for NullSink {
    fn write_row(&mut self, _row: &[String]) -> Result<()> {
        Ok(())
    }
}

/// Sink that keeps rows in memory behind a shared handle
///
/// Cloning the sink clones the handle, so a test or a dashboard can keep one
/// copy while the session owns the other.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    rows: Arc<Mutex<Vec<Vec<String>>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every row written so far
    pub fn rows(&self) -> Vec<Vec<String>> {
        self.rows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl RowSink for MemorySink {
    fn write_row(&mut self, row: &[String]) -> Result<()> {
        self.rows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(row.to_vec());
        Ok(())
    }
}
