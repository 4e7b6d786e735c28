//! Data source trait for consumers of decoded telemetry

use anyhow::Result;
use serde_json::Value;
use sigmundr_types::FieldMetadata;
use std::collections::HashMap;
use std::time::Duration;

/// Metadata about a data source
#[derive(Debug, Clone)]
pub struct SourceMetadata {
    /// Unique identifier for this source
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Description of what this source provides
    pub description: String,
    /// Available data keys this source provides
    pub available_keys: Vec<String>,
    /// Recommended polling interval
    pub default_interval: Duration,
}

/// Trait for all data sources
///
/// Data sources copy the latest decoded values out of a shared session so
/// that dashboards, plotters and exporters never hold the session lock
/// while they render.
pub trait DataSource: Send + Sync {
    /// Get metadata about this source
    fn metadata(&self) -> &SourceMetadata;

    /// Get field metadata describing available data fields
    fn fields(&self) -> Vec<FieldMetadata>;

    /// Refresh the cached values from the session
    fn update(&mut self) -> Result<()>;

    /// Get current data values
    fn get_values(&self) -> HashMap<String, Value>;

    /// Get a reference to the internal values HashMap (if available)
    fn values_ref(&self) -> Option<&HashMap<String, Value>> {
        None
    }

    /// Get a specific value by key
    fn get_value(&self, key: &str) -> Option<Value> {
        if let Some(values) = self.values_ref() {
            values.get(key).cloned()
        } else {
            self.get_values().get(key).cloned()
        }
    }

    /// Whether the source has anything to show yet
    fn is_available(&self) -> bool {
        true
    }
}

/// Type-erased data source for dynamic dispatch
pub type BoxedDataSource = Box<dyn DataSource>;
