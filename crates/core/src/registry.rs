//! Registry of composite frame layouts

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use sigmundr_types::SensorDefinition;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Function that builds the sensor definitions of a layout
pub type LayoutFactory = fn() -> Vec<SensorDefinition>;

/// Information about a registered layout
#[derive(Clone)]
pub struct LayoutInfo {
    pub id: String,
    pub display_name: String,
    pub factory: LayoutFactory,
}

/// Registry of frame layouts by id
pub struct Registry {
    layouts: HashMap<String, LayoutInfo>,
}

impl Registry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            layouts: HashMap::new(),
        }
    }

    /// Register a layout; a second registration under the same id replaces the first
    pub fn register_layout(&mut self, id: &str, display_name: &str, factory: LayoutFactory) {
        self.layouts.insert(
            id.to_string(),
            LayoutInfo {
                id: id.to_string(),
                display_name: display_name.to_string(),
                factory,
            },
        );
    }

    /// Build the sensor definitions of a layout by id
    pub fn create_layout(&self, id: &str) -> Result<Vec<SensorDefinition>> {
        let info = self
            .layouts
            .get(id)
            .ok_or_else(|| anyhow!("Unknown layout: {}", id))?;
        Ok((info.factory)())
    }

    pub fn get_layout_info(&self, id: &str) -> Option<&LayoutInfo> {
        self.layouts.get(id)
    }

    /// List all registered layouts, sorted by id
    pub fn list_layouts(&self) -> Vec<LayoutInfo> {
        let mut layouts: Vec<LayoutInfo> = self.layouts.values().cloned().collect();
        layouts.sort_by(|a, b| a.id.cmp(&b.id));
        layouts
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_REGISTRY: Lazy<RwLock<Registry>> = Lazy::new(|| RwLock::new(Registry::new()));

/// Read access to the global registry
pub fn global_registry() -> RwLockReadGuard<'static, Registry> {
    GLOBAL_REGISTRY
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Write access to the global registry, for registration at startup
pub fn global_registry_mut() -> RwLockWriteGuard<'static, Registry> {
    GLOBAL_REGISTRY
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
