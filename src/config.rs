use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::map::building::DEFAULT_SCAN_WINDOW;
use crate::map::objects::DEFAULT_MAX_OBJECTS;

/// Editor tunables, read from a JSON file. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// How far before the object section the building marker is searched for
    pub building_scan_window: usize,
    /// Largest prim count accepted from a map's object section
    pub max_objects: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            building_scan_window: DEFAULT_SCAN_WINDOW,
            max_objects: DEFAULT_MAX_OBJECTS,
        }
    }
}

impl EditorConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Like [`load`](Self::load), falling back to defaults when the file is absent.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }
}
