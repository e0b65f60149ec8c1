//! Runtime configuration
//!
//! A small JSON document; every field has a default so an empty object is a
//! valid configuration.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimplexError};

/// Settings that shape how a system talks to its host and writes files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimplexConfig {
    /// Multiplier applied to slider ranges pushed to the host.
    #[serde(default = "default_slider_mul")]
    pub slider_mul: f64,

    /// Write the positional version 1 definition instead of version 3.
    #[serde(default)]
    pub legacy: bool,

    /// Pretty-print written definitions.
    #[serde(default)]
    pub pretty: bool,

    /// Record undo snapshots.
    #[serde(default = "default_true")]
    pub undo_enabled: bool,

    /// Create missing host objects while loading instead of failing.
    #[serde(default = "default_true")]
    pub create_missing: bool,

    /// Unknown fields preserved for forward compatibility.
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_json::Value>,
}

fn default_slider_mul() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

impl Default for SimplexConfig {
    fn default() -> Self {
        Self {
            slider_mul: default_slider_mul(),
            legacy: false,
            pretty: false,
            undo_enabled: true,
            create_missing: true,
            unknown_fields: HashMap::new(),
        }
    }
}

impl SimplexConfig {
    /// Load a configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| SimplexError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: SimplexConfig = serde_json::from_str(&content)?;
        if !config.slider_mul.is_finite() || config.slider_mul <= 0.0 {
            return Err(SimplexError::InvalidValue {
                field: "slider_mul".to_string(),
                reason: format!("must be a positive number, got {}", config.slider_mul),
            });
        }
        Ok(config)
    }
}
