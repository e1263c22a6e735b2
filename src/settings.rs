//! Core Settings
//!
//! Tunables for the state core. Every field has a default matching the
//! behaviour the node layer expects, so an empty document is valid.
//!
//! ```rust,ignore
//! use strata::settings::CoreSettings;
//!
//! let settings = CoreSettings::from_json(r#"{ "memory": { "max_allocation_tries": 4 } }"#)?;
//! let core = RenderCore::new(settings);
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Top-level settings for a [`RenderCore`](crate::compile::RenderCore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreSettings {
    /// GPU memory arbitration.
    pub memory: MemorySettings,
    /// Transform memoization.
    pub transform: TransformSettings,
    /// Initial capacity reserved for each category stack.
    pub stack_capacity: usize,
}

impl Default for CoreSettings {
    fn default() -> Self {
        Self {
            memory: MemorySettings::default(),
            transform: TransformSettings::default(),
            stack_capacity: 32,
        }
    }
}

impl CoreSettings {
    /// Parses settings from a JSON document. Missing fields take their defaults.
    pub fn from_json(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }
}

/// Settings for the [`MemoryManager`](crate::memory::MemoryManager).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySettings {
    /// Upper bound on evict-and-retry rounds for a single allocation.
    pub max_allocation_tries: u32,
    /// Consult the armed surface error flag after every attempt.
    pub check_surface_errors: bool,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            max_allocation_tries: 10,
            check_surface_errors: true,
        }
    }
}

/// Settings for the transform stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformSettings {
    /// When false, transform cores stay at memoization level 0 and every
    /// build recomputes the full chain.
    pub memoize: bool,
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self { memoize: true }
    }
}
