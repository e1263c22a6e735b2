//! Error Types
//!
//! This module defines the error types used throughout the state core.
//!
//! # Overview
//!
//! The main error type [`StrataError`] covers every failure that can abort a
//! compile pass:
//! - Configuration errors (invalid category parameters)
//! - GPU memory exhaustion after the eviction protocol gave up
//! - Stale or mistyped core handles
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for `std::result::Result<T, StrataError>`.
//!
//! ```rust,ignore
//! use strata::errors::Result;
//!
//! fn compile_branch(pass: &mut CompilePass<'_>) -> Result<()> {
//!     let _camera = pass.push(camera_key)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::core::CoreKind;

/// The main error type for the state core.
///
/// Every variant is fatal for the pass that raised it: there is no
/// degraded-rendering fallback, the caller unwinds the compile and reports.
#[derive(Error, Debug)]
pub enum StrataError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// A category parameter had a value outside its supported set.
    #[error("Illegal node config: unsupported {property} '{value}' - expected one of {expected}")]
    IllegalConfig {
        /// Name of the offending property
        property: &'static str,
        /// The rejected value
        value: String,
        /// Human-readable list of accepted values
        expected: &'static str,
    },

    // ========================================================================
    // Resource Errors
    // ========================================================================
    /// GPU memory was exhausted and no evictor could free enough of it.
    #[error("Out of memory - failed to allocate memory for {description}")]
    OutOfMemory {
        /// What the caller was trying to allocate
        description: String,
    },

    /// An allocation attempt failed for a reason other than exhaustion.
    #[error("Allocation of {description} failed: {reason}")]
    AllocationFailed {
        /// What the caller was trying to allocate
        description: String,
        /// The failure reported by the allocation callback
        reason: String,
    },

    // ========================================================================
    // Core Handle Errors
    // ========================================================================
    /// The handle does not refer to a live core (it was released).
    #[error("Core not found: the handle refers to a released core")]
    CoreNotFound,

    /// The core behind the handle belongs to another category.
    #[error("Core kind mismatch: expected {expected:?}, found {found:?}")]
    CoreKindMismatch {
        /// The kind the operation needed
        expected: CoreKind,
        /// The kind the core actually has
        found: CoreKind,
    },

    // ========================================================================
    // Settings Errors
    // ========================================================================
    /// Settings document could not be parsed.
    #[error("Settings parse error: {0}")]
    Settings(#[from] serde_json::Error),
}

impl StrataError {
    /// Shorthand for building an [`StrataError::IllegalConfig`].
    pub(crate) fn illegal(
        property: &'static str,
        value: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        StrataError::IllegalConfig {
            property,
            value: value.into(),
            expected,
        }
    }

    /// Whether this error came from GPU memory exhaustion.
    #[must_use]
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, StrataError::OutOfMemory { .. })
    }
}

/// Alias for `Result<T, StrataError>`.
pub type Result<T> = std::result::Result<T, StrataError>;
