//! Utility Module
//!
//! - [`interner`]: String interning for composite state hash keys
//!
//! ```rust,ignore
//! use strata::utils::interner;
//!
//! let a = interner::intern("dirsdv");
//! let b = interner::intern("dirsdv");
//! assert_eq!(a, b); // O(1) comparison
//! ```

pub mod interner;

pub use interner::Symbol;
