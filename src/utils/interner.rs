//! Global string interner.
//!
//! Composite state hashes (light layouts, fresnel channels, reflect layers)
//! are short strings used as shader-permutation cache keys. Interning them
//! turns every cache lookup into an integer comparison.

use std::sync::LazyLock;

use lasso::{Spur, ThreadedRodeo};

static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::new);

/// Compact integer identifier for an interned string.
pub type Symbol = Spur;

/// Interns a string, returning the existing symbol if it is already known.
#[inline]
pub fn intern(s: &str) -> Symbol {
    INTERNER.get_or_intern(s)
}

/// Looks up a string without interning it.
#[inline]
pub fn get(s: &str) -> Option<Symbol> {
    INTERNER.get(s)
}

/// Resolves a symbol back to its string.
#[inline]
pub fn resolve(sym: Symbol) -> &'static str {
    INTERNER.resolve(&sym)
}

/// Interns the hashes of the default composite cores so the first compile
/// pass does not pay for them.
pub fn preload_default_hashes() {
    let common = ["", "ambientdvdirsdvdirsv", "d;", "s;", "a;", "r;", "e;"];
    for hash in common {
        intern(hash);
    }
}
