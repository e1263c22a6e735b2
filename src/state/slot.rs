//! Scoped state slot: one LIFO per category, parametrized by policy.

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::core::{CoreFactory, CoreKey, CoreKind, SharedPayload, StateId};
use crate::errors::{Result, StrataError};

/// How a category combines a pushed core with the inherited value.
pub trait StatePolicy {
    /// Payload stored in the category's cores.
    type Core: SharedPayload;
    /// Effective value seen by descendants.
    type Value: fmt::Debug + 'static;

    const CATEGORY: CoreKind;

    /// Composite categories merge with the inherited value; override
    /// categories replace it.
    const COMPOSITE: bool;

    /// Value in effect when nothing is pushed.
    fn default_value() -> Rc<Self::Value>;

    /// Effective value after pushing `own` beneath `inherited`.
    ///
    /// `inherited` is `None` when no ancestor pushed a core of this category.
    fn compose(inherited: Option<&Rc<Self::Value>>, own: &Rc<Self::Core>) -> Rc<Self::Value>;
}

#[derive(Debug)]
struct SlotEntry<V> {
    key: CoreKey,
    state_id: StateId,
    value: Rc<V>,
}

/// Memoized composition for one core.
#[derive(Debug)]
struct Composed<V> {
    inherited: Option<Rc<V>>,
    version: u64,
    value: Rc<V>,
}

impl<V> Composed<V> {
    fn matches(&self, inherited: Option<&Rc<V>>, version: u64) -> bool {
        if self.version != version {
            return false;
        }
        match (&self.inherited, inherited) {
            (None, None) => true,
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Category stack. `current()` is the innermost open push, or the default
/// value when the stack is empty.
pub struct StateSlot<P: StatePolicy> {
    entries: Vec<SlotEntry<P::Value>>,
    default: Rc<P::Value>,
    composed: FxHashMap<CoreKey, Composed<P::Value>>,
    dirty: bool,
}

impl<P: StatePolicy> fmt::Debug for StateSlot<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateSlot")
            .field("category", &P::CATEGORY)
            .field("depth", &self.entries.len())
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

impl<P: StatePolicy> Default for StateSlot<P> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl<P: StatePolicy> StateSlot<P> {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            default: P::default_value(),
            composed: FxHashMap::default(),
            dirty: true,
        }
    }

    /// Pushes the core behind `key` and publishes the resulting value.
    pub fn push(&mut self, factory: &CoreFactory, key: CoreKey) -> Result<()> {
        let core = factory.core(key).ok_or(StrataError::CoreNotFound)?;
        let own = <P::Core as SharedPayload>::extract(core.payload()).ok_or(
            StrataError::CoreKindMismatch {
                expected: P::CATEGORY,
                found: core.kind(),
            },
        )?;
        let inherited = self.entries.last().map(|entry| &entry.value);

        let value = if P::COMPOSITE {
            let version = core.version();
            let hit = self
                .composed
                .get(&key)
                .filter(|cached| cached.matches(inherited, version))
                .map(|cached| Rc::clone(&cached.value));
            match hit {
                Some(value) => value,
                None => {
                    let value = P::compose(inherited, own);
                    self.composed.insert(
                        key,
                        Composed {
                            inherited: inherited.cloned(),
                            version,
                            value: Rc::clone(&value),
                        },
                    );
                    value
                }
            }
        } else {
            P::compose(inherited, own)
        };

        log::trace!(
            "push {} core '{}' (depth {})",
            P::CATEGORY.name(),
            core.core_id(),
            self.entries.len() + 1
        );

        self.entries.push(SlotEntry {
            key,
            state_id: core.state_id(),
            value,
        });
        self.dirty = true;
        Ok(())
    }

    /// Retreats to the enclosing value.
    pub fn pop(&mut self) {
        if self.entries.pop().is_none() {
            log::error!("pop on empty {} stack", P::CATEGORY.name());
            debug_assert!(false, "unbalanced pop on {} stack", P::CATEGORY.name());
            return;
        }
        log::trace!("pop {} (depth {})", P::CATEGORY.name(), self.entries.len());
        self.dirty = true;
    }

    /// Effective value for the current scope.
    #[inline]
    #[must_use]
    pub fn current(&self) -> &Rc<P::Value> {
        self.entries.last().map_or(&self.default, |entry| &entry.value)
    }

    /// State id of the current core; the reserved default id when empty.
    #[inline]
    #[must_use]
    pub fn current_state_id(&self) -> StateId {
        self.entries
            .last()
            .map_or(P::CATEGORY.default_state_id(), |entry| entry.state_id)
    }

    /// Key of the innermost pushed core.
    #[inline]
    #[must_use]
    pub fn current_key(&self) -> Option<CoreKey> {
        self.entries.last().map(|entry| entry.key)
    }

    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn default_value(&self) -> &Rc<P::Value> {
        &self.default
    }

    /// Returns and clears the changed flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Re-arms the slot for a new pass: empties the stack, reinstalls the
    /// default and forgets compositions of destroyed cores.
    pub fn reset(&mut self, factory: &CoreFactory) {
        if !self.entries.is_empty() {
            log::warn!(
                "{} stack still {} deep at start of pass",
                P::CATEGORY.name(),
                self.entries.len()
            );
        }
        self.entries.clear();
        self.composed.retain(|key, _| factory.contains(*key));
        self.dirty = true;
    }

    /// Drops all memoized compositions.
    pub fn clear_cache(&mut self) {
        self.composed.clear();
    }

    /// Number of memoized compositions.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.composed.len()
    }
}
