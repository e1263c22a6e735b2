//! Core Factory
//!
//! Creates, shares and destroys [`Core`]s. Cores live in one arena keyed by
//! [`CoreKey`]; a per-category bucket maps each caller-supplied name to its
//! key so repeated acquisitions of the same `(kind, id)` share one record.
//! Anonymous cores are never entered in a bucket.
//!
//! # Lifecycle
//!
//! ```text
//! get_core ──► ALLOCATED(use_count = 1) ◄──► SHARED(use_count > 1)
//!                      │
//!                  put_core (use_count → 0)
//!                      ▼
//!                  RELEASED  (removed from bucket, state id recycled)
//! ```

use std::rc::Rc;

use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::core::{
    ChangeTracker, Core, CoreId, CoreKey, CoreKind, CorePayload, MutGuard, NodeKind,
    SharedPayload, StateIdPool,
};
use crate::errors::{Result, StrataError};
use crate::transform::TransformCore;

/// Owner of every live core.
#[derive(Debug)]
pub struct CoreFactory {
    pub(crate) cores: SlotMap<CoreKey, Core>,
    buckets: [FxHashMap<Box<str>, CoreKey>; CoreKind::COUNT],
    state_ids: StateIdPool,
}

impl Default for CoreFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl CoreFactory {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cores: SlotMap::with_key(),
            buckets: std::array::from_fn(|_| FxHashMap::default()),
            state_ids: StateIdPool::new(),
        }
    }

    // ========================================================================
    // Acquire / Release
    // ========================================================================

    /// Acquires a core for a node of kind `kind`.
    ///
    /// With a `core_id` naming an existing core of the same category, that core
    /// is shared and its use count incremented. Otherwise a new core is
    /// allocated with a fresh state id; without a `core_id` the core is
    /// anonymous and keyed by its own state id.
    pub fn get_core(&mut self, kind: NodeKind, core_id: Option<&str>) -> CoreKey {
        let core_kind = kind.core_kind();

        if let Some(name) = core_id {
            if let Some(&key) = self.buckets[core_kind.index()].get(name) {
                if let Some(core) = self.cores.get_mut(key) {
                    core.use_count += 1;
                    log::trace!(
                        "Sharing {} core '{}' (use count {})",
                        core_kind.name(),
                        name,
                        core.use_count
                    );
                    return key;
                }
            }
        }

        let state_id = self.state_ids.acquire();
        let core_id = match core_id {
            Some(name) => CoreId::Named(name.into()),
            None => CoreId::Anonymous(state_id),
        };

        log::debug!(
            "Allocating {} core '{}' (state id {})",
            core_kind.name(),
            core_id,
            state_id.get()
        );

        let key = self.cores.insert(Core {
            kind: core_kind,
            core_id: core_id.clone(),
            state_id,
            use_count: 1,
            version: ChangeTracker::new(),
            payload: CorePayload::for_node(kind),
        });
        if let CoreId::Named(name) = core_id {
            self.buckets[core_kind.index()].insert(name, key);
        }
        key
    }

    /// Releases one use of a core, destroying it when no user remains.
    ///
    /// Returns `true` if this call destroyed the core. Releasing a core that
    /// is already gone is a logged no-op.
    pub fn put_core(&mut self, key: CoreKey) -> bool {
        let Some(core) = self.cores.get_mut(key) else {
            log::warn!("Excess release of an already destroyed core - ignored");
            return false;
        };

        if core.use_count == 0 {
            log::warn!("Excess release of {} core '{}' - ignored", core.kind.name(), core.core_id);
            return false;
        }

        core.use_count -= 1;
        if core.use_count > 0 {
            return false;
        }

        let Some(core) = self.cores.remove(key) else {
            return false;
        };
        if let CoreId::Named(name) = &core.core_id {
            self.buckets[core.kind.index()].remove(name);
        }
        self.state_ids.release(core.state_id);

        log::debug!(
            "Destroyed {} core '{}' (state id {} recycled)",
            core.kind.name(),
            core.core_id,
            core.state_id.get()
        );
        true
    }

    /// Whether a core of the given node kind and id exists.
    #[must_use]
    pub fn has_core(&self, kind: NodeKind, core_id: &str) -> bool {
        self.find_core(kind, core_id).is_some()
    }

    /// Looks up the key of a named core without acquiring it.
    #[must_use]
    pub fn find_core(&self, kind: NodeKind, core_id: &str) -> Option<CoreKey> {
        self.buckets[kind.core_kind().index()].get(core_id).copied()
    }

    // ========================================================================
    // Context Restore
    // ========================================================================

    /// Runs the context-restore hook of every live core that has one.
    ///
    /// Returns the number of cores whose hook acted.
    pub fn context_restored(&mut self) -> usize {
        let mut restored = 0;
        for core in self.cores.values_mut() {
            if core.payload.restore_context() {
                core.version.changed();
                restored += 1;
            }
        }
        if restored > 0 {
            log::debug!("Context restored: {restored} cores will re-upload GPU resources");
        }
        restored
    }

    // ========================================================================
    // Access
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn core(&self, key: CoreKey) -> Option<&Core> {
        self.cores.get(key)
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, key: CoreKey) -> bool {
        self.cores.contains_key(key)
    }

    /// Number of live cores across all categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cores.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cores.is_empty()
    }

    /// Number of live cores in one category.
    #[must_use]
    pub fn count(&self, kind: CoreKind) -> usize {
        self.cores.values().filter(|core| core.kind == kind).count()
    }

    /// Number of state ids currently in use by live cores.
    #[must_use]
    pub fn live_state_ids(&self) -> usize {
        self.state_ids.live()
    }

    /// Kind of the core behind `key`.
    pub fn kind_of(&self, key: CoreKey) -> Result<CoreKind> {
        self.cores
            .get(key)
            .map(Core::kind)
            .ok_or(StrataError::CoreNotFound)
    }

    /// Shared payload of a category core.
    pub fn payload<T: SharedPayload>(&self, key: CoreKey) -> Result<&Rc<T>> {
        let core = self.cores.get(key).ok_or(StrataError::CoreNotFound)?;
        T::extract(&core.payload).ok_or(StrataError::CoreKindMismatch {
            expected: T::KIND,
            found: core.kind,
        })
    }

    /// Mutable access to a category payload. The core's version is bumped
    /// when the guard drops.
    pub fn payload_mut<T: SharedPayload>(&mut self, key: CoreKey) -> Result<MutGuard<'_, T>> {
        let core = self.cores.get_mut(key).ok_or(StrataError::CoreNotFound)?;
        let found = core.kind;
        let Core {
            payload, version, ..
        } = core;
        let inner = T::extract_mut(payload).ok_or(StrataError::CoreKindMismatch {
            expected: T::KIND,
            found,
        })?;
        Ok(version.guard(Rc::make_mut(inner)))
    }

    /// Applies `f` to a category payload, bumping the core's version.
    pub fn modify<T: SharedPayload, R>(
        &mut self,
        key: CoreKey,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R> {
        let mut guard = self.payload_mut::<T>(key)?;
        Ok(f(&mut guard))
    }

    /// Transform record of an `Xform` core.
    pub fn transform(&self, key: CoreKey) -> Result<&TransformCore> {
        let core = self.cores.get(key).ok_or(StrataError::CoreNotFound)?;
        match &core.payload {
            CorePayload::Xform(record) => Ok(record),
            _ => Err(StrataError::CoreKindMismatch {
                expected: CoreKind::Xform,
                found: core.kind,
            }),
        }
    }

    /// Transform record without dirty propagation; tree operations only.
    #[inline]
    pub(crate) fn transform_record_mut(&mut self, key: CoreKey) -> Result<&mut TransformCore> {
        let core = self.cores.get_mut(key).ok_or(StrataError::CoreNotFound)?;
        let found = core.kind;
        match &mut core.payload {
            CorePayload::Xform(record) => Ok(record),
            _ => Err(StrataError::CoreKindMismatch {
                expected: CoreKind::Xform,
                found,
            }),
        }
    }

    /// Bumps the version of a core after an in-place change.
    pub(crate) fn mark_changed(&mut self, key: CoreKey) {
        if let Some(core) = self.cores.get_mut(key) {
            core.version.changed();
        }
    }

    /// Keys of every live core.
    pub fn keys(&self) -> impl Iterator<Item = CoreKey> + '_ {
        self.cores.keys()
    }
}
