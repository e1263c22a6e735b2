use crate::core::{CoreFactory, CoreKey, CoreKind};
use crate::errors::{Result, StrataError};
use crate::transform::{MemoLevel, TransformMatrices};

/// Model-transform stack driven by the compile traversal.
///
/// Pushing a transform core re-parents it under the enclosing transform,
/// advances its memoization level and builds its composed matrix, which
/// stays current for the whole scope.
#[derive(Debug)]
pub struct TransformStack {
    entries: Vec<(CoreKey, TransformMatrices)>,
    memoize: bool,
    dirty: bool,
}

impl Default for TransformStack {
    fn default() -> Self {
        Self::new(true, 0)
    }
}

impl TransformStack {
    #[must_use]
    pub fn new(memoize: bool, capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            memoize,
            dirty: true,
        }
    }

    /// Enters the scope of transform core `key` during compile pass `pass`.
    pub fn push(&mut self, factory: &mut CoreFactory, key: CoreKey, pass: u64) -> Result<()> {
        if self.entries.iter().any(|(open, _)| *open == key) {
            let name = factory
                .core(key)
                .map(|core| core.core_id().to_string())
                .unwrap_or_default();
            return Err(StrataError::illegal(
                "transform nesting",
                name,
                "a transform core not already open in this branch",
            ));
        }

        let parent = self.entries.last().map(|(open, _)| *open);
        let parent_fixed = match parent {
            Some(parent) => factory.transform(parent)?.memo_level() == MemoLevel::FixedModelSpace,
            None => true,
        };

        let record = factory.transform_record_mut(key)?;
        let previous = record.parent;
        let reparented = previous != parent;
        if reparented {
            record.parent = parent;
            if record.memo_level == MemoLevel::FixedModelSpace {
                record.memo_level = MemoLevel::FixedParams;
            }
        }
        let instanced = record.visit(pass);
        record.advance_memo(parent_fixed, instanced, self.memoize);

        if reparented {
            log::trace!("transform re-parented; invalidating subtree");
            if let Some(old) = previous {
                // The old parent may have been released since.
                if let Ok(old) = factory.transform_record_mut(old) {
                    old.disown(key);
                }
            }
            factory.set_transform_dirty(key)?;
        }
        if let Some(parent) = parent {
            factory.transform_record_mut(parent)?.adopt(key);
        }

        let matrices = factory.build_transform(key)?;
        self.entries.push((key, matrices));
        self.dirty = true;
        Ok(())
    }

    pub fn pop(&mut self) {
        if self.entries.pop().is_none() {
            log::error!("pop on empty xform stack");
            debug_assert!(false, "unbalanced pop on xform stack");
            return;
        }
        self.dirty = true;
    }

    /// Composed transform of the innermost open scope, or identity.
    #[must_use]
    pub fn current(&self) -> TransformMatrices {
        self.entries.last().map_or_else(
            || TransformMatrices::identity(CoreKind::Xform.default_state_id()),
            |(_, matrices)| *matrices,
        )
    }

    #[must_use]
    pub fn current_key(&self) -> Option<CoreKey> {
        self.entries.last().map(|(key, _)| *key)
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn reset(&mut self) {
        if !self.entries.is_empty() {
            log::warn!("xform stack still {} deep at start of pass", self.entries.len());
        }
        self.entries.clear();
        self.dirty = true;
    }
}
