//! Transform tree operations: mutation, lazy invalidation, composition.

use glam::Mat4;
use smallvec::SmallVec;

use crate::core::{CoreFactory, CoreKey};
use crate::errors::{Result, StrataError};
use crate::transform::{MemoLevel, TransformMatrices, TransformParams};

impl CoreFactory {
    /// Changes the parameters of a transform core.
    ///
    /// The record drops to memoization level 0 and it and its whole subtree
    /// are marked dirty.
    pub fn modify_transform<R>(
        &mut self,
        key: CoreKey,
        f: impl FnOnce(&mut TransformParams) -> R,
    ) -> Result<R> {
        let record = self.transform_record_mut(key)?;
        let result = f(&mut record.params);
        record.memo_level = MemoLevel::Dynamic;
        record.local_valid = false;

        self.mark_changed(key);
        self.set_transform_dirty(key)?;
        Ok(result)
    }

    /// Replaces the parameters of a transform core.
    pub fn set_transform(&mut self, key: CoreKey, params: TransformParams) -> Result<()> {
        self.modify_transform(key, |current| *current = params)
    }

    /// Declares whether the parameters stay fixed between mutations.
    /// Records with dynamic parameters never leave level 0.
    pub fn set_transform_fixed(&mut self, key: CoreKey, fixed: bool) -> Result<()> {
        let record = self.transform_record_mut(key)?;
        if record.fixed_params == fixed {
            return Ok(());
        }
        record.fixed_params = fixed;
        record.memo_level = MemoLevel::Dynamic;
        self.set_transform_dirty(key)
    }

    /// Marks a transform core and every descendant stale.
    ///
    /// Nothing is recomputed here; the next build pulls fresh matrices.
    /// Descendants that had cached their composed matrix fall back to
    /// caching the local matrix only.
    pub fn set_transform_dirty(&mut self, key: CoreKey) -> Result<()> {
        let record = self.transform_record_mut(key)?;
        record.mark_dirty();

        let mut pending: SmallVec<[(CoreKey, CoreKey); 16]> =
            record.children.iter().map(|&child| (key, child)).collect();

        while let Some((parent, child)) = pending.pop() {
            let Ok(record) = self.transform_record_mut(child) else {
                continue;
            };
            // Stale entry; the child moved under another parent.
            if record.parent != Some(parent) {
                continue;
            }
            record.mark_dirty();
            if record.memo_level == MemoLevel::FixedModelSpace {
                record.memo_level = MemoLevel::FixedParams;
            }
            pending.extend(record.children.iter().map(|&grandchild| (child, grandchild)));
        }
        Ok(())
    }

    /// Builds the composed model matrix of a transform core.
    ///
    /// A clean record at level 2 returns its cached matrices. Otherwise the
    /// local matrix is refreshed and ancestor matrices are pre-multiplied,
    /// walking upward until the root or the first clean level-2 ancestor,
    /// whose composed matrix stands in for the rest of the chain.
    pub fn build_transform(&mut self, key: CoreKey) -> Result<TransformMatrices> {
        let state_id = self
            .core(key)
            .map(|core| core.state_id())
            .ok_or(StrataError::CoreNotFound)?;

        let record = self.transform_record_mut(key)?;
        if record.memo_level == MemoLevel::FixedModelSpace && !record.dirty {
            return Ok(record.matrices(state_id));
        }

        record.refresh_local();
        let mut composed = record.local;
        let mut cursor = record.parent;

        while let Some(ancestor) = cursor {
            let Ok(record) = self.transform_record_mut(ancestor) else {
                log::debug!("transform parent released; treating as root");
                break;
            };
            if record.memo_level == MemoLevel::FixedModelSpace && !record.dirty {
                composed = record.matrix * composed;
                break;
            }
            record.refresh_local();
            composed = record.local * composed;
            cursor = record.parent;
        }

        let record = self.transform_record_mut(key)?;
        record.matrix = composed;
        record.normal_matrix = normal_matrix(composed);
        record.dirty = false;
        Ok(record.matrices(state_id))
    }
}

/// Inverse-transpose; singular matrices (zero scale) fall back to identity.
fn normal_matrix(matrix: Mat4) -> Mat4 {
    if matrix.determinant().abs() <= f32::EPSILON {
        return Mat4::IDENTITY;
    }
    matrix.inverse().transpose()
}
