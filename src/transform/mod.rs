//! Model Transforms
//!
//! Transform cores form their own tree, separate from the scene graph:
//! every record points at the transform core that enclosed it during the
//! last compile, and each parent lists the children pushed beneath it.
//! Records live in the factory's arena and are addressed by [`CoreKey`],
//! so both the upward composition walk and the downward dirty propagation
//! are plain loops over keys.
//!
//! # Memoization
//!
//! | Level | Meaning                                   | Cached            |
//! |-------|-------------------------------------------|-------------------|
//! | 0     | parameters may change every compile       | nothing           |
//! | 1     | parameters fixed this episode             | local matrix      |
//! | 2     | parameters and whole ancestor chain fixed | composed matrix   |
//!
//! A record climbs one level per compile visit and drops back to 0 when its
//! parameters change. Dirty flags, not levels, decide what a build must
//! recompute; the level only lets a clean record skip the ancestor walk.

mod stack;
mod tree;

use glam::{Mat4, Vec3};
use smallvec::SmallVec;

use crate::core::{CoreKey, StateId};

pub use stack::TransformStack;

/// Parameters a transform node derives its local matrix from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformParams {
    /// Rotation of `angle` degrees about `axis`.
    Rotate { angle: f32, axis: Vec3 },
    Translate(Vec3),
    Scale(Vec3),
    Matrix(Mat4),
}

impl TransformParams {
    #[must_use]
    pub fn default_rotate() -> Self {
        TransformParams::Rotate {
            angle: 0.0,
            axis: Vec3::Z,
        }
    }

    #[must_use]
    pub fn default_translate() -> Self {
        TransformParams::Translate(Vec3::ZERO)
    }

    #[must_use]
    pub fn default_scale() -> Self {
        TransformParams::Scale(Vec3::ONE)
    }

    #[must_use]
    pub fn default_matrix() -> Self {
        TransformParams::Matrix(Mat4::IDENTITY)
    }

    /// Local matrix for these parameters. A zero rotation axis yields identity.
    #[must_use]
    pub fn local_matrix(&self) -> Mat4 {
        match *self {
            TransformParams::Rotate { angle, axis } => {
                if axis.length_squared() <= f32::EPSILON {
                    Mat4::IDENTITY
                } else {
                    Mat4::from_axis_angle(axis.normalize(), angle.to_radians())
                }
            }
            TransformParams::Translate(offset) => Mat4::from_translation(offset),
            TransformParams::Scale(factor) => Mat4::from_scale(factor),
            TransformParams::Matrix(matrix) => matrix,
        }
    }
}

/// How much of a record's matrix computation is cached across compiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum MemoLevel {
    #[default]
    Dynamic = 0,
    FixedParams = 1,
    FixedModelSpace = 2,
}

/// Composed model matrix of a transform scope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformMatrices {
    pub matrix: Mat4,
    /// Inverse-transpose of `matrix`.
    pub normal_matrix: Mat4,
    pub state_id: StateId,
}

impl TransformMatrices {
    /// The identity transform in effect outside every transform node.
    #[must_use]
    pub fn identity(state_id: StateId) -> Self {
        Self {
            matrix: Mat4::IDENTITY,
            normal_matrix: Mat4::IDENTITY,
            state_id,
        }
    }
}

/// Payload of an `Xform` core.
#[derive(Debug, Clone)]
pub struct TransformCore {
    params: TransformParams,
    fixed_params: bool,

    local: Mat4,
    local_valid: bool,
    matrix: Mat4,
    normal_matrix: Mat4,

    parent: Option<CoreKey>,
    children: SmallVec<[CoreKey; 4]>,

    dirty: bool,
    matrix_dirty: bool,
    memo_level: MemoLevel,

    visit_pass: u64,
    visits: u32,
    prev_visits: u32,
}

impl TransformCore {
    #[must_use]
    pub fn new(params: TransformParams) -> Self {
        Self {
            params,
            fixed_params: true,
            local: Mat4::IDENTITY,
            local_valid: false,
            matrix: Mat4::IDENTITY,
            normal_matrix: Mat4::IDENTITY,
            parent: None,
            children: SmallVec::new(),
            dirty: true,
            matrix_dirty: true,
            memo_level: MemoLevel::Dynamic,
            visit_pass: 0,
            visits: 0,
            prev_visits: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn params(&self) -> &TransformParams {
        &self.params
    }

    /// Whether the parameters are expected to stay fixed between mutations.
    #[inline]
    #[must_use]
    pub fn fixed_params(&self) -> bool {
        self.fixed_params
    }

    #[inline]
    #[must_use]
    pub fn memo_level(&self) -> MemoLevel {
        self.memo_level
    }

    /// Whether the composed matrix is stale.
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether the local matrix must be refreshed before use.
    #[inline]
    #[must_use]
    pub fn is_matrix_dirty(&self) -> bool {
        self.matrix_dirty
    }

    /// Composed matrix from the last build.
    #[inline]
    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        self.matrix
    }

    #[inline]
    #[must_use]
    pub fn normal_matrix(&self) -> Mat4 {
        self.normal_matrix
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<CoreKey> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[CoreKey] {
        &self.children
    }

    /// Whether the record was reached through more than one parent in the
    /// current or previous compile.
    #[must_use]
    pub fn is_instanced(&self) -> bool {
        self.visits > 1 || self.prev_visits > 1
    }

    /// Recomputes the local matrix if it may be stale.
    fn refresh_local(&mut self) {
        if !self.matrix_dirty {
            return;
        }
        if self.memo_level == MemoLevel::Dynamic || !self.local_valid {
            self.local = self.params.local_matrix();
            self.local_valid = true;
        }
        self.matrix_dirty = false;
    }

    /// Marks this record stale; descendants are handled by the tree walk.
    fn mark_dirty(&mut self) {
        self.dirty = true;
        self.matrix_dirty = true;
    }

    /// Counts a compile visit and reports whether the record is instanced.
    fn visit(&mut self, pass: u64) -> bool {
        if self.visit_pass != pass {
            self.visit_pass = pass;
            self.prev_visits = self.visits;
            self.visits = 0;
        }
        self.visits += 1;
        self.is_instanced()
    }

    /// Registers `child` as pushed beneath this record. The entry stays
    /// until the child is pushed under another parent, so children skipped
    /// by a pass are still reached by dirty propagation.
    fn adopt(&mut self, child: CoreKey) {
        if !self.children.contains(&child) {
            self.children.push(child);
        }
    }

    fn disown(&mut self, child: CoreKey) {
        self.children.retain(|key| *key != child);
    }

    /// Advances the memoization level by at most one step for this visit.
    fn advance_memo(&mut self, parent_fixed: bool, instanced: bool, memoize: bool) {
        if !memoize || !self.fixed_params {
            self.memo_level = MemoLevel::Dynamic;
            self.mark_dirty();
            return;
        }
        match self.memo_level {
            MemoLevel::Dynamic => self.memo_level = MemoLevel::FixedParams,
            MemoLevel::FixedParams if parent_fixed && !instanced => {
                self.memo_level = MemoLevel::FixedModelSpace;
            }
            MemoLevel::FixedModelSpace if instanced || !parent_fixed => {
                self.memo_level = MemoLevel::FixedParams;
                self.dirty = true;
            }
            _ => {}
        }
    }

    fn matrices(&self, state_id: StateId) -> TransformMatrices {
        TransformMatrices {
            matrix: self.matrix,
            normal_matrix: self.normal_matrix,
            state_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_axis_rotation_is_identity() {
        let params = TransformParams::Rotate {
            angle: 45.0,
            axis: Vec3::ZERO,
        };
        assert_eq!(params.local_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn memo_climbs_one_level_per_visit() {
        let mut record = TransformCore::new(TransformParams::default_translate());
        record.advance_memo(true, false, true);
        assert_eq!(record.memo_level(), MemoLevel::FixedParams);
        record.advance_memo(true, false, true);
        assert_eq!(record.memo_level(), MemoLevel::FixedModelSpace);

        record.advance_memo(true, true, true);
        assert_eq!(record.memo_level(), MemoLevel::FixedParams);
        assert!(record.is_dirty());
    }

    #[test]
    fn memo_disabled_stays_dynamic() {
        let mut record = TransformCore::new(TransformParams::default_scale());
        record.advance_memo(true, false, false);
        record.advance_memo(true, false, false);
        assert_eq!(record.memo_level(), MemoLevel::Dynamic);
        assert!(record.is_matrix_dirty());
    }

    #[test]
    fn visits_roll_over_between_passes() {
        let mut record = TransformCore::new(TransformParams::default_matrix());
        assert!(!record.visit(1));
        assert!(record.visit(1));
        // Still instanced in the next pass because of the previous one.
        assert!(record.visit(2));
        assert!(!record.visit(3));
    }
}
