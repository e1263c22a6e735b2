//! Camera (projection) category.
//!
//! Override policy: the nearest camera above a drawable defines its
//! projection; with none pushed the default 45° perspective applies.

use std::rc::Rc;
use std::str::FromStr;

use glam::{Mat4, Vec4};

use crate::core::{ContextRestore, CoreKind};
use crate::errors::{Result, StrataError};
use crate::state::slot::StatePolicy;

/// Projection family named by a camera node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionKind {
    Perspective,
    Frustum,
    Ortho,
}

impl FromStr for ProjectionKind {
    type Err = StrataError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "perspective" => Ok(ProjectionKind::Perspective),
            "frustum" => Ok(ProjectionKind::Frustum),
            "ortho" => Ok(ProjectionKind::Ortho),
            other => Err(StrataError::illegal(
                "optics type",
                other,
                "'perspective', 'frustum' or 'ortho'",
            )),
        }
    }
}

/// Projection parameters. Angles are in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Optics {
    Perspective {
        fovy: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    Frustum {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    },
    Ortho {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    },
}

impl Optics {
    /// Optics a camera falls back to when configured with a kind only.
    #[must_use]
    pub fn defaults_for(kind: ProjectionKind) -> Self {
        match kind {
            ProjectionKind::Perspective => Optics::Perspective {
                fovy: 60.0,
                aspect: 1.0,
                near: 0.1,
                far: 10000.0,
            },
            ProjectionKind::Frustum => Optics::Frustum {
                left: -1.0,
                right: 1.0,
                bottom: -1.0,
                top: 1.0,
                near: 0.1,
                far: 10000.0,
            },
            ProjectionKind::Ortho => Optics::Ortho {
                left: -1.0,
                right: 1.0,
                bottom: -1.0,
                top: 1.0,
                near: 0.1,
                far: 10000.0,
            },
        }
    }

    #[must_use]
    pub fn kind(&self) -> ProjectionKind {
        match self {
            Optics::Perspective { .. } => ProjectionKind::Perspective,
            Optics::Frustum { .. } => ProjectionKind::Frustum,
            Optics::Ortho { .. } => ProjectionKind::Ortho,
        }
    }

    /// Projection matrix with OpenGL clip conventions (depth in [-1, 1]).
    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        match *self {
            Optics::Perspective {
                fovy,
                aspect,
                near,
                far,
            } => Mat4::perspective_rh_gl(fovy.to_radians(), aspect, near, far),
            Optics::Frustum {
                left,
                right,
                bottom,
                top,
                near,
                far,
            } => frustum_matrix(left, right, bottom, top, near, far),
            Optics::Ortho {
                left,
                right,
                bottom,
                top,
                near,
                far,
            } => Mat4::orthographic_rh_gl(left, right, bottom, top, near, far),
        }
    }
}

// glFrustum
fn frustum_matrix(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    let rl = right - left;
    let tb = top - bottom;
    let fnr = far - near;
    Mat4::from_cols(
        Vec4::new(2.0 * near / rl, 0.0, 0.0, 0.0),
        Vec4::new(0.0, 2.0 * near / tb, 0.0, 0.0),
        Vec4::new((right + left) / rl, (top + bottom) / tb, -(far + near) / fnr, -1.0),
        Vec4::new(0.0, 0.0, -2.0 * far * near / fnr, 0.0),
    )
}

/// Camera payload: optics plus the projection matrix derived from them.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraCore {
    optics: Optics,
    matrix: Mat4,
}

impl Default for CameraCore {
    /// The default projection in effect when no camera is pushed.
    fn default() -> Self {
        Self::with_optics(Optics::Perspective {
            fovy: 45.0,
            aspect: 1.0,
            near: 0.1,
            far: 10000.0,
        })
    }
}

impl CameraCore {
    /// A freshly allocated camera core: 60° perspective.
    #[must_use]
    pub fn new() -> Self {
        Self::with_optics(Optics::defaults_for(ProjectionKind::Perspective))
    }

    #[must_use]
    pub fn with_optics(optics: Optics) -> Self {
        Self {
            matrix: optics.matrix(),
            optics,
        }
    }

    #[inline]
    #[must_use]
    pub fn optics(&self) -> &Optics {
        &self.optics
    }

    /// Replaces the optics; the projection matrix is rebuilt immediately.
    pub fn set_optics(&mut self, optics: Optics) {
        self.optics = optics;
        self.matrix = optics.matrix();
    }

    /// Switches projection family by name, using that family's defaults.
    pub fn set_projection(&mut self, kind: &str) -> Result<()> {
        let kind = kind.parse::<ProjectionKind>()?;
        self.set_optics(Optics::defaults_for(kind));
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        self.matrix
    }
}

impl ContextRestore for CameraCore {}

/// Override policy for the camera stack.
#[derive(Debug)]
pub struct CameraPolicy;

impl StatePolicy for CameraPolicy {
    type Core = CameraCore;
    type Value = CameraCore;

    const CATEGORY: CoreKind = CoreKind::Camera;
    const COMPOSITE: bool = false;

    fn default_value() -> Rc<CameraCore> {
        Rc::new(CameraCore::default())
    }

    fn compose(_inherited: Option<&Rc<CameraCore>>, own: &Rc<CameraCore>) -> Rc<CameraCore> {
        Rc::clone(own)
    }
}
