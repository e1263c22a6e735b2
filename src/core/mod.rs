//! State Cores
//!
//! A *core* is the shared, reference-counted configuration record behind one
//! or more scene-graph nodes of the same category. Nodes acquire cores from
//! the [`CoreFactory`] by `(kind, id)`; two nodes naming the same id share
//! one core, so mutating it through either node is seen by both.
//!
//! # Kinds
//!
//! The set of categories is closed ([`CoreKind`]). Several surface node kinds
//! map onto one category ([`NodeKind::core_kind`]): every transform-producing
//! node (`rotate`, `translate`, `scale`, `matrix`, `xform`) shares the
//! `Xform` bucket, so a `rotate` and a `translate` node may reference one
//! shared transform core.
//!
//! # Payloads
//!
//! Payloads are a closed tagged union ([`CorePayload`]). Category payloads
//! that are pushed onto state stacks live behind `Rc` so a push snapshots
//! them in O(1); mutation goes through copy-on-write and bumps the core's
//! version.

mod factory;
mod state_id;
mod version;

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use slotmap::new_key_type;

use crate::errors::{Result, StrataError};
use crate::state::camera::CameraCore;
use crate::state::depth_buffer::DepthBufferCore;
use crate::state::fresnel::FresnelCore;
use crate::state::lights::LightsCore;
use crate::state::material::MaterialCore;
use crate::state::reflect::ReflectCore;
use crate::transform::{TransformCore, TransformParams};

pub use factory::CoreFactory;
pub use state_id::{StateId, StateIdPool};
pub use version::{ChangeTracker, MutGuard};

new_key_type! {
    /// Handle to a live core inside a [`CoreFactory`].
    pub struct CoreKey;
}

// ============================================================================
// Kinds
// ============================================================================

/// Backing category of a core. Each category has its own bucket in the
/// factory and its own state stack during compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CoreKind {
    Camera,
    Lights,
    Material,
    DepthBuffer,
    Fresnel,
    Reflect,
    Xform,
}

impl CoreKind {
    /// Number of categories.
    pub const COUNT: usize = 7;

    /// Every category, in bucket order.
    pub const ALL: [CoreKind; Self::COUNT] = [
        CoreKind::Camera,
        CoreKind::Lights,
        CoreKind::Material,
        CoreKind::DepthBuffer,
        CoreKind::Fresnel,
        CoreKind::Reflect,
        CoreKind::Xform,
    ];

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            CoreKind::Camera => "camera",
            CoreKind::Lights => "lights",
            CoreKind::Material => "material",
            CoreKind::DepthBuffer => "depthBuffer",
            CoreKind::Fresnel => "fresnel",
            CoreKind::Reflect => "reflect",
            CoreKind::Xform => "xform",
        }
    }

    /// Reserved state id of this category's default core.
    #[inline]
    #[must_use]
    pub fn default_state_id(self) -> StateId {
        StateId::reserved(self.index() as u32)
    }
}

/// Surface node kind as named by the node layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Camera,
    Lights,
    Material,
    DepthBuffer,
    Fresnel,
    Reflect,
    Rotate,
    Translate,
    Scale,
    Matrix,
    Xform,
}

impl NodeKind {
    /// Resolves the node kind to the category whose bucket backs it.
    #[must_use]
    pub fn core_kind(self) -> CoreKind {
        match self {
            NodeKind::Camera => CoreKind::Camera,
            NodeKind::Lights => CoreKind::Lights,
            NodeKind::Material => CoreKind::Material,
            NodeKind::DepthBuffer => CoreKind::DepthBuffer,
            NodeKind::Fresnel => CoreKind::Fresnel,
            NodeKind::Reflect => CoreKind::Reflect,
            NodeKind::Rotate
            | NodeKind::Translate
            | NodeKind::Scale
            | NodeKind::Matrix
            | NodeKind::Xform => CoreKind::Xform,
        }
    }
}

impl From<CoreKind> for NodeKind {
    fn from(kind: CoreKind) -> Self {
        match kind {
            CoreKind::Camera => NodeKind::Camera,
            CoreKind::Lights => NodeKind::Lights,
            CoreKind::Material => NodeKind::Material,
            CoreKind::DepthBuffer => NodeKind::DepthBuffer,
            CoreKind::Fresnel => NodeKind::Fresnel,
            CoreKind::Reflect => NodeKind::Reflect,
            CoreKind::Xform => NodeKind::Xform,
        }
    }
}

impl FromStr for NodeKind {
    type Err = StrataError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "camera" => NodeKind::Camera,
            "lights" => NodeKind::Lights,
            "material" => NodeKind::Material,
            "depthBuffer" => NodeKind::DepthBuffer,
            "fresnel" => NodeKind::Fresnel,
            "reflect" => NodeKind::Reflect,
            "rotate" => NodeKind::Rotate,
            "translate" => NodeKind::Translate,
            "scale" => NodeKind::Scale,
            "matrix" => NodeKind::Matrix,
            "xform" => NodeKind::Xform,
            other => {
                return Err(StrataError::illegal(
                    "node type",
                    other,
                    "'camera', 'lights', 'material', 'depthBuffer', 'fresnel', 'reflect', \
                     'rotate', 'translate', 'scale', 'matrix' or 'xform'",
                ));
            }
        })
    }
}

// ============================================================================
// Identity
// ============================================================================

/// Identifier of a core within its category bucket.
///
/// Caller-named cores are shareable; anonymous cores are keyed by their own
/// state id and can never be matched by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CoreId {
    Named(Box<str>),
    Anonymous(StateId),
}

impl CoreId {
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        matches!(self, CoreId::Anonymous(_))
    }
}

impl fmt::Display for CoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreId::Named(name) => f.write_str(name),
            CoreId::Anonymous(id) => write!(f, "#{}", id.get()),
        }
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// GPU context-loss recovery hook.
///
/// Payloads holding GPU-resident resources report it and drop those
/// resources when the context comes back, so they are re-uploaded lazily.
pub trait ContextRestore {
    /// Whether this payload references GPU resources that a lost context invalidated.
    fn holds_gpu_resources(&self) -> bool {
        false
    }

    /// Called once per restored context for payloads that hold GPU resources.
    fn context_restored(&mut self) {}
}

/// Category payloads that are shared behind `Rc` and pushed onto state stacks.
pub trait SharedPayload: Clone + ContextRestore + fmt::Debug + 'static {
    const KIND: CoreKind;

    fn extract(payload: &CorePayload) -> Option<&Rc<Self>>;

    fn extract_mut(payload: &mut CorePayload) -> Option<&mut Rc<Self>>;
}

macro_rules! shared_payload {
    ($ty:ty, $variant:ident) => {
        impl SharedPayload for $ty {
            const KIND: CoreKind = CoreKind::$variant;

            #[inline]
            fn extract(payload: &CorePayload) -> Option<&Rc<Self>> {
                match payload {
                    CorePayload::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            #[inline]
            fn extract_mut(payload: &mut CorePayload) -> Option<&mut Rc<Self>> {
                match payload {
                    CorePayload::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

shared_payload!(CameraCore, Camera);
shared_payload!(LightsCore, Lights);
shared_payload!(MaterialCore, Material);
shared_payload!(DepthBufferCore, DepthBuffer);
shared_payload!(FresnelCore, Fresnel);
shared_payload!(ReflectCore, Reflect);

/// Type-specific data carried by a core.
#[derive(Debug, Clone)]
pub enum CorePayload {
    Camera(Rc<CameraCore>),
    Lights(Rc<LightsCore>),
    Material(Rc<MaterialCore>),
    DepthBuffer(Rc<DepthBufferCore>),
    Fresnel(Rc<FresnelCore>),
    Reflect(Rc<ReflectCore>),
    Xform(Box<TransformCore>),
}

impl CorePayload {
    /// Fresh payload for a core first acquired through `kind`.
    #[must_use]
    pub fn for_node(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Camera => CorePayload::Camera(Rc::new(CameraCore::new())),
            NodeKind::Lights => CorePayload::Lights(Rc::new(LightsCore::default())),
            NodeKind::Material => CorePayload::Material(Rc::new(MaterialCore::default())),
            NodeKind::DepthBuffer => CorePayload::DepthBuffer(Rc::new(DepthBufferCore::default())),
            NodeKind::Fresnel => CorePayload::Fresnel(Rc::new(FresnelCore::default())),
            NodeKind::Reflect => CorePayload::Reflect(Rc::new(ReflectCore::default())),
            NodeKind::Rotate => CorePayload::Xform(Box::new(TransformCore::new(
                TransformParams::default_rotate(),
            ))),
            NodeKind::Translate => CorePayload::Xform(Box::new(TransformCore::new(
                TransformParams::default_translate(),
            ))),
            NodeKind::Scale => CorePayload::Xform(Box::new(TransformCore::new(
                TransformParams::default_scale(),
            ))),
            NodeKind::Matrix | NodeKind::Xform => CorePayload::Xform(Box::new(
                TransformCore::new(TransformParams::default_matrix()),
            )),
        }
    }

    #[must_use]
    pub fn kind(&self) -> CoreKind {
        match self {
            CorePayload::Camera(_) => CoreKind::Camera,
            CorePayload::Lights(_) => CoreKind::Lights,
            CorePayload::Material(_) => CoreKind::Material,
            CorePayload::DepthBuffer(_) => CoreKind::DepthBuffer,
            CorePayload::Fresnel(_) => CoreKind::Fresnel,
            CorePayload::Reflect(_) => CoreKind::Reflect,
            CorePayload::Xform(_) => CoreKind::Xform,
        }
    }

    /// Runs the context-restore hook if the payload has one. Returns whether it acted.
    fn restore_context(&mut self) -> bool {
        fn restore<T: SharedPayload>(inner: &mut Rc<T>) -> bool {
            if !inner.holds_gpu_resources() {
                return false;
            }
            Rc::make_mut(inner).context_restored();
            true
        }

        match self {
            CorePayload::Camera(inner) => restore(inner),
            CorePayload::Lights(inner) => restore(inner),
            CorePayload::Material(inner) => restore(inner),
            CorePayload::DepthBuffer(inner) => restore(inner),
            CorePayload::Fresnel(inner) => restore(inner),
            CorePayload::Reflect(inner) => restore(inner),
            CorePayload::Xform(_) => false,
        }
    }
}

// ============================================================================
// Core
// ============================================================================

/// A shared configuration record identified by `(kind, core_id)`.
#[derive(Debug)]
pub struct Core {
    kind: CoreKind,
    core_id: CoreId,
    state_id: StateId,
    use_count: u32,
    version: ChangeTracker,
    pub(crate) payload: CorePayload,
}

impl Core {
    #[inline]
    #[must_use]
    pub fn kind(&self) -> CoreKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn core_id(&self) -> &CoreId {
        &self.core_id
    }

    #[inline]
    #[must_use]
    pub fn state_id(&self) -> StateId {
        self.state_id
    }

    /// Number of nodes currently holding this core.
    #[inline]
    #[must_use]
    pub fn use_count(&self) -> u32 {
        self.use_count
    }

    /// Mutation counter, bumped on every change made through the factory.
    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version.version()
    }

    #[inline]
    #[must_use]
    pub fn payload(&self) -> &CorePayload {
        &self.payload
    }
}
