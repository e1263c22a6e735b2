//! Reflection (cube-map) category.
//!
//! Composite policy over a single `reflect` channel: every reflect core
//! claims that channel, so a pushed core replaces the inherited layer and
//! at most one reflection is active for a subtree.

use std::rc::Rc;
use std::str::FromStr;

use crate::core::{ContextRestore, CoreKind};
use crate::errors::{Result, StrataError};
use crate::state::StateHash;
use crate::state::slot::StatePolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReflectBlend {
    Add,
    #[default]
    Multiply,
}

impl ReflectBlend {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ReflectBlend::Add => "add",
            ReflectBlend::Multiply => "multiply",
        }
    }
}

impl FromStr for ReflectBlend {
    type Err = StrataError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "add" => Ok(ReflectBlend::Add),
            "multiply" => Ok(ReflectBlend::Multiply),
            other => Err(StrataError::illegal(
                "reflection blendMode",
                other,
                "'add' or 'multiply'",
            )),
        }
    }
}

/// Opaque handle of a GPU cube texture owned by the graphics layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct ReflectCore {
    pub blend: ReflectBlend,
    pub intensity: f32,
    texture: Option<TextureHandle>,
    needs_upload: bool,
}

impl Default for ReflectCore {
    fn default() -> Self {
        Self {
            blend: ReflectBlend::Multiply,
            intensity: 1.0,
            texture: None,
            needs_upload: true,
        }
    }
}

impl ReflectCore {
    #[must_use]
    pub fn new(blend: ReflectBlend, intensity: f32) -> Self {
        Self {
            blend,
            intensity,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    /// Records the uploaded cube texture.
    pub fn set_texture(&mut self, texture: TextureHandle) {
        self.texture = Some(texture);
        self.needs_upload = false;
    }

    /// Whether the cube faces must be (re-)uploaded before drawing.
    #[must_use]
    pub fn needs_upload(&self) -> bool {
        self.needs_upload
    }
}

impl ContextRestore for ReflectCore {
    fn holds_gpu_resources(&self) -> bool {
        self.texture.is_some()
    }

    fn context_restored(&mut self) {
        // The old handle names a texture of the lost context.
        self.texture = None;
        self.needs_upload = true;
    }
}

/// Reflection layer in effect for a subtree.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReflectState {
    layer: Option<Rc<ReflectCore>>,
    hash: StateHash,
}

impl ReflectState {
    /// The reflect core claiming the channel, if any.
    #[must_use]
    pub fn layer(&self) -> Option<&Rc<ReflectCore>> {
        self.layer.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn hash(&self) -> StateHash {
        self.hash
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layer.is_none()
    }
}

#[derive(Debug)]
pub struct ReflectPolicy;

impl StatePolicy for ReflectPolicy {
    type Core = ReflectCore;
    type Value = ReflectState;

    const CATEGORY: CoreKind = CoreKind::Reflect;
    const COMPOSITE: bool = true;

    fn default_value() -> Rc<ReflectState> {
        Rc::new(ReflectState::default())
    }

    fn compose(inherited: Option<&Rc<ReflectState>>, own: &Rc<ReflectCore>) -> Rc<ReflectState> {
        let hash = format!("/reflect/{}", own.blend.name());
        if let Some(parent) = inherited {
            log::trace!("reflect layer '{}' replaced by '{hash}'", parent.hash);
        }
        Rc::new(ReflectState {
            layer: Some(Rc::clone(own)),
            hash: StateHash::new(&hash),
        })
    }
}
