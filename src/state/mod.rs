//! Category State Stacks
//!
//! One [`StateSlot`] per render-state category, instantiated with that
//! category's policy:
//!
//! | Category     | Policy    | Effective value |
//! |--------------|-----------|-----------------|
//! | camera       | override  | [`CameraCore`](camera::CameraCore) |
//! | material     | override  | [`MaterialCore`](material::MaterialCore) |
//! | depth buffer | override  | [`DepthBufferCore`](depth_buffer::DepthBufferCore) |
//! | lights       | composite | [`LightsState`](lights::LightsState) |
//! | fresnel      | composite | [`FresnelState`](fresnel::FresnelState) |
//! | reflect      | composite | [`ReflectState`](reflect::ReflectState) |
//!
//! Model transforms use the dedicated [`TransformStack`].

pub mod camera;
pub mod depth_buffer;
pub mod fresnel;
pub mod lights;
pub mod material;
pub mod reflect;
mod slot;

use std::fmt;

use bitflags::bitflags;

use crate::core::{CoreFactory, CoreKey, CoreKind};
use crate::errors::Result;
use crate::settings::CoreSettings;
use crate::transform::TransformStack;
use crate::utils::interner::{self, Symbol};

pub use slot::{StatePolicy, StateSlot};

use camera::CameraPolicy;
use depth_buffer::DepthBufferPolicy;
use fresnel::FresnelPolicy;
use lights::LightsPolicy;
use material::MaterialPolicy;
use reflect::ReflectPolicy;

/// Interned hash of a composite configuration, used as a shader-permutation key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateHash(Symbol);

impl StateHash {
    #[must_use]
    pub fn new(hash: &str) -> Self {
        Self(interner::intern(hash))
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        interner::resolve(self.0)
    }

    #[must_use]
    pub fn symbol(self) -> Symbol {
        self.0
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.as_str().is_empty()
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new("")
    }
}

impl fmt::Debug for StateHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateHash({:?})", self.as_str())
    }
}

impl fmt::Display for StateHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags! {
    /// Categories whose effective value changed since consumers last looked.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct StateChanges: u32 {
        const CAMERA       = 1 << 0;
        const LIGHTS       = 1 << 1;
        const MATERIAL     = 1 << 2;
        const DEPTH_BUFFER = 1 << 3;
        const FRESNEL      = 1 << 4;
        const REFLECT      = 1 << 5;
        const XFORM        = 1 << 6;
    }
}

impl From<CoreKind> for StateChanges {
    fn from(kind: CoreKind) -> Self {
        match kind {
            CoreKind::Camera => StateChanges::CAMERA,
            CoreKind::Lights => StateChanges::LIGHTS,
            CoreKind::Material => StateChanges::MATERIAL,
            CoreKind::DepthBuffer => StateChanges::DEPTH_BUFFER,
            CoreKind::Fresnel => StateChanges::FRESNEL,
            CoreKind::Reflect => StateChanges::REFLECT,
            CoreKind::Xform => StateChanges::XFORM,
        }
    }
}

/// Every category stack of one compile context.
#[derive(Debug)]
pub struct StateStacks {
    pub camera: StateSlot<CameraPolicy>,
    pub lights: StateSlot<LightsPolicy>,
    pub material: StateSlot<MaterialPolicy>,
    pub depth_buffer: StateSlot<DepthBufferPolicy>,
    pub fresnel: StateSlot<FresnelPolicy>,
    pub reflect: StateSlot<ReflectPolicy>,
    pub transforms: TransformStack,
}

impl Default for StateStacks {
    fn default() -> Self {
        Self::new(&CoreSettings::default())
    }
}

impl StateStacks {
    #[must_use]
    pub fn new(settings: &CoreSettings) -> Self {
        let capacity = settings.stack_capacity;
        Self {
            camera: StateSlot::with_capacity(capacity),
            lights: StateSlot::with_capacity(capacity),
            material: StateSlot::with_capacity(capacity),
            depth_buffer: StateSlot::with_capacity(capacity),
            fresnel: StateSlot::with_capacity(capacity),
            reflect: StateSlot::with_capacity(capacity),
            transforms: TransformStack::new(settings.transform.memoize, capacity),
        }
    }

    /// Pushes `key` onto the stack of its category. Returns that category.
    pub fn push(&mut self, factory: &mut CoreFactory, key: CoreKey, pass: u64) -> Result<CoreKind> {
        let kind = factory.kind_of(key)?;
        match kind {
            CoreKind::Camera => self.camera.push(factory, key)?,
            CoreKind::Lights => self.lights.push(factory, key)?,
            CoreKind::Material => self.material.push(factory, key)?,
            CoreKind::DepthBuffer => self.depth_buffer.push(factory, key)?,
            CoreKind::Fresnel => self.fresnel.push(factory, key)?,
            CoreKind::Reflect => self.reflect.push(factory, key)?,
            CoreKind::Xform => self.transforms.push(factory, key, pass)?,
        }
        Ok(kind)
    }

    pub fn pop(&mut self, kind: CoreKind) {
        match kind {
            CoreKind::Camera => self.camera.pop(),
            CoreKind::Lights => self.lights.pop(),
            CoreKind::Material => self.material.pop(),
            CoreKind::DepthBuffer => self.depth_buffer.pop(),
            CoreKind::Fresnel => self.fresnel.pop(),
            CoreKind::Reflect => self.reflect.pop(),
            CoreKind::Xform => self.transforms.pop(),
        }
    }

    /// Depth of one category stack.
    #[must_use]
    pub fn depth(&self, kind: CoreKind) -> usize {
        match kind {
            CoreKind::Camera => self.camera.depth(),
            CoreKind::Lights => self.lights.depth(),
            CoreKind::Material => self.material.depth(),
            CoreKind::DepthBuffer => self.depth_buffer.depth(),
            CoreKind::Fresnel => self.fresnel.depth(),
            CoreKind::Reflect => self.reflect.depth(),
            CoreKind::Xform => self.transforms.depth(),
        }
    }

    /// Re-arms every stack for a new pass.
    pub fn reset(&mut self, factory: &CoreFactory) {
        self.camera.reset(factory);
        self.lights.reset(factory);
        self.material.reset(factory);
        self.depth_buffer.reset(factory);
        self.fresnel.reset(factory);
        self.reflect.reset(factory);
        self.transforms.reset();
    }

    /// Returns and clears the set of categories changed since the last call.
    pub fn take_changes(&mut self) -> StateChanges {
        let mut changes = StateChanges::empty();
        changes.set(StateChanges::CAMERA, self.camera.take_dirty());
        changes.set(StateChanges::LIGHTS, self.lights.take_dirty());
        changes.set(StateChanges::MATERIAL, self.material.take_dirty());
        changes.set(StateChanges::DEPTH_BUFFER, self.depth_buffer.take_dirty());
        changes.set(StateChanges::FRESNEL, self.fresnel.take_dirty());
        changes.set(StateChanges::REFLECT, self.reflect.take_dirty());
        changes.set(StateChanges::XFORM, self.transforms.take_dirty());
        changes
    }

    /// Drops memoized compositions of every composite category.
    pub fn clear_caches(&mut self) {
        self.lights.clear_cache();
        self.fresnel.clear_cache();
        self.reflect.clear_cache();
    }
}
