//! Compile Traversal
//!
//! A compile pass is one synchronous depth-first walk of the scene graph.
//! Each node pushes its cores on entry, compiles its children and pops on
//! exit; drawables read the current value of every category at the leaves.
//!
//! [`CompilePass`] is the explicit context threaded through that walk.
//! [`CompilePass::push`] returns a [`ScopedPush`] guard that pops on drop,
//! so the stacks stay balanced on every exit path, including `?` returns
//! out of a failing subtree.
//!
//! ```rust,ignore
//! impl CompileNode for MaterialNode {
//!     fn compile(&self, pass: &mut CompilePass<'_>) -> Result<()> {
//!         let mut scope = pass.push(self.core)?;
//!         for child in &self.children {
//!             child.compile(&mut scope)?;
//!         }
//!         Ok(())
//!     }
//! }
//! ```

use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use crate::core::{CoreFactory, CoreKey, CoreKind, StateId};
use crate::errors::Result;
use crate::memory::{AllocError, MemoryManager, SurfaceErrorFlag};
use crate::settings::CoreSettings;
use crate::state::camera::CameraCore;
use crate::state::depth_buffer::DepthBufferCore;
use crate::state::fresnel::FresnelState;
use crate::state::lights::LightsState;
use crate::state::material::MaterialCore;
use crate::state::reflect::ReflectState;
use crate::state::{StateChanges, StateStacks};
use crate::transform::TransformMatrices;
use crate::utils::interner;

/// A scene-graph node as seen by the compile traversal.
pub trait CompileNode {
    fn compile(&self, pass: &mut CompilePass<'_>) -> Result<()>;
}

/// Owner of the state core: factory, category stacks, memory manager.
#[derive(Debug)]
pub struct RenderCore {
    factory: CoreFactory,
    stacks: StateStacks,
    memory: MemoryManager,
    settings: CoreSettings,
    pass: u64,
}

impl Default for RenderCore {
    fn default() -> Self {
        Self::new(CoreSettings::default())
    }
}

impl RenderCore {
    #[must_use]
    pub fn new(settings: CoreSettings) -> Self {
        interner::preload_default_hashes();
        Self {
            factory: CoreFactory::new(),
            stacks: StateStacks::new(&settings),
            memory: MemoryManager::new(settings.memory.clone()),
            settings,
            pass: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn factory(&self) -> &CoreFactory {
        &self.factory
    }

    #[inline]
    pub fn factory_mut(&mut self) -> &mut CoreFactory {
        &mut self.factory
    }

    #[inline]
    #[must_use]
    pub fn memory(&self) -> &MemoryManager {
        &self.memory
    }

    #[inline]
    pub fn memory_mut(&mut self) -> &mut MemoryManager {
        &mut self.memory
    }

    #[inline]
    #[must_use]
    pub fn stacks(&self) -> &StateStacks {
        &self.stacks
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &CoreSettings {
        &self.settings
    }

    /// Number of passes started so far.
    #[inline]
    #[must_use]
    pub fn pass(&self) -> u64 {
        self.pass
    }

    /// Starts a compile pass: every stack is emptied and its default
    /// reinstalled.
    pub fn begin_pass(&mut self) -> CompilePass<'_> {
        self.pass += 1;
        log::debug!("Compile pass {}", self.pass);
        self.stacks.reset(&self.factory);
        CompilePass {
            factory: &mut self.factory,
            stacks: &mut self.stacks,
            memory: &mut self.memory,
            pass: self.pass,
        }
    }

    /// Runs one full compile pass from `root`.
    pub fn compile(&mut self, root: &dyn CompileNode) -> Result<()> {
        let mut pass = self.begin_pass();
        let id = pass.id();
        root.compile(&mut pass).inspect_err(|err| {
            log::error!("Compile pass {id} aborted: {err}");
        })
    }

    pub fn surface_available(&mut self, surface: impl SurfaceErrorFlag + 'static) {
        self.memory.surface_available(surface);
    }

    pub fn surface_lost(&mut self) {
        self.memory.surface_lost();
    }

    /// Drops per-scene bookkeeping. Live cores stay with their owners.
    pub fn teardown(&mut self) {
        log::debug!("Teardown after {} passes", self.pass);
        self.memory.reset();
        self.stacks = StateStacks::new(&self.settings);
    }

    /// Runs the context-restore hook of every live core.
    pub fn context_restored(&mut self) -> usize {
        self.factory.context_restored()
    }
}

/// Explicit compile context for one pass.
#[derive(Debug)]
pub struct CompilePass<'a> {
    factory: &'a mut CoreFactory,
    stacks: &'a mut StateStacks,
    memory: &'a mut MemoryManager,
    pass: u64,
}

impl<'a> CompilePass<'a> {
    /// Pass number, starting at 1.
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.pass
    }

    #[inline]
    #[must_use]
    pub fn factory(&self) -> &CoreFactory {
        &*self.factory
    }

    #[inline]
    pub fn factory_mut(&mut self) -> &mut CoreFactory {
        &mut *self.factory
    }

    /// Pushes `key` onto its category stack until the guard drops.
    pub fn push(&mut self, key: CoreKey) -> Result<ScopedPush<'_, 'a>> {
        let kind = self.stacks.push(self.factory, key, self.pass)?;
        Ok(ScopedPush { pass: self, kind })
    }

    /// Runs `f` with `key` pushed; the pop happens whatever `f` returns.
    pub fn scoped<R>(
        &mut self,
        key: CoreKey,
        f: impl FnOnce(&mut CompilePass<'a>) -> Result<R>,
    ) -> Result<R> {
        let mut scope = self.push(key)?;
        f(&mut *scope)
    }

    /// Depth of one category stack.
    #[must_use]
    pub fn depth(&self, kind: CoreKind) -> usize {
        self.stacks.depth(kind)
    }

    // ========================================================================
    // Current values
    // ========================================================================

    #[must_use]
    pub fn camera(&self) -> &Rc<CameraCore> {
        self.stacks.camera.current()
    }

    #[must_use]
    pub fn lights(&self) -> &Rc<LightsState> {
        self.stacks.lights.current()
    }

    #[must_use]
    pub fn material(&self) -> &Rc<MaterialCore> {
        self.stacks.material.current()
    }

    #[must_use]
    pub fn depth_buffer(&self) -> &Rc<DepthBufferCore> {
        self.stacks.depth_buffer.current()
    }

    #[must_use]
    pub fn fresnel(&self) -> &Rc<FresnelState> {
        self.stacks.fresnel.current()
    }

    #[must_use]
    pub fn reflect(&self) -> &Rc<ReflectState> {
        self.stacks.reflect.current()
    }

    /// Composed model transform of the innermost transform scope.
    #[must_use]
    pub fn transform(&self) -> TransformMatrices {
        self.stacks.transforms.current()
    }

    /// Snapshot of every category for a drawable.
    #[must_use]
    pub fn draw_state(&self) -> DrawState {
        let stacks = &*self.stacks;
        DrawState {
            camera: Rc::clone(stacks.camera.current()),
            lights: Rc::clone(stacks.lights.current()),
            material: Rc::clone(stacks.material.current()),
            depth_buffer: Rc::clone(stacks.depth_buffer.current()),
            fresnel: Rc::clone(stacks.fresnel.current()),
            reflect: Rc::clone(stacks.reflect.current()),
            transform: stacks.transforms.current(),
            state_ids: [
                stacks.camera.current_state_id(),
                stacks.lights.current_state_id(),
                stacks.material.current_state_id(),
                stacks.depth_buffer.current_state_id(),
                stacks.fresnel.current_state_id(),
                stacks.reflect.current_state_id(),
                stacks.transforms.current().state_id,
            ],
        }
    }

    /// Categories changed since the last call.
    pub fn take_changes(&mut self) -> StateChanges {
        self.stacks.take_changes()
    }

    /// Allocates GPU memory through the memory manager.
    pub fn allocate<T>(
        &mut self,
        description: &str,
        try_allocate: impl FnMut() -> std::result::Result<T, AllocError>,
    ) -> Result<T> {
        self.memory.allocate(description, try_allocate)
    }
}

/// Guard returned by [`CompilePass::push`]; pops its category on drop.
#[derive(Debug)]
pub struct ScopedPush<'p, 'a> {
    pass: &'p mut CompilePass<'a>,
    kind: CoreKind,
}

impl ScopedPush<'_, '_> {
    /// Category this guard pops.
    #[must_use]
    pub fn kind(&self) -> CoreKind {
        self.kind
    }
}

impl<'a> Deref for ScopedPush<'_, 'a> {
    type Target = CompilePass<'a>;

    fn deref(&self) -> &Self::Target {
        &*self.pass
    }
}

impl<'a> DerefMut for ScopedPush<'_, 'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.pass
    }
}

impl Drop for ScopedPush<'_, '_> {
    fn drop(&mut self) {
        self.pass.stacks.pop(self.kind);
    }
}

/// Everything a drawable needs from the state core.
#[derive(Debug, Clone)]
pub struct DrawState {
    pub camera: Rc<CameraCore>,
    pub lights: Rc<LightsState>,
    pub material: Rc<MaterialCore>,
    pub depth_buffer: Rc<DepthBufferCore>,
    pub fresnel: Rc<FresnelState>,
    pub reflect: Rc<ReflectState>,
    pub transform: TransformMatrices,
    /// Current state id per category, in [`CoreKind::ALL`] order.
    pub state_ids: [StateId; CoreKind::COUNT],
}

impl DrawState {
    #[must_use]
    pub fn state_id(&self, kind: CoreKind) -> StateId {
        self.state_ids[kind.index()]
    }
}
