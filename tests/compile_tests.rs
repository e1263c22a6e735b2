//! Compile traversal tests
//!
//! Tests for:
//! - Scoped pushes across a nested node tree
//! - Composite inheritance between parent, child and sibling subtrees
//! - Stack balance after a failing subtree
//! - Draw state defaults, change flags and state ids
//! - Teardown and context restore

use std::cell::RefCell;
use std::rc::Rc;

use glam::{Mat4, Vec3};
use strata::compile::{CompileNode, CompilePass, DrawState, RenderCore};
use strata::core::{CoreKey, CoreKind, NodeKind};
use strata::state::camera::{CameraCore, ProjectionKind};
use strata::state::lights::{LightSource, LightSpace, LightsCore};
use strata::state::material::MaterialCore;
use strata::state::reflect::{ReflectCore, TextureHandle};
use strata::state::StateChanges;
use strata::transform::TransformParams;
use strata::{Result, StrataError};

// ============================================================================
// Test nodes
// ============================================================================

type Recorder = Rc<RefCell<Vec<(&'static str, DrawState)>>>;

/// Pushes its cores in order, then compiles its children.
struct Group {
    cores: Vec<CoreKey>,
    children: Vec<Box<dyn CompileNode>>,
}

impl Group {
    fn new(cores: Vec<CoreKey>, children: Vec<Box<dyn CompileNode>>) -> Box<dyn CompileNode> {
        Box::new(Self { cores, children })
    }
}

fn compile_scoped(
    cores: &[CoreKey],
    children: &[Box<dyn CompileNode>],
    pass: &mut CompilePass<'_>,
) -> Result<()> {
    match cores.split_first() {
        Some((&key, rest)) => {
            let mut scope = pass.push(key)?;
            compile_scoped(rest, children, &mut *scope)
        }
        None => {
            for child in children {
                child.compile(pass)?;
            }
            Ok(())
        }
    }
}

impl CompileNode for Group {
    fn compile(&self, pass: &mut CompilePass<'_>) -> Result<()> {
        compile_scoped(&self.cores, &self.children, pass)
    }
}

/// Drawable stand-in: records the state it would render with.
struct Leaf {
    name: &'static str,
    recorder: Recorder,
}

impl Leaf {
    fn new(name: &'static str, recorder: &Recorder) -> Box<dyn CompileNode> {
        Box::new(Self {
            name,
            recorder: Rc::clone(recorder),
        })
    }
}

impl CompileNode for Leaf {
    fn compile(&self, pass: &mut CompilePass<'_>) -> Result<()> {
        self.recorder.borrow_mut().push((self.name, pass.draw_state()));
        Ok(())
    }
}

/// A node whose core was released before the pass.
struct Broken(CoreKey);

impl CompileNode for Broken {
    fn compile(&self, pass: &mut CompilePass<'_>) -> Result<()> {
        let _scope = pass.push(self.0)?;
        Ok(())
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn recorded(recorder: &Recorder, name: &str) -> DrawState {
    recorder
        .borrow()
        .iter()
        .find(|(leaf, _)| *leaf == name)
        .map(|(_, state)| state.clone())
        .unwrap()
}

fn lights(core: &mut RenderCore, source: LightSource) -> CoreKey {
    let factory = core.factory_mut();
    let key = factory.get_core(NodeKind::Lights, None);
    factory
        .modify::<LightsCore, _>(key, |lights| *lights = LightsCore::new([source]))
        .unwrap();
    key
}

// ============================================================================
// Traversal
// ============================================================================

#[test]
fn composite_lights_follow_the_tree() {
    init_logging();
    let mut core = RenderCore::default();
    let a = lights(
        &mut core,
        LightSource::directional(Vec3::ONE, -Vec3::Y, LightSpace::World),
    );
    let b = lights(&mut core, LightSource::point(Vec3::ONE, Vec3::Y, LightSpace::World));

    let recorder = Recorder::default();
    let root = Group::new(
        vec![a],
        vec![
            Group::new(vec![b], vec![Leaf::new("child", &recorder)]),
            Leaf::new("sibling", &recorder),
        ],
    );
    core.compile(root.as_ref()).unwrap();

    let child = recorded(&recorder, "child");
    assert_eq!(child.lights.len(), 2);
    assert_eq!(child.lights.hash().as_str(), "dirsdwpointsdw");

    let sibling = recorded(&recorder, "sibling");
    assert_eq!(sibling.lights.len(), 1);
    assert_eq!(sibling.lights.hash().as_str(), "dirsdw");
    assert_eq!(
        sibling.state_id(CoreKind::Lights),
        core.factory().core(a).unwrap().state_id()
    );
}

#[test]
fn failing_subtree_leaves_stacks_balanced() {
    init_logging();
    let mut core = RenderCore::default();
    let factory = core.factory_mut();
    let material = factory.get_core(NodeKind::Material, None);
    let camera = factory.get_core(NodeKind::Camera, None);
    let offset = factory.get_core(NodeKind::Translate, None);
    let released = factory.get_core(NodeKind::Fresnel, None);
    factory.put_core(released);

    let root = Group::new(
        vec![material, camera, offset],
        vec![Group::new(vec![], vec![Box::new(Broken(released)) as Box<dyn CompileNode>])],
    );
    let err = core.compile(root.as_ref()).unwrap_err();
    assert!(matches!(err, StrataError::CoreNotFound));

    for kind in CoreKind::ALL {
        assert_eq!(core.stacks().depth(kind), 0, "{} stack left open", kind.name());
    }
}

#[test]
fn leaves_outside_every_scope_see_defaults() {
    let mut core = RenderCore::default();
    let recorder = Recorder::default();
    core.compile(Leaf::new("bare", &recorder).as_ref()).unwrap();

    let state = recorded(&recorder, "bare");
    assert_eq!(*state.camera, CameraCore::default());
    assert_eq!(*state.material, MaterialCore::default());
    assert_eq!(state.lights.hash().as_str(), "ambientdvdirsdvdirsv");
    assert!(state.fresnel.is_empty());
    assert_eq!(state.transform.matrix, Mat4::IDENTITY);
    for kind in CoreKind::ALL {
        assert_eq!(state.state_id(kind), kind.default_state_id());
    }
}

#[test]
fn transform_scope_reaches_the_leaf() {
    let mut core = RenderCore::default();
    let factory = core.factory_mut();
    let offset = factory.get_core(NodeKind::Translate, Some("offset"));
    factory
        .set_transform(offset, TransformParams::Translate(Vec3::new(0.0, 2.0, 0.0)))
        .unwrap();

    let recorder = Recorder::default();
    let root = Group::new(vec![offset], vec![Leaf::new("mesh", &recorder)]);
    core.compile(root.as_ref()).unwrap();
    core.compile(root.as_ref()).unwrap();
    assert_eq!(core.pass(), 2);

    let state = recorded(&recorder, "mesh");
    assert!(state
        .transform
        .matrix
        .abs_diff_eq(Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0)), 1e-6));
    assert_eq!(
        state.state_id(CoreKind::Xform),
        core.factory().core(offset).unwrap().state_id()
    );
}

// ============================================================================
// Pass context
// ============================================================================

#[test]
fn changes_are_reported_per_push_and_pop() -> anyhow::Result<()> {
    let mut core = RenderCore::default();
    let material = core.factory_mut().get_core(NodeKind::Material, None);

    let mut pass = core.begin_pass();
    assert_eq!(pass.take_changes(), StateChanges::all());

    let mut scope = pass.push(material)?;
    assert_eq!(scope.kind(), CoreKind::Material);
    assert_eq!(scope.depth(CoreKind::Material), 1);
    assert_eq!(scope.take_changes(), StateChanges::MATERIAL);
    drop(scope);

    assert_eq!(pass.depth(CoreKind::Material), 0);
    assert_eq!(pass.take_changes(), StateChanges::MATERIAL);
    Ok(())
}

#[test]
fn scoped_pops_whatever_the_closure_returns() -> anyhow::Result<()> {
    let mut core = RenderCore::default();
    let camera = core.factory_mut().get_core(NodeKind::Camera, None);
    core.factory_mut()
        .modify::<CameraCore, _>(camera, |c| c.set_projection("ortho"))??;

    let mut pass = core.begin_pass();
    let depth = pass.scoped(camera, |inner| {
        assert_eq!(inner.camera().optics().kind(), ProjectionKind::Ortho);
        Ok(inner.depth(CoreKind::Camera))
    })?;
    assert_eq!(depth, 1);

    let failed: strata::Result<()> = pass.scoped(camera, |_| Err(StrataError::CoreNotFound));
    assert!(failed.is_err());
    assert_eq!(pass.depth(CoreKind::Camera), 0);
    Ok(())
}

#[test]
fn allocation_goes_through_the_memory_manager() {
    let mut core = RenderCore::default();
    core.memory_mut().register_evictor(|| false);

    let mut pass = core.begin_pass();
    let err = pass
        .allocate::<()>("depth target", || Err(strata::AllocError::OutOfMemory))
        .unwrap_err();
    assert!(err.is_out_of_memory());
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn teardown_and_context_restore() -> anyhow::Result<()> {
    let mut core = RenderCore::default();
    let sky = core.factory_mut().get_core(NodeKind::Reflect, Some("sky"));
    core.factory_mut()
        .modify::<ReflectCore, _>(sky, |r| r.set_texture(TextureHandle(11)))?;

    core.surface_available(|| false);
    assert!(core.memory().has_surface());

    assert_eq!(core.context_restored(), 1);
    assert!(core.factory().payload::<ReflectCore>(sky)?.needs_upload());

    core.teardown();
    assert!(!core.memory().has_surface());
    assert!(core.factory().contains(sky));
    for kind in CoreKind::ALL {
        assert_eq!(core.stacks().depth(kind), 0);
    }
    Ok(())
}
