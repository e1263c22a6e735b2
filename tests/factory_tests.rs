//! Core factory tests
//!
//! Tests for:
//! - Use counting across get_core / put_core
//! - Node-kind aliasing onto shared category buckets
//! - State id allocation and recycling
//! - Copy-on-write payload mutation and versioning
//! - Context-restore hooks

use strata::core::{CoreFactory, CoreId, CoreKind, NodeKind, StateId};
use strata::state::camera::{CameraCore, Optics, ProjectionKind};
use strata::state::lights::LightsCore;
use strata::state::reflect::{ReflectCore, TextureHandle};
use strata::StrataError;

// ============================================================================
// Use counting
// ============================================================================

#[test]
fn use_count_is_gets_minus_puts() {
    for (gets, puts) in [(1, 0), (1, 1), (3, 1), (5, 5), (4, 3)] {
        let mut factory = CoreFactory::new();
        let mut key = None;
        for _ in 0..gets {
            key = Some(factory.get_core(NodeKind::Material, Some("shared")));
        }
        let key = key.unwrap();
        for _ in 0..puts {
            factory.put_core(key);
        }

        let remaining = gets - puts;
        assert_eq!(factory.has_core(NodeKind::Material, "shared"), remaining > 0);
        match factory.core(key) {
            Some(core) => assert_eq!(core.use_count(), remaining),
            None => assert_eq!(remaining, 0),
        }
    }
}

#[test]
fn put_core_reports_destruction() {
    let mut factory = CoreFactory::new();
    let key = factory.get_core(NodeKind::Camera, Some("main"));
    factory.get_core(NodeKind::Camera, Some("main"));

    assert!(!factory.put_core(key));
    assert!(factory.put_core(key));
    assert!(factory.is_empty());
}

#[test]
fn over_release_is_ignored() {
    let mut factory = CoreFactory::new();
    let key = factory.get_core(NodeKind::Lights, None);
    assert!(factory.put_core(key));

    // Released twice: no panic, no effect on other cores.
    let other = factory.get_core(NodeKind::Lights, None);
    assert!(!factory.put_core(key));
    assert!(factory.contains(other));
    assert_eq!(factory.core(other).unwrap().use_count(), 1);
}

#[test]
fn released_name_can_be_reacquired_fresh() {
    let mut factory = CoreFactory::new();
    let first = factory.get_core(NodeKind::Material, Some("m"));
    factory.put_core(first);

    let second = factory.get_core(NodeKind::Material, Some("m"));
    assert_ne!(first, second);
    assert_eq!(factory.core(second).unwrap().use_count(), 1);
}

// ============================================================================
// Aliasing
// ============================================================================

#[test]
fn transform_kinds_share_one_bucket() {
    let mut factory = CoreFactory::new();
    let rotate = factory.get_core(NodeKind::Rotate, Some("arm"));
    let matrix = factory.get_core(NodeKind::Matrix, Some("arm"));
    let xform = factory.get_core(NodeKind::Xform, Some("arm"));

    assert_eq!(rotate, matrix);
    assert_eq!(rotate, xform);
    assert_eq!(factory.core(rotate).unwrap().use_count(), 3);
    assert_eq!(factory.count(CoreKind::Xform), 1);
}

#[test]
fn same_name_in_different_categories_is_distinct() {
    let mut factory = CoreFactory::new();
    let material = factory.get_core(NodeKind::Material, Some("x"));
    let lights = factory.get_core(NodeKind::Lights, Some("x"));
    assert_ne!(material, lights);
    assert_eq!(factory.core(material).unwrap().kind(), CoreKind::Material);
    assert_eq!(factory.core(lights).unwrap().kind(), CoreKind::Lights);
}

#[test]
fn node_kind_names_parse() {
    assert_eq!("translate".parse::<NodeKind>().unwrap().core_kind(), CoreKind::Xform);
    assert_eq!("depthBuffer".parse::<NodeKind>().unwrap(), NodeKind::DepthBuffer);

    let err = "geometry".parse::<NodeKind>().unwrap_err();
    assert!(matches!(err, StrataError::IllegalConfig { property: "node type", .. }));
}

// ============================================================================
// State ids
// ============================================================================

#[test]
fn state_ids_are_unique_and_recycled() {
    let mut factory = CoreFactory::new();
    let keys: Vec<_> = (0..4)
        .map(|_| factory.get_core(NodeKind::Material, None))
        .collect();
    let ids: Vec<StateId> = keys
        .iter()
        .map(|&key| factory.core(key).unwrap().state_id())
        .collect();

    for (i, a) in ids.iter().enumerate() {
        assert!(!a.is_reserved());
        for b in &ids[i + 1..] {
            assert_ne!(a, b);
        }
    }

    factory.put_core(keys[1]);
    assert_eq!(factory.live_state_ids(), 3);

    let reused = factory.get_core(NodeKind::Fresnel, None);
    assert_eq!(factory.core(reused).unwrap().state_id(), ids[1]);
}

#[test]
fn anonymous_ids_never_match_names() {
    let mut factory = CoreFactory::new();
    let anonymous = factory.get_core(NodeKind::Material, None);
    let id = factory.core(anonymous).unwrap().state_id();
    assert!(matches!(factory.core(anonymous).unwrap().core_id(), CoreId::Anonymous(_)));

    // A caller naming a core after the numeric id gets its own core.
    let named = factory.get_core(NodeKind::Material, Some(&id.get().to_string()));
    assert_ne!(anonymous, named);
}

// ============================================================================
// Payloads
// ============================================================================

#[test]
fn shared_core_mutation_is_seen_by_every_holder() -> anyhow::Result<()> {
    let mut factory = CoreFactory::new();
    let a = factory.get_core(NodeKind::Camera, Some("cam"));
    let b = factory.get_core(NodeKind::Camera, Some("cam"));

    factory.modify::<CameraCore, _>(a, |camera| {
        camera.set_optics(Optics::defaults_for(ProjectionKind::Ortho));
    })?;

    assert_eq!(factory.payload::<CameraCore>(b)?.optics().kind(), ProjectionKind::Ortho);
    assert_eq!(factory.core(b).unwrap().version(), 1);
    Ok(())
}

#[test]
fn payload_guard_bumps_version_on_drop() -> anyhow::Result<()> {
    let mut factory = CoreFactory::new();
    let key = factory.get_core(NodeKind::Lights, None);
    {
        let mut lights = factory.payload_mut::<LightsCore>(key)?;
        lights.clear();
    }
    assert_eq!(factory.core(key).unwrap().version(), 1);
    assert!(factory.payload::<LightsCore>(key)?.is_empty());
    Ok(())
}

#[test]
fn stale_key_is_core_not_found() {
    let mut factory = CoreFactory::new();
    let key = factory.get_core(NodeKind::Material, None);
    factory.put_core(key);
    assert!(matches!(
        factory.payload::<CameraCore>(key),
        Err(StrataError::CoreNotFound)
    ));
}

// ============================================================================
// Context restore
// ============================================================================

#[test]
fn context_restore_visits_only_gpu_holders() -> anyhow::Result<()> {
    let mut factory = CoreFactory::new();
    let with_texture = factory.get_core(NodeKind::Reflect, Some("sky"));
    let without_texture = factory.get_core(NodeKind::Reflect, Some("pending"));
    factory.get_core(NodeKind::Material, None);

    factory.modify::<ReflectCore, _>(with_texture, |reflect| {
        reflect.set_texture(TextureHandle(3));
    })?;

    assert_eq!(factory.context_restored(), 1);

    let restored = factory.payload::<ReflectCore>(with_texture)?;
    assert_eq!(restored.texture(), None);
    assert!(restored.needs_upload());
    assert_eq!(factory.core(without_texture).unwrap().version(), 0);
    Ok(())
}
