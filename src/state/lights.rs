//! Lights category.
//!
//! Composite policy: a pushed light set is appended to the lights inherited
//! from enclosing light nodes, so illumination accumulates down the tree.
//! The merged set carries a layout hash (one token per light) that shader
//! permutation caches key on.

use std::rc::Rc;
use std::str::FromStr;

use glam::Vec3;
use smallvec::SmallVec;

use crate::core::{ContextRestore, CoreKind};
use crate::errors::{Result, StrataError};
use crate::state::StateHash;
use crate::state::slot::StatePolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightMode {
    Ambient,
    Dir,
    Point,
    Spot,
}

impl LightMode {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            LightMode::Ambient => "ambient",
            LightMode::Dir => "dir",
            LightMode::Point => "point",
            LightMode::Spot => "spot",
        }
    }
}

impl FromStr for LightMode {
    type Err = StrataError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ambient" => Ok(LightMode::Ambient),
            "dir" => Ok(LightMode::Dir),
            "point" => Ok(LightMode::Point),
            "spot" => Ok(LightMode::Spot),
            other => Err(StrataError::illegal(
                "light mode",
                other,
                "'dir', 'point', 'spot' or 'ambient'",
            )),
        }
    }
}

/// Coordinate space light positions and directions are given in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LightSpace {
    View,
    #[default]
    World,
}

impl FromStr for LightSpace {
    type Err = StrataError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "view" => Ok(LightSpace::View),
            "world" => Ok(LightSpace::World),
            other => Err(StrataError::illegal("light space", other, "'view' or 'world'")),
        }
    }
}

/// One light source.
#[derive(Debug, Clone, PartialEq)]
pub struct LightSource {
    mode: LightMode,
    pub color: Vec3,
    diffuse: bool,
    specular: bool,
    pub pos: Vec3,
    pub dir: Vec3,
    pub inner_cone: f32,
    pub outer_cone: f32,
    /// Constant, linear and quadratic attenuation.
    pub attenuation: Vec3,
    pub space: LightSpace,
}

impl LightSource {
    #[must_use]
    pub fn new(mode: LightMode) -> Self {
        let mut light = Self {
            mode,
            color: Vec3::ONE,
            diffuse: true,
            specular: true,
            pos: Vec3::ZERO,
            dir: Vec3::Z,
            inner_cone: 0.25,
            outer_cone: 0.0,
            attenuation: Vec3::ZERO,
            space: LightSpace::World,
        };
        light.set_mode(mode);
        light
    }

    #[must_use]
    pub fn ambient(color: Vec3) -> Self {
        Self {
            color,
            ..Self::new(LightMode::Ambient)
        }
    }

    #[must_use]
    pub fn directional(color: Vec3, dir: Vec3, space: LightSpace) -> Self {
        Self {
            color,
            dir,
            space,
            ..Self::new(LightMode::Dir)
        }
    }

    #[must_use]
    pub fn point(color: Vec3, pos: Vec3, space: LightSpace) -> Self {
        Self {
            color,
            pos,
            space,
            ..Self::new(LightMode::Point)
        }
    }

    #[inline]
    #[must_use]
    pub fn mode(&self) -> LightMode {
        self.mode
    }

    /// Changes the mode. Ambient lights always contribute diffuse only.
    pub fn set_mode(&mut self, mode: LightMode) {
        self.mode = mode;
        if mode == LightMode::Ambient {
            self.diffuse = true;
            self.specular = false;
        }
    }

    #[inline]
    #[must_use]
    pub fn diffuse(&self) -> bool {
        self.diffuse
    }

    #[inline]
    #[must_use]
    pub fn specular(&self) -> bool {
        self.specular
    }

    /// Sets the diffuse/specular contributions; ignored for ambient lights.
    pub fn set_contributions(&mut self, diffuse: bool, specular: bool) {
        if self.mode != LightMode::Ambient {
            self.diffuse = diffuse;
            self.specular = specular;
        }
    }

    #[must_use]
    pub fn with_contributions(mut self, diffuse: bool, specular: bool) -> Self {
        self.set_contributions(diffuse, specular);
        self
    }

    fn write_hash(&self, out: &mut String) {
        out.push_str(self.mode.name());
        if self.specular {
            out.push('s');
        }
        if self.diffuse {
            out.push('d');
        }
        out.push(match self.space {
            LightSpace::World => 'w',
            LightSpace::View => 'v',
        });
    }
}

/// Light set owned by one lights core.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightsCore {
    lights: SmallVec<[LightSource; 4]>,
}

impl LightsCore {
    #[must_use]
    pub fn new(lights: impl IntoIterator<Item = LightSource>) -> Self {
        Self {
            lights: lights.into_iter().collect(),
        }
    }

    #[inline]
    #[must_use]
    pub fn lights(&self) -> &[LightSource] {
        &self.lights
    }

    pub fn add(&mut self, light: LightSource) {
        self.lights.push(light);
    }

    /// Replaces the light at `index`.
    pub fn set_light(&mut self, index: usize, light: LightSource) -> Result<()> {
        let count = self.lights.len();
        let slot = self.lights.get_mut(index).ok_or_else(|| {
            StrataError::illegal(
                "light index",
                format!("{index} ({count} lights defined)"),
                "an index of a defined light",
            )
        })?;
        *slot = light;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.lights.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lights.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }
}

impl ContextRestore for LightsCore {}

/// Merged light set in effect for a subtree.
#[derive(Debug, Clone, PartialEq)]
pub struct LightsState {
    lights: SmallVec<[LightSource; 8]>,
    hash: StateHash,
}

impl LightsState {
    #[inline]
    #[must_use]
    pub fn lights(&self) -> &[LightSource] {
        &self.lights
    }

    #[inline]
    #[must_use]
    pub fn hash(&self) -> StateHash {
        self.hash
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lights.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }
}

/// One ambient light and two view-space directional lights.
#[must_use]
pub fn default_lights() -> LightsCore {
    LightsCore::new([
        LightSource {
            space: LightSpace::View,
            ..LightSource::ambient(Vec3::new(0.7, 0.7, 0.8))
        },
        LightSource::directional(Vec3::ONE, Vec3::new(-0.5, -0.5, -1.0), LightSpace::View),
        LightSource::directional(Vec3::ONE, Vec3::new(1.0, -0.9, -0.7), LightSpace::View)
            .with_contributions(false, true),
    ])
}

/// Composite policy for the lights stack.
#[derive(Debug)]
pub struct LightsPolicy;

impl StatePolicy for LightsPolicy {
    type Core = LightsCore;
    type Value = LightsState;

    const CATEGORY: CoreKind = CoreKind::Lights;
    const COMPOSITE: bool = true;

    fn default_value() -> Rc<LightsState> {
        let core = Rc::new(default_lights());
        Self::compose(None, &core)
    }

    fn compose(inherited: Option<&Rc<LightsState>>, own: &Rc<LightsCore>) -> Rc<LightsState> {
        let mut lights: SmallVec<[LightSource; 8]> = SmallVec::new();
        let mut hash = String::new();
        if let Some(parent) = inherited {
            lights.extend(parent.lights.iter().cloned());
            hash.push_str(parent.hash.as_str());
        }
        for light in own.lights() {
            light.write_hash(&mut hash);
            lights.push(light.clone());
        }
        Rc::new(LightsState {
            lights,
            hash: StateHash::new(&hash),
        })
    }
}
