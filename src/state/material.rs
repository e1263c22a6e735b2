//! Material category (override policy).

use std::rc::Rc;

use glam::Vec3;

use crate::core::{ContextRestore, CoreKind};
use crate::state::slot::StatePolicy;

/// Surface material parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialCore {
    base_color: Vec3,
    specular_color: Vec3,
    emit_color: Vec3,
    specular: f32,
    shine: f32,
    alpha: f32,
    emit: f32,
}

impl Default for MaterialCore {
    fn default() -> Self {
        Self {
            base_color: Vec3::ONE,
            specular_color: Vec3::ONE,
            emit_color: Vec3::ONE,
            specular: 1.0,
            shine: 70.0,
            alpha: 1.0,
            emit: 0.0,
        }
    }
}

impl MaterialCore {
    #[must_use]
    pub fn base_color(&self) -> Vec3 {
        self.base_color
    }

    pub fn set_base_color(&mut self, color: Vec3) {
        self.base_color = color;
    }

    #[must_use]
    pub fn specular_color(&self) -> Vec3 {
        self.specular_color
    }

    pub fn set_specular_color(&mut self, color: Vec3) {
        self.specular_color = color;
    }

    #[must_use]
    pub fn emit_color(&self) -> Vec3 {
        self.emit_color
    }

    pub fn set_emit_color(&mut self, color: Vec3) {
        self.emit_color = color;
    }

    #[must_use]
    pub fn specular(&self) -> f32 {
        self.specular
    }

    pub fn set_specular(&mut self, specular: f32) {
        self.specular = specular;
    }

    #[must_use]
    pub fn shine(&self) -> f32 {
        self.shine
    }

    pub fn set_shine(&mut self, shine: f32) {
        self.shine = shine;
    }

    #[must_use]
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha;
    }

    #[must_use]
    pub fn emit(&self) -> f32 {
        self.emit
    }

    pub fn set_emit(&mut self, emit: f32) {
        self.emit = emit;
    }

    /// Whether drawables using this material need blending.
    #[must_use]
    pub fn is_transparent(&self) -> bool {
        self.alpha < 1.0
    }
}

impl ContextRestore for MaterialCore {}

#[derive(Debug)]
pub struct MaterialPolicy;

impl StatePolicy for MaterialPolicy {
    type Core = MaterialCore;
    type Value = MaterialCore;

    const CATEGORY: CoreKind = CoreKind::Material;
    const COMPOSITE: bool = false;

    fn default_value() -> Rc<MaterialCore> {
        Rc::new(MaterialCore::default())
    }

    fn compose(_inherited: Option<&Rc<MaterialCore>>, own: &Rc<MaterialCore>) -> Rc<MaterialCore> {
        Rc::clone(own)
    }
}
