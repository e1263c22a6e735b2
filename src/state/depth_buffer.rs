//! Depth-buffer category (override policy).

use std::rc::Rc;
use std::str::FromStr;

use crate::core::{ContextRestore, CoreKind};
use crate::errors::{Result, StrataError};
use crate::state::slot::StatePolicy;

/// Depth comparison function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepthFunc {
    #[default]
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
}

impl DepthFunc {
    /// The GL enum value (`GL_LESS` ..).
    #[must_use]
    pub fn gl_enum(self) -> u32 {
        match self {
            DepthFunc::Less => 0x0201,
            DepthFunc::Equal => 0x0202,
            DepthFunc::LessEqual => 0x0203,
            DepthFunc::Greater => 0x0204,
            DepthFunc::NotEqual => 0x0205,
            DepthFunc::GreaterEqual => 0x0206,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            DepthFunc::Less => "less",
            DepthFunc::Equal => "equal",
            DepthFunc::LessEqual => "lequal",
            DepthFunc::Greater => "greater",
            DepthFunc::NotEqual => "notequal",
            DepthFunc::GreaterEqual => "gequal",
        }
    }
}

impl FromStr for DepthFunc {
    type Err = StrataError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "less" => Ok(DepthFunc::Less),
            "equal" => Ok(DepthFunc::Equal),
            "lequal" => Ok(DepthFunc::LessEqual),
            "greater" => Ok(DepthFunc::Greater),
            "notequal" => Ok(DepthFunc::NotEqual),
            "gequal" => Ok(DepthFunc::GreaterEqual),
            other => Err(StrataError::illegal(
                "depthFunc",
                other,
                "'less', 'equal', 'lequal', 'greater', 'notequal' or 'gequal'",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DepthBufferCore {
    pub enabled: bool,
    /// Clear the depth buffer before drawing this subtree.
    pub clear: bool,
    clear_depth: f32,
    depth_func: DepthFunc,
}

impl Default for DepthBufferCore {
    fn default() -> Self {
        Self {
            enabled: true,
            clear: false,
            clear_depth: 1.0,
            depth_func: DepthFunc::Less,
        }
    }
}

impl DepthBufferCore {
    #[must_use]
    pub fn clear_depth(&self) -> f32 {
        self.clear_depth
    }

    /// Sets the clear depth, clamped to `[0, 1]`.
    pub fn set_clear_depth(&mut self, depth: f32) {
        self.clear_depth = depth.clamp(0.0, 1.0);
    }

    #[must_use]
    pub fn depth_func(&self) -> DepthFunc {
        self.depth_func
    }

    pub fn set_depth_func(&mut self, func: DepthFunc) {
        self.depth_func = func;
    }

    /// Sets the depth function by name.
    pub fn set_depth_func_name(&mut self, name: &str) -> Result<()> {
        self.depth_func = name.parse()?;
        Ok(())
    }
}

impl ContextRestore for DepthBufferCore {}

#[derive(Debug)]
pub struct DepthBufferPolicy;

impl StatePolicy for DepthBufferPolicy {
    type Core = DepthBufferCore;
    type Value = DepthBufferCore;

    const CATEGORY: CoreKind = CoreKind::DepthBuffer;
    const COMPOSITE: bool = false;

    fn default_value() -> Rc<DepthBufferCore> {
        Rc::new(DepthBufferCore::default())
    }

    fn compose(
        _inherited: Option<&Rc<DepthBufferCore>>,
        own: &Rc<DepthBufferCore>,
    ) -> Rc<DepthBufferCore> {
        Rc::clone(own)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_depth_is_clamped() {
        let mut core = DepthBufferCore::default();
        core.set_clear_depth(1.5);
        assert!((core.clear_depth() - 1.0).abs() < f32::EPSILON);
        core.set_clear_depth(-0.5);
        assert!(core.clear_depth().abs() < f32::EPSILON);
    }

    #[test]
    fn depth_func_names_map_to_gl_enums() {
        let mut core = DepthBufferCore::default();
        assert_eq!(core.depth_func().gl_enum(), 0x0201);

        core.set_depth_func_name("gequal").unwrap();
        assert_eq!(core.depth_func(), DepthFunc::GreaterEqual);
        assert_eq!(core.depth_func().gl_enum(), 0x0206);

        let err = core.set_depth_func_name("always").unwrap_err();
        assert!(matches!(err, StrataError::IllegalConfig { property: "depthFunc", .. }));
        assert_eq!(core.depth_func(), DepthFunc::GreaterEqual);
    }
}
