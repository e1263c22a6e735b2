//! Fresnel category.
//!
//! Composite policy with one slot per surface channel: a fresnel node claims
//! the channel it applies to and inherits the others from its ancestors.

use std::rc::Rc;
use std::str::FromStr;

use glam::Vec3;

use crate::core::{ContextRestore, CoreKind};
use crate::errors::{Result, StrataError};
use crate::state::StateHash;
use crate::state::slot::StatePolicy;

/// Surface channel a fresnel effect modulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FresnelChannel {
    Color,
    Specular,
    Alpha,
    Reflect,
    Emit,
}

impl FresnelChannel {
    pub const COUNT: usize = 5;

    /// Channels in hash order.
    pub const ALL: [FresnelChannel; Self::COUNT] = [
        FresnelChannel::Color,
        FresnelChannel::Specular,
        FresnelChannel::Alpha,
        FresnelChannel::Reflect,
        FresnelChannel::Emit,
    ];

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    fn hash_token(self) -> &'static str {
        match self {
            FresnelChannel::Color => "d;",
            FresnelChannel::Specular => "s;",
            FresnelChannel::Alpha => "a;",
            FresnelChannel::Reflect => "r;",
            FresnelChannel::Emit => "e;",
        }
    }
}

impl FromStr for FresnelChannel {
    type Err = StrataError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "color" => Ok(FresnelChannel::Color),
            "specular" => Ok(FresnelChannel::Specular),
            "alpha" => Ok(FresnelChannel::Alpha),
            "reflect" => Ok(FresnelChannel::Reflect),
            "emit" => Ok(FresnelChannel::Emit),
            other => Err(StrataError::illegal(
                "fresnel applyTo",
                other,
                "'color', 'specular', 'alpha', 'reflect' or 'emit'",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FresnelCore {
    /// Channel this fresnel claims; `None` leaves every channel inherited.
    pub apply_to: Option<FresnelChannel>,
    pub bias: f32,
    pub power: f32,
    pub top_color: Vec3,
    pub bottom_color: Vec3,
}

impl Default for FresnelCore {
    fn default() -> Self {
        Self {
            apply_to: None,
            bias: 0.0,
            power: 1.0,
            top_color: Vec3::ONE,
            bottom_color: Vec3::ZERO,
        }
    }
}

impl FresnelCore {
    #[must_use]
    pub fn applied_to(channel: FresnelChannel) -> Self {
        Self {
            apply_to: Some(channel),
            ..Self::default()
        }
    }
}

impl ContextRestore for FresnelCore {}

/// Active fresnel per channel.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FresnelState {
    channels: [Option<Rc<FresnelCore>>; FresnelChannel::COUNT],
    hash: StateHash,
}

impl FresnelState {
    #[must_use]
    pub fn channel(&self, channel: FresnelChannel) -> Option<&Rc<FresnelCore>> {
        self.channels[channel.index()].as_ref()
    }

    #[inline]
    #[must_use]
    pub fn hash(&self) -> StateHash {
        self.hash
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.iter().all(Option::is_none)
    }
}

#[derive(Debug)]
pub struct FresnelPolicy;

impl StatePolicy for FresnelPolicy {
    type Core = FresnelCore;
    type Value = FresnelState;

    const CATEGORY: CoreKind = CoreKind::Fresnel;
    const COMPOSITE: bool = true;

    fn default_value() -> Rc<FresnelState> {
        Rc::new(FresnelState::default())
    }

    fn compose(inherited: Option<&Rc<FresnelState>>, own: &Rc<FresnelCore>) -> Rc<FresnelState> {
        let mut channels = inherited.map(|parent| parent.channels.clone()).unwrap_or_default();
        if let Some(channel) = own.apply_to {
            channels[channel.index()] = Some(Rc::clone(own));
        }

        let mut hash = String::new();
        for channel in FresnelChannel::ALL {
            if channels[channel.index()].is_some() {
                hash.push_str(channel.hash_token());
            }
        }

        Rc::new(FresnelState {
            channels,
            hash: StateHash::new(&hash),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_claims_only_its_channel() {
        let alpha = Rc::new(FresnelCore::applied_to(FresnelChannel::Alpha));
        let color = Rc::new(FresnelCore::applied_to(FresnelChannel::Color));
        let inner_alpha = Rc::new(FresnelCore {
            bias: 0.3,
            ..FresnelCore::applied_to(FresnelChannel::Alpha)
        });

        let root = FresnelPolicy::compose(None, &alpha);
        let child = FresnelPolicy::compose(Some(&root), &color);
        assert_eq!(child.hash().as_str(), "d;a;");
        assert!(Rc::ptr_eq(child.channel(FresnelChannel::Alpha).unwrap(), &alpha));

        let grandchild = FresnelPolicy::compose(Some(&child), &inner_alpha);
        assert_eq!(grandchild.hash().as_str(), "d;a;");
        assert!(Rc::ptr_eq(grandchild.channel(FresnelChannel::Alpha).unwrap(), &inner_alpha));
    }

    #[test]
    fn unclaimed_fresnel_passes_inherited_through() {
        let unclaimed = Rc::new(FresnelCore::default());
        let state = FresnelPolicy::compose(None, &unclaimed);
        assert!(state.is_empty());
        assert_eq!(state.hash().as_str(), "");
        assert!("ambient".parse::<FresnelChannel>().is_err());
    }
}
