//! GPU Memory Arbitration
//!
//! Caches that keep data in video memory volunteer as *evictors*. When an
//! allocation runs out of memory the [`MemoryManager`] polls the evictors
//! round-robin until one frees something, then retries. The polling cursor
//! persists across calls so no single cache is always asked first.
//!
//! Exhaustion shows up either as [`AllocError::OutOfMemory`] from the
//! allocation callback or through the surface's error flag, which is only
//! consulted while a surface is available.

use thiserror::Error;

use crate::errors::{Result, StrataError};
use crate::settings::MemorySettings;

/// Failure reported by an allocation callback.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    #[error("out of memory")]
    OutOfMemory,
    #[error("{0}")]
    Failed(String),
}

/// Sticky out-of-memory flag of the drawing surface (e.g. `glGetError`).
///
/// Reading the flag clears it.
pub trait SurfaceErrorFlag {
    fn take_out_of_memory(&mut self) -> bool;
}

impl<F> SurfaceErrorFlag for F
where
    F: FnMut() -> bool,
{
    fn take_out_of_memory(&mut self) -> bool {
        self()
    }
}

/// Frees one unit of some cache; returns whether anything was freed.
pub type Evictor = Box<dyn FnMut() -> bool>;

pub struct MemoryManager {
    evictors: Vec<Evictor>,
    cursor: usize,
    surface: Option<Box<dyn SurfaceErrorFlag>>,
    settings: MemorySettings,
}

impl std::fmt::Debug for MemoryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryManager")
            .field("evictors", &self.evictors.len())
            .field("cursor", &self.cursor)
            .field("surface", &self.surface.is_some())
            .field("settings", &self.settings)
            .finish()
    }
}

impl Default for MemoryManager {
    fn default() -> Self {
        Self::new(MemorySettings::default())
    }
}

impl MemoryManager {
    #[must_use]
    pub fn new(settings: MemorySettings) -> Self {
        Self {
            evictors: Vec::new(),
            cursor: 0,
            surface: None,
            settings,
        }
    }

    /// Adds an evictor. Evictors live as long as the manager.
    pub fn register_evictor(&mut self, evictor: impl FnMut() -> bool + 'static) {
        self.evictors.push(Box::new(evictor));
    }

    #[must_use]
    pub fn evictor_count(&self) -> usize {
        self.evictors.len()
    }

    /// Arms the surface error-flag check.
    pub fn surface_available(&mut self, surface: impl SurfaceErrorFlag + 'static) {
        self.surface = Some(Box::new(surface));
    }

    /// Disarms the surface error-flag check.
    pub fn surface_lost(&mut self) {
        self.surface = None;
    }

    #[must_use]
    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    /// Teardown: drops the surface and restarts polling at the first evictor.
    pub fn reset(&mut self) {
        self.surface = None;
        self.cursor = 0;
    }

    /// Runs `try_allocate`, evicting and retrying while memory is exhausted.
    ///
    /// Fails with [`StrataError::OutOfMemory`] when memory was already
    /// exhausted before the first attempt, when a full cycle of evictors
    /// frees nothing, or after `max_allocation_tries` evictions. Other
    /// callback failures are passed through as
    /// [`StrataError::AllocationFailed`] without retrying.
    pub fn allocate<T>(
        &mut self,
        description: &str,
        mut try_allocate: impl FnMut() -> std::result::Result<T, AllocError>,
    ) -> Result<T> {
        log::debug!("Allocating memory for {description}");

        if self.surface_out_of_memory() {
            return Err(self.out_of_memory(description));
        }

        let mut tries = 0;
        loop {
            match try_allocate() {
                Ok(value) => {
                    if !self.surface_out_of_memory() {
                        return Ok(value);
                    }
                    // The surface flagged exhaustion after the fact; the
                    // result is unusable.
                    drop(value);
                }
                Err(AllocError::OutOfMemory) => {}
                Err(AllocError::Failed(reason)) => {
                    return Err(StrataError::AllocationFailed {
                        description: description.to_owned(),
                        reason,
                    });
                }
            }

            tries += 1;
            if tries > self.settings.max_allocation_tries || !self.evict() {
                return Err(self.out_of_memory(description));
            }
            log::debug!("Retrying allocation for {description} (retry {tries})");
        }
    }

    /// Polls evictors from the cursor onward, at most one full cycle.
    fn evict(&mut self) -> bool {
        let count = self.evictors.len();
        for _ in 0..count {
            if self.cursor >= count {
                self.cursor = 0;
            }
            let index = self.cursor;
            self.cursor += 1;
            if (self.evictors[index])() {
                log::warn!("Evicted an item from GPU memory (evictor {index})");
                return true;
            }
        }
        false
    }

    fn surface_out_of_memory(&mut self) -> bool {
        if !self.settings.check_surface_errors {
            return false;
        }
        self.surface
            .as_mut()
            .is_some_and(|surface| surface.take_out_of_memory())
    }

    fn out_of_memory(&self, description: &str) -> StrataError {
        log::error!("GPU memory allocation failed for {description}");
        StrataError::OutOfMemory {
            description: description.to_owned(),
        }
    }
}
