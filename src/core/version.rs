/// Mutation counter of a core; state caches compare versions to detect
/// stale composites.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeTracker {
    version: u64,
}

impl ChangeTracker {
    #[must_use]
    pub fn new() -> Self {
        Self { version: 0 }
    }

    /// Counts one mutation.
    pub fn changed(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Lends out `payload`; the core counts as modified once the borrow ends.
    pub(crate) fn guard<'a, T>(&'a mut self, payload: &'a mut T) -> MutGuard<'a, T> {
        MutGuard {
            payload,
            tracker: self,
        }
    }
}

/// Mutable borrow of a core payload that bumps the core version on drop.
pub struct MutGuard<'a, T> {
    payload: &'a mut T,
    tracker: &'a mut ChangeTracker,
}

impl<T> std::ops::Deref for MutGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.payload
    }
}

impl<T> std::ops::DerefMut for MutGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.payload
    }
}

impl<T> Drop for MutGuard<'_, T> {
    fn drop(&mut self) {
        self.tracker.changed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_bumps_version_on_drop() {
        let mut tracker = ChangeTracker::new();
        let mut value = 1;
        {
            let mut guard = tracker.guard(&mut value);
            *guard += 1;
        }
        assert_eq!(value, 2);
        assert_eq!(tracker.version(), 1);

        tracker.changed();
        assert_eq!(tracker.version(), 2);
    }
}
