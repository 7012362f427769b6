//! Weak registry of live units

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::unit::{Schedulable, UnitRef};

type WeakUnit = Weak<Mutex<dyn Schedulable>>;

/// Ordered weak registry of live units.
///
/// The implicit global network discovers units through the process-wide
/// instance instead of explicit registration. Entries are weak: a unit
/// dropped by its owner disappears from later snapshots. The registry is
/// an ordinary value, so tests or embedders can also inject their own.
#[derive(Default)]
pub struct Registry {
    entries: Mutex<Vec<WeakUnit>>,
}

impl Registry {
    /// An empty registry
    pub const fn new() -> Self {
        Registry {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// The process-wide registry backing the implicit global network
    pub fn global() -> &'static Registry {
        static GLOBAL: Registry = Registry::new();
        &GLOBAL
    }

    /// Record a unit, preserving insertion order
    pub fn register(&self, unit: &UnitRef) {
        self.entries.lock().push(Arc::downgrade(unit));
    }

    /// Drop entries whose units no longer exist
    pub fn prune(&self) {
        self.entries.lock().retain(|weak| weak.strong_count() > 0);
    }

    /// Strong handles to every currently-alive unit, in insertion order.
    ///
    /// Dead entries are pruned as a side effect.
    pub fn snapshot(&self) -> Vec<UnitRef> {
        let mut entries = self.entries.lock();
        let mut alive = Vec::with_capacity(entries.len());
        entries.retain(|weak| match weak.upgrade() {
            Some(unit) => {
                alive.push(unit);
                true
            }
            None => false,
        });
        alive
    }

    /// Number of registered entries, dead ones included until pruned
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Wrap a unit into its shared handle and register it process-wide.
///
/// This is how units become visible to the implicit global network; a
/// unit wrapped by hand with `Arc::new` stays invisible to it and can
/// only be scheduled through an explicit [`Network`].
///
/// [`Network`]: crate::Network
pub fn adopt<U: Schedulable + 'static>(unit: U) -> UnitRef {
    let unit: UnitRef = Arc::new(Mutex::new(unit));
    Registry::global().register(&unit);
    unit
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::clock::Clock;
    use crate::unit::{Operation, UnitCore};

    fn local_unit() -> UnitRef {
        let clock = Clock::new(1.0).into_shared();
        Arc::new(Mutex::new(Operation::with_core(UnitCore::on(clock), || {})))
    }

    #[test]
    fn test_snapshot_preserves_insertion_order() {
        let registry = Registry::new();
        let a = local_unit();
        let b = local_unit();
        registry.register(&a);
        registry.register(&b);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert!(Arc::ptr_eq(&snapshot[0], &a));
        assert!(Arc::ptr_eq(&snapshot[1], &b));
    }

    #[test]
    fn test_dropped_units_leave_snapshots() {
        let registry = Registry::new();
        let a = local_unit();
        let b = local_unit();
        registry.register(&a);
        registry.register(&b);

        drop(a);
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(Arc::ptr_eq(&snapshot[0], &b));
        // snapshot pruned the dead entry
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_prune() {
        let registry = Registry::new();
        let a = local_unit();
        registry.register(&a);
        registry.register(&local_unit());
        assert_eq!(registry.len(), 2);

        registry.prune();
        assert_eq!(registry.len(), 1);
    }
}
