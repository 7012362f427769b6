//! The schedulable unit contract

use std::sync::Arc;

use parking_lot::Mutex;

use cadence_core::{SchedResult, Slot};

use crate::clock::{default_clock, ClockRef};

/// Scheduling metadata shared by every unit.
///
/// Concrete unit types embed a `UnitCore` and hand it out through
/// [`Schedulable::core`]; the scheduler reads the `(clock, when, order)`
/// triple from here and tracks the lazy-preparation mark in it.
pub struct UnitCore {
    /// The clock driving this unit (shared, not owned)
    pub clock: ClockRef,
    /// Phase within a simultaneous batch
    pub when: Slot,
    /// Tiebreak within the same phase
    pub order: i32,
    /// Inactive units are skipped but remain in the schedule
    pub active: bool,
    /// Set once `prepare` has run; cleared by `reinit`
    pub(crate) prepared: bool,
}

impl UnitCore {
    /// Metadata on the default clock, `start` phase, order 0
    pub fn new() -> Self {
        Self::on(default_clock())
    }

    /// Metadata on an explicit clock
    pub fn on(clock: ClockRef) -> Self {
        UnitCore {
            clock,
            when: Slot::default(),
            order: 0,
            active: true,
            prepared: false,
        }
    }

    /// Set the batch phase
    pub fn with_when(mut self, when: Slot) -> Self {
        self.when = when;
        self
    }

    /// Set the within-phase tiebreak
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

impl Default for UnitCore {
    fn default() -> Self {
        Self::new()
    }
}

/// Anything the scheduler can run.
///
/// `update` performs one step of the unit's behavior for the current tick
/// of its clock. It is called once per due tick and must not itself
/// advance any clock. `prepare` runs lazily, at most once per epoch
/// (between `reinit` calls), before the unit's first update. `reinit`
/// resets unit-local state and is orthogonal to clock resets. Composite
/// units expose nested units through `children`; the scheduler flattens
/// them depth-first when the schedule is built.
pub trait Schedulable: Send {
    /// Shared scheduling metadata
    fn core(&self) -> &UnitCore;

    /// Mutable access to the scheduling metadata
    fn core_mut(&mut self) -> &mut UnitCore;

    /// One step of behavior for the current tick of this unit's clock
    fn update(&mut self) -> SchedResult<()>;

    /// One-time lazy preparation before the first update of an epoch
    fn prepare(&mut self) -> SchedResult<()> {
        Ok(())
    }

    /// Reset unit-local state; the next run will call `prepare` again
    fn reinit(&mut self) -> SchedResult<()> {
        Ok(())
    }

    /// Nested units of a composite, in execution-relative order
    fn children(&self) -> Vec<UnitRef> {
        Vec::new()
    }
}

/// Shared handle to a unit
pub type UnitRef = Arc<Mutex<dyn Schedulable>>;

/// Recursive unit collection accepted by [`Network::add`].
///
/// Lets callers pass a single unit or arbitrarily nested sequences of
/// units; the tree is flattened by recursive descent at add time,
/// preserving relative order at every level.
///
/// [`Network::add`]: crate::Network::add
pub enum UnitTree {
    /// A single unit
    Unit(UnitRef),
    /// An ordered group of subtrees
    Group(Vec<UnitTree>),
}

impl UnitTree {
    pub(crate) fn flatten_into(self, out: &mut Vec<UnitRef>) {
        match self {
            UnitTree::Unit(unit) => out.push(unit),
            UnitTree::Group(trees) => {
                for tree in trees {
                    tree.flatten_into(out);
                }
            }
        }
    }
}

impl From<UnitRef> for UnitTree {
    fn from(unit: UnitRef) -> Self {
        UnitTree::Unit(unit)
    }
}

impl From<Vec<UnitTree>> for UnitTree {
    fn from(trees: Vec<UnitTree>) -> Self {
        UnitTree::Group(trees)
    }
}

impl From<Vec<UnitRef>> for UnitTree {
    fn from(units: Vec<UnitRef>) -> Self {
        UnitTree::Group(units.into_iter().map(UnitTree::Unit).collect())
    }
}

impl FromIterator<UnitTree> for UnitTree {
    fn from_iter<I: IntoIterator<Item = UnitTree>>(iter: I) -> Self {
        UnitTree::Group(iter.into_iter().collect())
    }
}

/// Adapts a bare no-argument closure into a schedulable unit.
///
/// Ad hoc logic can be injected into a schedule without writing a new
/// unit type; `prepare` and `reinit` are no-ops.
pub struct Operation {
    core: UnitCore,
    op: Box<dyn FnMut() + Send>,
}

impl Operation {
    /// Wrap a closure with default metadata (default clock, `start`, 0)
    pub fn new(op: impl FnMut() + Send + 'static) -> Self {
        Self::with_core(UnitCore::new(), op)
    }

    /// Wrap a closure with explicit metadata
    pub fn with_core(core: UnitCore, op: impl FnMut() + Send + 'static) -> Self {
        Operation {
            core,
            op: Box::new(op),
        }
    }
}

impl Schedulable for Operation {
    fn core(&self) -> &UnitCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut UnitCore {
        &mut self.core
    }

    fn update(&mut self) -> SchedResult<()> {
        (self.op)();
        Ok(())
    }
}
