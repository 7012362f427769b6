//! Phase slots - ordered execution phases within a simultaneous batch

/// Execution phase of a unit within a batch of simultaneously due clocks.
///
/// All units in an earlier slot run before any unit in a later slot,
/// across every clock in the batch. The named slots leave gaps between
/// their ranks so callers can slip custom phases in between with
/// [`Slot::at`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot(u8);

impl Slot {
    /// First phase of a batch
    pub const START: Slot = Slot(0);
    /// Group-level state advance
    pub const GROUPS: Slot = Slot(16);
    /// Threshold/condition checks
    pub const THRESHOLDS: Slot = Slot(32);
    /// Propagation between units
    pub const SYNAPSES: Slot = Slot(48);
    /// Post-propagation resets
    pub const RESETS: Slot = Slot(64);
    /// Last phase of a batch
    pub const END: Slot = Slot(80);

    /// A custom phase at an explicit rank
    #[inline]
    pub const fn at(rank: u8) -> Slot {
        Slot(rank)
    }

    /// Numeric rank of this slot (lower runs earlier)
    #[inline]
    pub const fn rank(self) -> u8 {
        self.0
    }
}

impl Default for Slot {
    fn default() -> Self {
        Slot::START
    }
}

impl std::fmt::Debug for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Slot::START => write!(f, "start"),
            Slot::GROUPS => write!(f, "groups"),
            Slot::THRESHOLDS => write!(f, "thresholds"),
            Slot::SYNAPSES => write!(f, "synapses"),
            Slot::RESETS => write!(f, "resets"),
            Slot::END => write!(f, "end"),
            Slot(rank) => write!(f, "slot({rank})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_total_order() {
        assert!(Slot::START < Slot::GROUPS);
        assert!(Slot::GROUPS < Slot::THRESHOLDS);
        assert!(Slot::THRESHOLDS < Slot::SYNAPSES);
        assert!(Slot::SYNAPSES < Slot::RESETS);
        assert!(Slot::RESETS < Slot::END);
    }

    #[test]
    fn test_custom_slot_between_named() {
        let between = Slot::at(40);
        assert!(Slot::THRESHOLDS < between);
        assert!(between < Slot::SYNAPSES);
    }

    #[test]
    fn test_default_is_start() {
        assert_eq!(Slot::default(), Slot::START);
    }

    #[test]
    fn test_debug_names() {
        assert_eq!(format!("{:?}", Slot::END), "end");
        assert_eq!(format!("{:?}", Slot::at(7)), "slot(7)");
    }
}
