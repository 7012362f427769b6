//! Discretized time sources

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

/// Step size of the process-wide default clock
pub const DEFAULT_DT: f64 = 0.1;

/// Default relative tolerance for "due" comparisons
pub const DEFAULT_EPSILON: f64 = 1e-14;

/// An independent discretized time source.
///
/// INVARIANT: `t` is always `steps * dt`. Time advances only by
/// incrementing the integer step count, never by float addition, so there
/// is no accumulation drift across millions of steps.
#[derive(Clone, Debug)]
pub struct Clock {
    /// Step duration (positive, finite)
    dt: f64,
    /// Completed step count
    steps: u64,
    /// Tiebreak among clocks simultaneously due in one batch
    order: i32,
    /// Relative tolerance for due comparisons
    epsilon: f64,
}

impl Clock {
    /// Create a clock with the given step size.
    ///
    /// Panics if `dt` is not a positive finite number.
    pub fn new(dt: f64) -> Self {
        assert!(dt.is_finite() && dt > 0.0, "clock dt must be positive and finite");
        Clock {
            dt,
            steps: 0,
            order: 0,
            epsilon: DEFAULT_EPSILON,
        }
    }

    /// Set the batch-level tiebreak order
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Override the relative due-comparison tolerance
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Wrap this clock in a shared handle
    pub fn into_shared(self) -> ClockRef {
        Arc::new(Mutex::new(self))
    }

    /// Step duration
    #[inline]
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Current time, derived from the step count
    #[inline]
    pub fn t(&self) -> f64 {
        self.steps as f64 * self.dt
    }

    /// Completed step count
    #[inline]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Batch-level tiebreak order
    #[inline]
    pub fn order(&self) -> i32 {
        self.order
    }

    /// Advance by exactly one step
    #[inline]
    pub fn tick(&mut self) {
        self.steps += 1;
    }

    /// Rewind one step. Used when a batch is abandoned after its clocks
    /// were already advanced, so time rests at the last completed batch.
    #[inline]
    pub(crate) fn untick(&mut self) {
        self.steps = self.steps.saturating_sub(1);
    }

    /// Time of the next step, without mutating state
    #[inline]
    pub fn next_time(&self) -> f64 {
        (self.steps + 1) as f64 * self.dt
    }

    /// Whether this clock sits at `target` within tolerance
    #[inline]
    pub fn is_due(&self, target: f64) -> bool {
        (self.t() - target).abs() <= self.tolerance(target)
    }

    /// Absolute tolerance for comparisons around time `at`.
    ///
    /// Relative to `max(dt, |at|)` so comparisons stay meaningful both
    /// near zero and after a large number of steps.
    #[inline]
    pub fn tolerance(&self, at: f64) -> f64 {
        self.epsilon * self.dt.max(at.abs())
    }

    /// Zero the step count (and thus `t`), keeping `dt` and `order`
    pub fn reset(&mut self) {
        self.steps = 0;
    }

    /// Move the clock to the whole step nearest `t`.
    ///
    /// Panics if `t` is negative or not finite.
    pub fn set_t(&mut self, t: f64) {
        assert!(t.is_finite() && t >= 0.0, "clock time must be non-negative and finite");
        self.steps = (t / self.dt).round() as u64;
    }
}

/// Shared handle to a clock; one clock may drive units in several networks
pub type ClockRef = Arc<Mutex<Clock>>;

/// The process-wide default clock (`dt = 0.1`).
///
/// Units that do not name a clock are driven by this one. Tests and
/// callers may reset its time directly between runs.
pub fn default_clock() -> ClockRef {
    static DEFAULT: OnceLock<ClockRef> = OnceLock::new();
    DEFAULT.get_or_init(|| Clock::new(DEFAULT_DT).into_shared()).clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_time_is_step_multiple() {
        let mut clock = Clock::new(0.1);
        for _ in 0..1000 {
            clock.tick();
        }
        // 1000 steps of 0.1: a single multiplication, not 1000 additions
        assert_eq!(clock.steps(), 1000);
        assert_eq!(clock.t(), 1000.0 * 0.1);
    }

    #[test]
    fn test_next_time_does_not_mutate() {
        let clock = Clock::new(0.5);
        assert_eq!(clock.next_time(), 0.5);
        assert_eq!(clock.t(), 0.0);
        assert_eq!(clock.steps(), 0);
    }

    #[test]
    fn test_is_due_within_tolerance() {
        let mut clock = Clock::new(0.1);
        for _ in 0..3 {
            clock.tick();
        }
        assert!(clock.is_due(0.3));
        assert!(clock.is_due(clock.t()));
        assert!(!clock.is_due(0.4));
    }

    #[test]
    fn test_reset_keeps_dt_and_order() {
        let mut clock = Clock::new(0.2).with_order(3);
        clock.tick();
        clock.tick();
        clock.reset();

        assert_eq!(clock.t(), 0.0);
        assert_eq!(clock.dt(), 0.2);
        assert_eq!(clock.order(), 3);
    }

    #[test]
    fn test_set_t_rounds_to_whole_step() {
        let mut clock = Clock::new(0.1);
        clock.set_t(0.3000000000000004);
        assert_eq!(clock.steps(), 3);

        clock.set_t(0.0);
        assert_eq!(clock.steps(), 0);
    }

    #[test]
    #[should_panic]
    fn test_rejects_non_positive_dt() {
        let _ = Clock::new(0.0);
    }

    proptest! {
        // Ticking n times always lands exactly on the n-th multiple of dt.
        #[test]
        fn test_no_accumulation_drift(steps in 0u64..100_000, k in 1u32..100) {
            let dt = k as f64 * 0.05;
            let mut clock = Clock::new(dt);
            for _ in 0..steps {
                clock.tick();
            }
            prop_assert_eq!(clock.t(), steps as f64 * dt);
        }
    }
}
