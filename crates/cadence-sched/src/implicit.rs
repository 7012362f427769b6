//! Implicit global network
//!
//! A lazily built scheduler over every live unit in the process-wide
//! [`Registry`]. Each [`run`] snapshots the currently-alive units into a
//! fresh transient [`Network`], delegates to its run loop and discards
//! the network afterwards; only the registry persists between runs.

use parking_lot::Mutex;
use tracing::debug;

use cadence_core::{CancellationToken, SchedResult};

use crate::network::{Network, RunOutcome};
use crate::registry::Registry;

// Token of the most recently run transient network.
static CURRENT_RUN: Mutex<Option<CancellationToken>> = Mutex::new(None);

/// Run every live unit in the global registry for `duration`.
///
/// Units become visible here through [`adopt`]; clock times carry over
/// between runs, so consecutive runs continue where the previous one
/// left off.
///
/// [`adopt`]: crate::registry::adopt
pub fn run(duration: f64) -> SchedResult<RunOutcome> {
    let mut net = Network::new();
    for unit in Registry::global().snapshot() {
        net.add(unit);
    }
    debug!(units = net.objects().len(), duration, "implicit run");
    *CURRENT_RUN.lock() = Some(net.cancellation_token());
    net.run(duration)
}

/// Request a stop of the most recently started implicit run.
///
/// Effective at the next batch boundary. A no-op when nothing has run.
pub fn stop() {
    if let Some(token) = CURRENT_RUN.lock().as_ref() {
        token.raise();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use serial_test::serial;

    use crate::clock::default_clock;
    use crate::registry::adopt;
    use crate::unit::{Operation, Schedulable, UnitCore, UnitRef};

    struct Counter {
        core: UnitCore,
        count: u32,
    }

    impl Schedulable for Counter {
        fn core(&self) -> &UnitCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut UnitCore {
            &mut self.core
        }

        fn update(&mut self) -> SchedResult<()> {
            self.count += 1;
            Ok(())
        }
    }

    fn register_counter() -> Arc<Mutex<Counter>> {
        let unit = Arc::new(Mutex::new(Counter {
            core: UnitCore::new(),
            count: 0,
        }));
        let handle: UnitRef = unit.clone();
        Registry::global().register(&handle);
        unit
    }

    #[test]
    #[serial]
    fn test_implicit_run_discovers_live_units() {
        default_clock().lock().set_t(0.0);
        let x = register_counter();
        let y = register_counter();

        assert!(run(10.0).unwrap().is_completed());

        // default clock dt is 0.1: 100 batches for both units
        assert_eq!(x.lock().count, 100);
        assert_eq!(y.lock().count, 100);
    }

    #[test]
    #[serial]
    fn test_global_stop_from_unit() {
        default_clock().lock().set_t(0.0);
        let mut remaining = 10;
        let _stopper = adopt(Operation::new(move || {
            remaining -= 1;
            if remaining == 0 {
                stop();
            }
        }));

        let outcome = run(10.0).unwrap();
        assert!(outcome.is_stopped());
        assert_eq!(default_clock().lock().t(), 1.0);
    }

    #[test]
    #[serial]
    fn test_stop_without_active_run_is_noop() {
        // Tokens of past runs may linger; raising them must not affect
        // the next run, which starts from a cleared token.
        stop();

        default_clock().lock().set_t(0.0);
        let x = register_counter();
        assert!(run(1.0).unwrap().is_completed());
        assert_eq!(x.lock().count, 10);
    }
}
