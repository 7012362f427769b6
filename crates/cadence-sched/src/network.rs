//! The explicit scheduler and its run loop

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, trace};

use cadence_core::{CancellationToken, SchedResult, SchedulerError};

use crate::clock::ClockRef;
use crate::unit::{UnitRef, UnitTree};

/// How a run terminated.
///
/// Cancellation is a normal, successful termination path; it differs from
/// `Completed` only in that the full duration did not elapse.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// The full duration elapsed
    Completed,
    /// The cancellation token was raised at a batch boundary
    Stopped,
}

impl RunOutcome {
    pub fn is_completed(self) -> bool {
        self == RunOutcome::Completed
    }

    pub fn is_stopped(self) -> bool {
        self == RunOutcome::Stopped
    }
}

fn unit_key(unit: &UnitRef) -> usize {
    Arc::as_ptr(unit) as *const () as usize
}

fn clock_key(clock: &ClockRef) -> usize {
    Arc::as_ptr(clock) as *const () as usize
}

/// The flattened, ordered schedule derived fresh for each run
struct Schedule {
    units: Vec<UnitRef>,
    clocks: Vec<ClockRef>,
}

/// The explicit scheduler.
///
/// Holds a flattened, ordered list of units, drives their clocks forward
/// in lockstep and exposes run/stop/prepare/reinit. Clocks may be shared
/// across networks, but at most one network may drive a given clock at a
/// time; concurrent runs over a shared clock are a caller error.
pub struct Network {
    objects: Vec<UnitRef>,
    token: CancellationToken,
}

impl Network {
    /// An empty network
    pub fn new() -> Self {
        Network {
            objects: Vec::new(),
            token: CancellationToken::new(),
        }
    }

    /// A network over an initial set of units
    pub fn with_units(units: impl Into<UnitTree>) -> Self {
        let mut net = Network::new();
        net.add(units);
        net
    }

    /// Append units, flattening arbitrarily nested sequences in order
    pub fn add(&mut self, units: impl Into<UnitTree>) {
        units.into().flatten_into(&mut self.objects);
    }

    /// The units of this network, in insertion order
    pub fn objects(&self) -> &[UnitRef] {
        &self.objects
    }

    /// A handle to this network's cancellation token.
    ///
    /// Units that stop their own run capture a clone of this and raise it
    /// from inside `update`.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Request a stop at the next batch boundary (not synchronous)
    pub fn stop(&self) {
        self.token.raise();
    }

    /// Resolve children, dedup by identity, derive clocks and sort.
    ///
    /// Computed fresh per run so `when`/`order` mutations between runs
    /// are honored. The total order is `(when rank, unit order, clock
    /// order, clock first-seen index)` with insertion order as the final
    /// tiebreak, realized by the stable sort.
    fn build_schedule(&self) -> SchedResult<Schedule> {
        let mut flat = Vec::new();
        let mut seen = HashSet::new();
        let mut on_stack = HashSet::new();
        for unit in &self.objects {
            flatten_unit(unit, &mut flat, &mut seen, &mut on_stack)?;
        }

        let mut clocks: Vec<ClockRef> = Vec::new();
        let mut clock_rank: HashMap<usize, usize> = HashMap::new();
        for unit in &flat {
            let clock = unit.lock().core().clock.clone();
            let key = clock_key(&clock);
            if !clock_rank.contains_key(&key) {
                clock_rank.insert(key, clocks.len());
                clocks.push(clock);
            }
        }

        let mut keyed: Vec<((u8, i32, i32, usize), UnitRef)> = flat
            .iter()
            .map(|unit| {
                let guard = unit.lock();
                let core = guard.core();
                let key = (
                    core.when.rank(),
                    core.order,
                    core.clock.lock().order(),
                    clock_rank[&clock_key(&core.clock)],
                );
                (key, unit.clone())
            })
            .collect();
        keyed.sort_by_key(|(key, _)| *key);

        Ok(Schedule {
            units: keyed.into_iter().map(|(_, unit)| unit).collect(),
            clocks,
        })
    }

    /// Run the schedule for `duration`, starting from the current clock
    /// times.
    ///
    /// Each iteration advances the batch of simultaneously due clocks by
    /// one step and executes their active units in the total order. The
    /// cancellation token is sampled only between batches. A unit failure
    /// propagates after the abandoned batch's clocks are rewound, so
    /// clocks always rest at the last fully completed batch.
    pub fn run(&mut self, duration: f64) -> SchedResult<RunOutcome> {
        if !duration.is_finite() || duration < 0.0 {
            return Err(SchedulerError::InvalidDuration(duration));
        }
        let schedule = self.build_schedule()?;
        self.token.clear();
        prepare_units(&schedule)?;

        if schedule.clocks.is_empty() {
            debug!(duration, "run over an empty schedule");
            return Ok(RunOutcome::Completed);
        }

        let start = schedule
            .clocks
            .iter()
            .map(|clock| clock.lock().t())
            .fold(f64::INFINITY, f64::min);
        let end = start + duration;
        debug!(
            units = schedule.units.len(),
            clocks = schedule.clocks.len(),
            start,
            end,
            "run starting"
        );

        loop {
            // Global minimum next-event time across all clocks.
            let mut target = f64::INFINITY;
            let mut end_tol: f64 = 0.0;
            for clock in &schedule.clocks {
                let guard = clock.lock();
                target = target.min(guard.next_time());
                end_tol = end_tol.max(guard.tolerance(end));
            }
            if target > end + end_tol {
                debug!(t = end, "run completed");
                return Ok(RunOutcome::Completed);
            }

            // The due set: every clock reaching `target` within tolerance.
            let mut due = HashSet::new();
            for clock in &schedule.clocks {
                let guard = clock.lock();
                if guard.next_time() <= target + guard.tolerance(target) {
                    due.insert(clock_key(clock));
                }
            }

            // Advance the due clocks to the batch instant.
            for clock in &schedule.clocks {
                if due.contains(&clock_key(clock)) {
                    clock.lock().tick();
                }
            }
            trace!(t = target, due = due.len(), "batch");

            // Execute the batch in the total order; units on clocks not
            // due are skipped entirely, not deferred.
            for unit in &schedule.units {
                let mut guard = unit.lock();
                let core = guard.core();
                if !core.active || !due.contains(&clock_key(&core.clock)) {
                    continue;
                }
                if let Err(err) = guard.update() {
                    drop(guard);
                    for clock in &schedule.clocks {
                        if due.contains(&clock_key(clock)) {
                            clock.lock().untick();
                        }
                    }
                    return Err(err);
                }
            }

            // Cancellation is observed only at batch boundaries.
            if self.token.is_raised() {
                debug!(t = target, "run stopped");
                return Ok(RunOutcome::Stopped);
            }
        }
    }

    /// Eagerly run the lazy preparation pass without stepping time.
    ///
    /// `run` does this itself; calling it up front only moves the cost.
    pub fn prepare(&mut self) -> SchedResult<()> {
        let schedule = self.build_schedule()?;
        prepare_units(&schedule)
    }

    /// Reset every derived clock to step zero, call `reinit` on every
    /// unit and clear the prepared marks, so the next run re-prepares.
    pub fn reinit(&mut self) -> SchedResult<()> {
        let schedule = self.build_schedule()?;
        for clock in &schedule.clocks {
            clock.lock().reset();
        }
        for unit in &schedule.units {
            let mut guard = unit.lock();
            guard.reinit()?;
            guard.core_mut().prepared = false;
        }
        Ok(())
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

// One-time lazy preparation: skipped for units already prepared in this
// epoch, even across networks. Only `reinit` clears the marks.
fn prepare_units(schedule: &Schedule) -> SchedResult<()> {
    for unit in &schedule.units {
        let mut guard = unit.lock();
        if !guard.core().prepared {
            guard.prepare()?;
            guard.core_mut().prepared = true;
        }
    }
    Ok(())
}

fn flatten_unit(
    unit: &UnitRef,
    out: &mut Vec<UnitRef>,
    seen: &mut HashSet<usize>,
    on_stack: &mut HashSet<usize>,
) -> SchedResult<()> {
    let key = unit_key(unit);
    if on_stack.contains(&key) {
        return Err(SchedulerError::CyclicUnitGraph);
    }
    if !seen.insert(key) {
        // Already scheduled through another path; identity dedup.
        return Ok(());
    }
    out.push(unit.clone());

    let children = unit.lock().children();
    if children.is_empty() {
        return Ok(());
    }
    on_stack.insert(key);
    for child in &children {
        flatten_unit(child, out, seen, on_stack)?;
    }
    on_stack.remove(&key);
    Ok(())
}
