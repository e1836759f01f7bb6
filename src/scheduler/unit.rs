//! Shared state and shared logic of one schedulable node of work.
//!
//! Concrete kinds (jobs, user groups) implement [`Schedulable`] and embed a
//! [`UnitCore`]. Everything that must behave identically across kinds — the
//! need metric, the solving comparators, the match bookkeeping in
//! [`try_solve`] — lives here and is not overridable.

use std::cmp::Ordering;
use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::scheduler::host::{HostId, HostList, RenderHost};

/// Global match counter. Starts at 1; a unit whose `solve_cycle` is 0 was
/// never solved. Owned by the solver and threaded through [`try_solve`] so
/// tests can drive it deterministically.
#[derive(Debug, Clone)]
pub struct SolveCycle {
    current: u64,
}

impl SolveCycle {
    pub fn new() -> Self {
        Self { current: 1 }
    }

    pub fn current(&self) -> u64 {
        self.current
    }

    fn advance(&mut self) {
        self.current += 1;
    }
}

impl Default for SolveCycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Fair-share demand metric. Each priority point yields roughly 10% more
/// share; quantity already held by the unit suppresses further need, which
/// is what drives successive passes toward fairness. `None` means the
/// quantity is not applicable this pass and yields zero need.
pub fn need_score(can_run: bool, priority: u8, allocated: Option<u64>) -> f64 {
    let Some(quantity) = allocated else {
        return 0.0;
    };
    if !can_run {
        return 0.0;
    }
    1.1f64.powi(priority as i32) / (quantity as f64 + 1.0)
}

/// State shared by every schedulable kind.
#[derive(Debug, Clone)]
pub struct UnitCore {
    /// Stable identity assigned by the owning container; the final sort key.
    pub id: u32,
    pub name: String,
    pub priority: u8,
    pub created_at: DateTime<Utc>,
    pub locked: bool,
    pub zombie: bool,
    need: f64,
    solve_cycle: u64,
    log: VecDeque<String>,
    log_lines_max: usize,
}

impl UnitCore {
    pub fn new(id: u32, name: impl Into<String>, priority: u8) -> Self {
        Self {
            id,
            name: name.into(),
            priority,
            created_at: Utc::now(),
            locked: false,
            zombie: false,
            need: 0.0,
            solve_cycle: 0,
            log: VecDeque::new(),
            log_lines_max: 100,
        }
    }

    pub fn with_log_limit(mut self, lines: usize) -> Self {
        self.log_lines_max = lines;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn need(&self) -> f64 {
        self.need
    }

    /// Cycle this unit was last solved in. 0 = never solved.
    pub fn solve_cycle(&self) -> u64 {
        self.solve_cycle
    }

    /// Recompute the need score. Called from `calc_need` implementations,
    /// only ever right after a successful match.
    pub fn update_need(&mut self, can_run: bool, allocated: Option<u64>) {
        self.need = need_score(can_run, self.priority, allocated);
    }

    /// Greater demand wins; at equal need the unit solved longest ago (or
    /// never) wins, which round-robins ties across passes.
    pub fn greater_need(&self, other: &UnitCore) -> bool {
        if self.need > other.need {
            return true;
        }
        if self.need < other.need {
            return false;
        }
        self.solve_cycle < other.solve_cycle
    }

    /// Higher priority wins; at equal priority the older unit wins; then the
    /// solve-cycle rule above.
    pub fn greater_priority_then_older_creation(&self, other: &UnitCore) -> bool {
        if self.priority != other.priority {
            return self.priority > other.priority;
        }
        if self.created_at != other.created_at {
            return self.created_at < other.created_at;
        }
        self.solve_cycle < other.solve_cycle
    }

    /// Total order behind [`greater_need`](Self::greater_need), with the unit
    /// id as a stable final key so full sorts are reproducible.
    pub fn cmp_need(&self, other: &UnitCore) -> Ordering {
        other
            .need
            .partial_cmp(&self.need)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.solve_cycle.cmp(&other.solve_cycle))
            .then_with(|| self.id.cmp(&other.id))
    }

    /// Total order behind
    /// [`greater_priority_then_older_creation`](Self::greater_priority_then_older_creation),
    /// id as the final key.
    pub fn cmp_priority_creation(&self, other: &UnitCore) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| self.created_at.cmp(&other.created_at))
            .then_with(|| self.solve_cycle.cmp(&other.solve_cycle))
            .then_with(|| self.id.cmp(&other.id))
    }

    /// Append a timestamped log line, evicting the oldest while over the
    /// configured limit.
    pub fn append_log(&mut self, message: impl Into<String>) {
        self.log
            .push_back(format!("{} : {}", Utc::now().format("%F %T"), message.into()));
        while self.log.len() > self.log_lines_max {
            self.log.pop_front();
        }
    }

    pub fn log(&self) -> impl Iterator<Item = &str> {
        self.log.iter().map(String::as_str)
    }
}

/// Capability surface of one matchable node of work.
///
/// Default implementations log loudly and degrade to the no-op result, so a
/// kind that forgot to implement something contributes nothing to a pass
/// instead of aborting it.
pub trait Schedulable {
    fn core(&self) -> &UnitCore;
    fn core_mut(&mut self) -> &mut UnitCore;

    /// True while the unit has any demand for a host.
    fn can_run(&self) -> bool {
        tracing::error!(unit = %self.core().name, "can_run not implemented");
        false
    }

    /// Compatibility predicate for one host.
    fn can_run_on(&self, _host: &RenderHost) -> bool {
        tracing::error!(unit = %self.core().name, "can_run_on not implemented");
        false
    }

    /// Pick one host from a pre-filtered, most-ready-first candidate
    /// sequence and perform the assignment side effect. A sleeping winner is
    /// returned without an assignment; waking it is the caller's side effect.
    fn solve(&mut self, _candidates: &[HostId], _hosts: &mut HostList) -> Option<HostId> {
        tracing::error!(unit = %self.core().name, "solve not implemented");
        None
    }

    /// Recompute the need score after a successful match.
    fn calc_need(&mut self) {
        tracing::error!(unit = %self.core().name, "calc_need not implemented");
        self.core_mut().update_need(false, None);
    }

    /// Notification hook for external priority changes.
    fn priority_changed(&mut self) {}
}

/// Shared match bookkeeping around a kind's `solve`.
///
/// On a match the unit is stamped with the pre-increment counter value, its
/// need is recomputed, and only then does the counter advance. Solve cycles
/// therefore totally order all successful matches system-wide.
pub fn try_solve(
    unit: &mut dyn Schedulable,
    candidates: &[HostId],
    hosts: &mut HostList,
    cycle: &mut SolveCycle,
) -> Option<HostId> {
    let host = unit.solve(candidates, hosts)?;

    unit.core_mut().solve_cycle = cycle.current();
    unit.calc_need();
    cycle.advance();

    Some(host)
}
