//! One bounded matching pass: at most one (unit, host) assignment per call.

use crate::scheduler::host::{HostId, HostList};
use crate::scheduler::unit::{try_solve, Schedulable, SolveCycle};

/// How a pass treats the unit list it was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveMethod {
    /// Sort by the configured comparator before walking.
    ByPriority,
    /// The caller already encodes precedence; walk the list as-is.
    ByOrder,
}

/// Which comparator a sorting pass uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOrder {
    Need,
    PriorityThenCreation,
}

/// One successful assignment.
#[derive(Debug, Clone)]
pub struct Match {
    pub unit_id: u32,
    pub unit_name: String,
    pub host: HostId,
    /// The host was sleeping when chosen; the outcome is a wake, not a task.
    pub woken: bool,
}

/// Run one pass over `list`.
///
/// Units that cannot run are dropped up front; the rest are walked in
/// precedence order, each against its own freshly ranked candidate hosts.
/// The first unit to solve wins and the pass returns immediately: an
/// assignment invalidates every host's capacity and the unit's need, so all
/// rankings would have to be recomputed anyway. A unit that fails to solve
/// is removed from the list permanently; the caller redrives the pass until
/// the list is empty.
pub fn solve_pass(
    list: &mut Vec<&mut dyn Schedulable>,
    method: SolveMethod,
    order: UnitOrder,
    hosts: &mut HostList,
    cycle: &mut SolveCycle,
    wake_allowed: bool,
) -> Option<Match> {
    list.retain(|unit| unit.can_run());

    if method != SolveMethod::ByOrder {
        match order {
            UnitOrder::Need => list.sort_by(|a, b| a.core().cmp_need(b.core())),
            UnitOrder::PriorityThenCreation => {
                list.sort_by(|a, b| a.core().cmp_priority_creation(b.core()))
            }
        }
    }

    while !list.is_empty() {
        let candidates = {
            let unit: &dyn Schedulable = &*list[0];
            let mut candidates: Vec<HostId> = hosts
                .ids()
                .filter(|&id| {
                    let host = hosts.get(id);
                    (host.is_ready() || (wake_allowed && host.can_wake()))
                        && unit.can_run_on(host)
                })
                .collect();
            candidates.sort_by(|&a, &b| hosts.get(a).most_ready(hosts.get(b)));
            candidates
        };

        if let Some(host_id) = try_solve(&mut *list[0], &candidates, hosts, cycle) {
            let core = list[0].core();
            let host = hosts.get(host_id);
            let woken = !host.ready;
            if woken {
                tracing::debug!(host = %host.name, unit = %core.name, "Sleeping host chosen");
            }
            return Some(Match {
                unit_id: core.id,
                unit_name: core.name.clone(),
                host: host_id,
                woken,
            });
        }

        list.remove(0);
    }

    None
}
