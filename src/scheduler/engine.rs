//! The outer solving driver: bounded, throttled repetition of matching
//! passes plus the wake and busy-flag bookkeeping around them.

use serde::Serialize;

use crate::config::SolveConfig;
use crate::events::{EventSink, WakeTransport};
use crate::scheduler::host::HostList;
use crate::scheduler::matcher::{solve_pass, SolveMethod, UnitOrder};
use crate::scheduler::unit::{Schedulable, SolveCycle};

/// How a unit source flattens its nodes into one list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    /// Jobs as submitted; the matcher sorts by the configured comparator.
    ByJobPriority,
    /// Jobs interleaved round-robin across owning users; the matcher keeps
    /// the order.
    ByUserOrder,
}

/// Supplies the initial unit list for one solving invocation.
pub trait UnitSource {
    fn units(&mut self, mode: SourceMode) -> Vec<&mut dyn Schedulable>;
}

/// Counters from one solving invocation.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct SolveStats {
    pub tasks_solved: u32,
    pub awakened_hosts: u32,
    pub cycles: u64,
}

/// Drives repeated matching passes under the configured bounds.
///
/// Not reentrant: callers serialize invocations, typically from a single
/// timer-driven task. Everything a running invocation touches — the solve
/// cycle counter, unit need and solve-cycle stamps, host capacity and busy
/// flags — is owned by that invocation until it returns.
pub struct Solver {
    config: SolveConfig,
    cycle: SolveCycle,
}

impl Solver {
    pub fn new(config: SolveConfig) -> Self {
        Self {
            config,
            cycle: SolveCycle::new(),
        }
    }

    pub fn config(&self) -> &SolveConfig {
        &self.config
    }

    /// Value the next successful match will be stamped with.
    pub fn solve_cycle(&self) -> u64 {
        self.cycle.current()
    }

    /// Run exactly one bounded solving invocation.
    ///
    /// Outcomes are observable through mutated unit/host state, the sink,
    /// and the returned counters; no error crosses this boundary.
    pub fn solve(
        &mut self,
        source: &mut dyn UnitSource,
        hosts: &mut HostList,
        wake: &dyn WakeTransport,
        sink: &dyn EventSink,
    ) -> SolveStats {
        let (mode, method) = if self.config.use_user_priority {
            (SourceMode::ByUserOrder, SolveMethod::ByOrder)
        } else {
            (SourceMode::ByJobPriority, SolveMethod::ByPriority)
        };
        let order = if self.config.simpler_sort {
            UnitOrder::PriorityThenCreation
        } else {
            UnitOrder::Need
        };

        let mut list = source.units(mode);
        let mut stats = SolveStats::default();

        while !list.is_empty() {
            stats.cycles += 1;
            if stats.cycles > self.config.cycle_limit {
                // Never expected in correct operation; almost certainly a bug
                // in a solving implementation.
                tracing::warn!(limit = self.config.cycle_limit, "Solve reached cycle limit");
                sink.log_error("Solve reached cycle limit");
                break;
            }

            let wake_allowed = stats.awakened_hosts < self.config.wake_per_pass;
            let found = match solve_pass(&mut list, method, order, hosts, &mut self.cycle, wake_allowed)
            {
                Some(found) => found,
                // Every remaining unit got excluded this pass.
                None => break,
            };

            if found.woken {
                let host = hosts.get_mut(found.host);
                host.wake_requested();
                wake.wake(host);
                stats.awakened_hosts += 1;
                sink.notify(&found.unit_name, &format!("Waking host {}", host.name));
            } else {
                stats.tasks_solved += 1;
                sink.notify(
                    &found.unit_name,
                    &format!("Task assigned to {}", hosts.get(found.host).name),
                );
            }

            if let Some(limit) = self.config.tasks_per_pass {
                if stats.tasks_solved >= limit {
                    break;
                }
            }
        }

        tracing::debug!(
            tasks = stats.tasks_solved,
            awakened = stats.awakened_hosts,
            cycles = stats.cycles,
            "Solve finished"
        );

        // Hosts running tasks one by one must not stay marked busy once
        // drained.
        for host in hosts.iter_mut() {
            host.solving_finished();
        }

        stats
    }
}
