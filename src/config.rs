/// Tuning knobs for one solving invocation.
///
/// All fields are read-only from the scheduler's point of view: the solver
/// takes a copy at construction and never mutates it.
#[derive(Debug, Clone)]
pub struct SolveConfig {
    /// Flatten the unit list per owning user (round robin) instead of
    /// per job priority.
    pub use_user_priority: bool,

    /// Order sorting passes by priority and creation time instead of the
    /// fair-share need metric.
    pub simpler_sort: bool,

    /// Maximum non-wake assignments per invocation. `None` = unbounded.
    pub tasks_per_pass: Option<u32>,

    /// Maximum sleeping hosts to wake per invocation.
    pub wake_per_pass: u32,

    /// Ceiling on inner matcher calls per invocation. Reaching it means a
    /// non-terminating pass, which is a bug in a solving implementation.
    pub cycle_limit: u64,

    /// Maximum retained log lines per unit.
    pub log_lines_max: usize,
}

impl Default for SolveConfig {
    fn default() -> Self {
        Self {
            use_user_priority: false,
            simpler_sort: false,
            tasks_per_pass: None,
            wake_per_pass: 1,
            cycle_limit: 100_000,
            log_lines_max: 100,
        }
    }
}

impl SolveConfig {
    pub fn by_user_order(mut self) -> Self {
        self.use_user_priority = true;
        self
    }

    pub fn simpler(mut self) -> Self {
        self.simpler_sort = true;
        self
    }

    pub fn with_tasks_per_pass(mut self, limit: u32) -> Self {
        self.tasks_per_pass = Some(limit);
        self
    }

    pub fn with_wake_per_pass(mut self, quota: u32) -> Self {
        self.wake_per_pass = quota;
        self
    }

    pub fn with_cycle_limit(mut self, limit: u64) -> Self {
        self.cycle_limit = limit;
        self
    }
}

#[derive(Debug, Clone)]
pub struct FarmConfig {
    pub solve: SolveConfig,
    /// Milliseconds between solving invocations.
    pub solve_interval_ms: u64,
}

impl Default for FarmConfig {
    fn default() -> Self {
        Self {
            solve: SolveConfig::default(),
            solve_interval_ms: 500,
        }
    }
}

impl FarmConfig {
    pub fn new(solve: SolveConfig) -> Self {
        Self {
            solve,
            ..Default::default()
        }
    }
}
