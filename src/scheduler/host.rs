//! Execution hosts and their "most ready" ranking.

use std::cmp::Ordering;

/// Index of a host in its [`HostList`]. Stable for the life of the list;
/// hosts are registered up front and never removed while a solve runs.
pub type HostId = usize;

/// A worker capable of running assigned tasks.
///
/// Readiness and capacity are owned by the host: the scheduler only reads
/// them for ranking, and mutation happens through the assignment methods
/// below.
#[derive(Debug, Clone)]
pub struct RenderHost {
    pub name: String,
    pub priority: u8,
    pub capacity: u32,
    pub capacity_free: u32,
    pub tasks_count: u32,
    pub max_tasks: u32,
    /// Online and accepting work. Cleared externally when the host goes
    /// offline or to sleep.
    pub ready: bool,
    pub busy: bool,
    /// Asleep but reachable via wake-on-LAN.
    pub wake_capable: bool,
    /// A wake was requested and the host has not reported back yet.
    pub wake_pending: bool,
    /// Aggregate of task start/finish times, maintained by the host's own
    /// reporting; lower means the host frees up sooner.
    pub tasks_start_finish_time: u64,
    /// Services this host offers (e.g. "maya", "nuke").
    pub services: Vec<String>,
}

impl RenderHost {
    pub fn new(name: impl Into<String>, capacity: u32, max_tasks: u32) -> Self {
        Self {
            name: name.into(),
            priority: 0,
            capacity,
            capacity_free: capacity,
            tasks_count: 0,
            max_tasks,
            ready: true,
            busy: false,
            wake_capable: false,
            wake_pending: false,
            tasks_start_finish_time: 0,
            services: Vec::new(),
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.services.push(service.into());
        self
    }

    pub fn wol_capable(mut self) -> Self {
        self.wake_capable = true;
        self
    }

    pub fn asleep(mut self) -> Self {
        self.ready = false;
        self
    }

    /// Ready to take one more task right now.
    pub fn is_ready(&self) -> bool {
        self.ready && self.tasks_count < self.max_tasks && self.capacity_free > 0
    }

    /// Eligible to be woken instead of skipped.
    pub fn can_wake(&self) -> bool {
        !self.ready && self.wake_capable && !self.wake_pending
    }

    /// Assignment side effect: account one more task against this host.
    pub fn assign_task(&mut self, capacity: u32) {
        self.tasks_count += 1;
        self.capacity_free = self.capacity_free.saturating_sub(capacity);
        self.busy = true;
    }

    /// A task finished; return its share of capacity.
    pub fn release_task(&mut self, capacity: u32) {
        self.tasks_count = self.tasks_count.saturating_sub(1);
        self.capacity_free = (self.capacity_free + capacity).min(self.capacity);
    }

    /// Record that a wake was requested; keeps the host out of candidate
    /// sets until it reports back.
    pub fn wake_requested(&mut self) {
        self.wake_pending = true;
    }

    /// The host came back online after a wake.
    pub fn wake_complete(&mut self) {
        self.ready = true;
        self.wake_pending = false;
    }

    /// Idempotent post-solve reset: a host with no tasks left is not busy.
    pub fn solving_finished(&mut self) {
        if self.tasks_count == 0 {
            self.busy = false;
        }
    }

    /// "Most ready" total order: emptiest host first, then most free
    /// capacity, then priority, then the host freeing up soonest, then total
    /// capacity, then max tasks, then name.
    pub fn most_ready(&self, other: &RenderHost) -> Ordering {
        self.tasks_count
            .cmp(&other.tasks_count)
            .then_with(|| other.capacity_free.cmp(&self.capacity_free))
            .then_with(|| other.priority.cmp(&self.priority))
            .then_with(|| {
                self.tasks_start_finish_time
                    .cmp(&other.tasks_start_finish_time)
            })
            .then_with(|| other.capacity.cmp(&self.capacity))
            .then_with(|| other.max_tasks.cmp(&self.max_tasks))
            .then_with(|| self.name.cmp(&other.name))
    }
}

/// Registry of all known hosts.
#[derive(Debug, Default, Clone)]
pub struct HostList {
    hosts: Vec<RenderHost>,
}

impl HostList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, host: RenderHost) -> HostId {
        tracing::info!(host = %host.name, capacity = host.capacity, "Host registered");
        self.hosts.push(host);
        self.hosts.len() - 1
    }

    pub fn get(&self, id: HostId) -> &RenderHost {
        &self.hosts[id]
    }

    pub fn get_mut(&mut self, id: HostId) -> &mut RenderHost {
        &mut self.hosts[id]
    }

    pub fn find(&self, name: &str) -> Option<HostId> {
        self.hosts.iter().position(|h| h.name == name)
    }

    pub fn ids(&self) -> std::ops::Range<HostId> {
        0..self.hosts.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RenderHost> {
        self.hosts.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut RenderHost> {
        self.hosts.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}
