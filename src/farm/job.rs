use crate::scheduler::host::{HostId, HostList, RenderHost};
use crate::scheduler::unit::{Schedulable, UnitCore};

/// Parameters of a job submission.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub name: String,
    pub owner: String,
    pub priority: u8,
    pub service: String,
    pub task_capacity: u32,
    pub tasks_total: u32,
    pub host_mask: Option<String>,
    pub max_running_tasks: Option<u32>,
}

impl JobSpec {
    pub fn new(
        name: impl Into<String>,
        owner: impl Into<String>,
        priority: u8,
        service: impl Into<String>,
        task_capacity: u32,
        tasks_total: u32,
    ) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            priority,
            service: service.into(),
            task_capacity,
            tasks_total,
            host_mask: None,
            max_running_tasks: None,
        }
    }

    pub fn with_host_mask(mut self, mask: impl Into<String>) -> Self {
        self.host_mask = Some(mask.into());
        self
    }

    pub fn with_max_running(mut self, limit: u32) -> Self {
        self.max_running_tasks = Some(limit);
        self
    }
}

/// One render job: a batch of equally sized tasks competing for hosts.
#[derive(Debug)]
pub struct RenderJob {
    core: UnitCore,
    pub owner: String,
    /// Service the job needs on a host.
    pub service: String,
    /// Restrict to hosts whose name starts with this prefix.
    pub host_mask: Option<String>,
    pub task_capacity: u32,
    pub tasks_total: u32,
    pub tasks_done: u32,
    pub tasks_running: u32,
    /// Cap on concurrently running tasks. `None` = unlimited.
    pub max_running_tasks: Option<u32>,
    /// Hosts currently running this job's tasks, most recent last.
    running_hosts: Vec<HostId>,
}

impl RenderJob {
    pub fn new(core: UnitCore, spec: &JobSpec) -> Self {
        Self {
            core,
            owner: spec.owner.clone(),
            service: spec.service.clone(),
            host_mask: spec.host_mask.clone(),
            task_capacity: spec.task_capacity,
            tasks_total: spec.tasks_total,
            tasks_done: 0,
            tasks_running: 0,
            max_running_tasks: spec.max_running_tasks,
            running_hosts: Vec::new(),
        }
    }

    pub fn tasks_pending(&self) -> u32 {
        self.tasks_total - self.tasks_done - self.tasks_running
    }

    pub fn is_done(&self) -> bool {
        self.tasks_done >= self.tasks_total
    }

    /// Complete one running task, returning its host share. Most recent
    /// assignment finishes first.
    pub fn finish_one_task(&mut self, hosts: &mut HostList) -> Option<HostId> {
        let id = self.running_hosts.pop()?;
        self.tasks_running -= 1;
        self.tasks_done += 1;
        hosts.get_mut(id).release_task(self.task_capacity);
        self.core
            .append_log(format!("Task finished on {}", hosts.get(id).name));
        Some(id)
    }

    fn running_capacity(&self) -> u64 {
        self.tasks_running as u64 * self.task_capacity as u64
    }
}

impl Schedulable for RenderJob {
    fn core(&self) -> &UnitCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut UnitCore {
        &mut self.core
    }

    fn can_run(&self) -> bool {
        if self.core.locked || self.core.zombie {
            return false;
        }
        if self.tasks_pending() == 0 {
            return false;
        }
        if let Some(max) = self.max_running_tasks {
            if self.tasks_running >= max {
                return false;
            }
        }
        true
    }

    fn can_run_on(&self, host: &RenderHost) -> bool {
        if !host.services.iter().any(|s| s == &self.service) {
            return false;
        }
        if host.capacity_free < self.task_capacity {
            return false;
        }
        if let Some(mask) = &self.host_mask {
            if !host.name.starts_with(mask.as_str()) {
                return false;
            }
        }
        true
    }

    fn solve(&mut self, candidates: &[HostId], hosts: &mut HostList) -> Option<HostId> {
        // Candidates arrive most-ready first; the first compatible one wins.
        for &id in candidates {
            if !self.can_run_on(hosts.get(id)) {
                continue;
            }
            if !hosts.get(id).is_ready() {
                // Sleeping candidate: hand it back for waking, no assignment.
                return Some(id);
            }

            let host = hosts.get_mut(id);
            host.assign_task(self.task_capacity);
            self.tasks_running += 1;
            self.running_hosts.push(id);
            self.core
                .append_log(format!("Task started on {}", host.name));
            tracing::debug!(job = %self.core.name, host = %host.name, "Task assigned");
            return Some(id);
        }
        None
    }

    fn calc_need(&mut self) {
        let can_run = self.can_run();
        let allocated = Some(self.running_capacity());
        self.core.update_need(can_run, allocated);
    }

    fn priority_changed(&mut self) {
        tracing::debug!(
            job = %self.core.name,
            priority = self.core.priority,
            "Priority changed"
        );
    }
}
