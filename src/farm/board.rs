use std::collections::BTreeMap;

use crate::error::{FarmError, Result};
use crate::farm::job::{JobSpec, RenderJob};
use crate::scheduler::engine::{SourceMode, UnitSource};
use crate::scheduler::host::HostList;
use crate::scheduler::unit::{Schedulable, UnitCore};

/// Owns the jobs of the farm and hands the solver its unit list.
#[derive(Debug)]
pub struct JobBoard {
    jobs: Vec<RenderJob>,
    next_id: u32,
    log_lines_max: usize,
}

impl Default for JobBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl JobBoard {
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            next_id: 1,
            log_lines_max: 100,
        }
    }

    pub fn with_log_limit(mut self, lines: usize) -> Self {
        self.log_lines_max = lines;
        self
    }

    /// Register a job. Ids are assigned from a sequence so sort tie-breaks
    /// are reproducible for the same submission order.
    pub fn submit(&mut self, spec: JobSpec) -> Result<u32> {
        if self.jobs.iter().any(|j| j.core().name == spec.name) {
            return Err(FarmError::DuplicateJob(spec.name));
        }

        let id = self.next_id;
        self.next_id += 1;

        let core =
            UnitCore::new(id, spec.name.as_str(), spec.priority).with_log_limit(self.log_lines_max);
        let mut job = RenderJob::new(core, &spec);
        job.core_mut().append_log("Job submitted");
        // Initial need, so the first pass already ranks by priority.
        job.calc_need();
        tracing::info!(job = %spec.name, id, owner = %spec.owner, "Job submitted");
        self.jobs.push(job);
        Ok(id)
    }

    pub fn get(&self, name: &str) -> Option<&RenderJob> {
        self.jobs.iter().find(|j| j.core().name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut RenderJob> {
        self.jobs.iter_mut().find(|j| j.core().name == name)
    }

    /// External priority mutation; fires the unit's notification hook.
    pub fn set_priority(&mut self, name: &str, priority: u8) -> Result<()> {
        let job = self
            .get_mut(name)
            .ok_or_else(|| FarmError::JobNotFound(name.to_string()))?;
        job.core_mut().priority = priority;
        job.core_mut()
            .append_log(format!("Priority set to {priority}"));
        job.priority_changed();
        Ok(())
    }

    /// Complete every running task, returning host shares. Stands in for
    /// host task reports in tests and the demo loop.
    pub fn finish_running_tasks(&mut self, hosts: &mut HostList) -> u32 {
        let mut finished = 0;
        for job in &mut self.jobs {
            while job.finish_one_task(hosts).is_some() {
                finished += 1;
            }
        }
        finished
    }

    /// Drop jobs whose tasks are all done. Returns how many were removed.
    pub fn remove_finished(&mut self) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|j| !j.is_done());
        before - self.jobs.len()
    }

    pub fn all_done(&self) -> bool {
        self.jobs.iter().all(|j| j.is_done())
    }

    pub fn iter(&self) -> impl Iterator<Item = &RenderJob> {
        self.jobs.iter()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl UnitSource for JobBoard {
    fn units(&mut self, mode: SourceMode) -> Vec<&mut dyn Schedulable> {
        match mode {
            SourceMode::ByJobPriority => self
                .jobs
                .iter_mut()
                .map(|j| j as &mut dyn Schedulable)
                .collect(),
            SourceMode::ByUserOrder => {
                // Interleave owners round-robin: first job of every owner,
                // then second of every owner, and so on. Owners in name
                // order, each owner's jobs in submission order.
                let mut seq: BTreeMap<String, u32> = BTreeMap::new();
                let mut keyed: Vec<((u32, String), &mut RenderJob)> = self
                    .jobs
                    .iter_mut()
                    .map(|j| {
                        let n = seq.entry(j.owner.clone()).or_insert(0);
                        let key = (*n, j.owner.clone());
                        *n += 1;
                        (key, j)
                    })
                    .collect();
                keyed.sort_by(|a, b| a.0.cmp(&b.0));
                keyed
                    .into_iter()
                    .map(|(_, j)| j as &mut dyn Schedulable)
                    .collect()
            }
        }
    }
}
