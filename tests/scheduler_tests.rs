use std::cmp::Ordering;

use farm_lite::farm::{JobSpec, RenderJob};
use farm_lite::scheduler::{
    solve_pass, HostList, RenderHost, Schedulable, SolveCycle, SolveMethod, UnitCore, UnitOrder,
};

fn render_host(name: &str) -> RenderHost {
    RenderHost::new(name, 100, 4).with_service("render")
}

fn render_job(id: u32, name: &str, priority: u8, tasks: u32) -> RenderJob {
    let mut job = RenderJob::new(
        UnitCore::new(id, name, priority),
        &JobSpec::new(name, "user", priority, "render", 10, tasks),
    );
    job.calc_need();
    job
}

// ==================== Host ranking ====================

#[test]
fn test_most_ready_prefers_emptiest_host() {
    let mut loaded = render_host("alpha").with_priority(200);
    loaded.tasks_count = 1;
    let empty = render_host("zeta");

    // Task count outranks every later key.
    assert_eq!(empty.most_ready(&loaded), Ordering::Less);
    assert_eq!(loaded.most_ready(&empty), Ordering::Greater);
}

#[test]
fn test_most_ready_free_capacity_breaks_task_tie() {
    let mut a = render_host("a");
    a.capacity_free = 50;
    let mut b = render_host("b");
    b.capacity_free = 80;

    assert_eq!(b.most_ready(&a), Ordering::Less);
}

#[test]
fn test_most_ready_priority_breaks_capacity_tie() {
    // Equal tasks and free capacity: priority decides irrespective of name.
    let a = RenderHost::new("a", 5, 4).with_priority(0);
    let b = RenderHost::new("b", 5, 4).with_priority(1);

    assert_eq!(b.most_ready(&a), Ordering::Less);
}

#[test]
fn test_most_ready_earlier_task_time_wins() {
    let mut a = render_host("a");
    a.tasks_start_finish_time = 2000;
    let mut b = render_host("b");
    b.tasks_start_finish_time = 1000;

    assert_eq!(b.most_ready(&a), Ordering::Less);
}

#[test]
fn test_most_ready_name_is_final_key() {
    let a = render_host("a");
    let b = render_host("b");

    assert_eq!(a.most_ready(&b), Ordering::Less);
    assert_eq!(b.most_ready(&a), Ordering::Greater);
}

// ==================== Matching pass ====================

#[test]
fn test_pass_returns_at_most_one_assignment() {
    let mut hosts = HostList::new();
    hosts.add(render_host("h1"));
    hosts.add(render_host("h2"));

    let mut j1 = render_job(1, "j1", 5, 3);
    let mut j2 = render_job(2, "j2", 5, 3);
    let mut cycle = SolveCycle::new();

    let mut list: Vec<&mut dyn Schedulable> = vec![&mut j1, &mut j2];
    let found = solve_pass(
        &mut list,
        SolveMethod::ByPriority,
        UnitOrder::Need,
        &mut hosts,
        &mut cycle,
        false,
    );

    assert!(found.is_some());
    let assigned: u32 = hosts.iter().map(|h| h.tasks_count).sum();
    assert_eq!(assigned, 1);
}

#[test]
fn test_repeated_passes_converge_to_none() {
    let mut hosts = HostList::new();
    hosts.add(RenderHost::new("h1", 100, 1).with_service("render"));

    let mut j1 = render_job(1, "j1", 5, 1);
    let mut j2 = render_job(2, "j2", 5, 1);
    let mut cycle = SolveCycle::new();

    let mut list: Vec<&mut dyn Schedulable> = vec![&mut j1, &mut j2];

    // One slot: the first call assigns it, the second drains the list.
    let first = solve_pass(
        &mut list,
        SolveMethod::ByPriority,
        UnitOrder::Need,
        &mut hosts,
        &mut cycle,
        false,
    );
    assert!(first.is_some());

    let second = solve_pass(
        &mut list,
        SolveMethod::ByPriority,
        UnitOrder::Need,
        &mut hosts,
        &mut cycle,
        false,
    );
    assert!(second.is_none());
    assert!(list.is_empty());
}

#[test]
fn test_solve_cycle_stamps_are_strictly_increasing() {
    let mut hosts = HostList::new();
    hosts.add(render_host("h1"));

    let mut j1 = render_job(1, "j1", 5, 1);
    let mut j2 = render_job(2, "j2", 5, 1);
    let mut cycle = SolveCycle::new();

    {
        let mut list: Vec<&mut dyn Schedulable> = vec![&mut j1, &mut j2];
        solve_pass(
            &mut list,
            SolveMethod::ByPriority,
            UnitOrder::Need,
            &mut hosts,
            &mut cycle,
            false,
        );
        solve_pass(
            &mut list,
            SolveMethod::ByPriority,
            UnitOrder::Need,
            &mut hosts,
            &mut cycle,
            false,
        );
    }

    // Stamped with the pre-increment value; counter moved past both.
    assert_eq!(j1.core().solve_cycle(), 1);
    assert_eq!(j2.core().solve_cycle(), 2);
    assert_eq!(cycle.current(), 3);
}

#[test]
fn test_never_solved_unit_outranks_solved_at_equal_need() {
    let mut hosts = HostList::new();
    hosts.add(render_host("h1"));

    let mut j1 = render_job(1, "j1", 5, 2);
    let mut j2 = render_job(2, "j2", 5, 2);
    let mut cycle = SolveCycle::new();

    {
        let mut list: Vec<&mut dyn Schedulable> = vec![&mut j1, &mut j2];
        solve_pass(
            &mut list,
            SolveMethod::ByPriority,
            UnitOrder::Need,
            &mut hosts,
            &mut cycle,
            false,
        );
    }

    assert_eq!(j1.core().solve_cycle(), 1);
    assert_eq!(j2.core().solve_cycle(), 0);
}

#[test]
fn test_by_order_keeps_caller_precedence() {
    let mut hosts = HostList::new();
    hosts.add(render_host("h1"));

    let mut low = render_job(1, "low", 0, 1);
    let mut high = render_job(2, "high", 9, 1);
    let mut cycle = SolveCycle::new();

    let mut list: Vec<&mut dyn Schedulable> = vec![&mut low, &mut high];
    let found = solve_pass(
        &mut list,
        SolveMethod::ByOrder,
        UnitOrder::Need,
        &mut hosts,
        &mut cycle,
        false,
    )
    .unwrap();

    assert_eq!(found.unit_name, "low");
}

#[test]
fn test_by_priority_sorts_by_need() {
    let mut hosts = HostList::new();
    hosts.add(render_host("h1"));

    let mut low = render_job(1, "low", 0, 1);
    let mut high = render_job(2, "high", 9, 1);
    let mut cycle = SolveCycle::new();

    let mut list: Vec<&mut dyn Schedulable> = vec![&mut low, &mut high];
    let found = solve_pass(
        &mut list,
        SolveMethod::ByPriority,
        UnitOrder::Need,
        &mut hosts,
        &mut cycle,
        false,
    )
    .unwrap();

    assert_eq!(found.unit_name, "high");
}

#[test]
fn test_simpler_order_sorts_by_priority_then_age() {
    let mut hosts = HostList::new();
    hosts.add(render_host("h1"));

    let mut low = render_job(1, "low", 0, 1);
    let mut high = render_job(2, "high", 9, 1);
    let mut cycle = SolveCycle::new();

    let mut list: Vec<&mut dyn Schedulable> = vec![&mut low, &mut high];
    let found = solve_pass(
        &mut list,
        SolveMethod::ByPriority,
        UnitOrder::PriorityThenCreation,
        &mut hosts,
        &mut cycle,
        false,
    )
    .unwrap();

    assert_eq!(found.unit_name, "high");
}

// ==================== Wake candidates ====================

#[test]
fn test_sleeping_host_offered_only_when_wake_allowed() {
    let mut hosts = HostList::new();
    hosts.add(render_host("sleeper").wol_capable().asleep());

    let mut job = render_job(1, "j1", 5, 1);
    let mut cycle = SolveCycle::new();

    {
        let mut list: Vec<&mut dyn Schedulable> = vec![&mut job];
        let found = solve_pass(
            &mut list,
            SolveMethod::ByPriority,
            UnitOrder::Need,
            &mut hosts,
            &mut cycle,
            false,
        );
        assert!(found.is_none());
    }

    let mut list: Vec<&mut dyn Schedulable> = vec![&mut job];
    let found = solve_pass(
        &mut list,
        SolveMethod::ByPriority,
        UnitOrder::Need,
        &mut hosts,
        &mut cycle,
        true,
    )
    .unwrap();

    assert!(found.woken);
    // A wake is not a task assignment.
    assert_eq!(hosts.get(found.host).tasks_count, 0);
}

#[test]
fn test_wake_pending_host_is_never_a_candidate() {
    let mut hosts = HostList::new();
    let id = hosts.add(render_host("sleeper").wol_capable().asleep());
    hosts.get_mut(id).wake_requested();

    let mut job = render_job(1, "j1", 5, 1);
    let mut cycle = SolveCycle::new();

    let mut list: Vec<&mut dyn Schedulable> = vec![&mut job];
    let found = solve_pass(
        &mut list,
        SolveMethod::ByPriority,
        UnitOrder::Need,
        &mut hosts,
        &mut cycle,
        true,
    );

    assert!(found.is_none());
}

#[test]
fn test_plain_offline_host_is_not_wakeable() {
    let mut hosts = HostList::new();
    hosts.add(render_host("offline").asleep());

    let mut job = render_job(1, "j1", 5, 1);
    let mut cycle = SolveCycle::new();

    let mut list: Vec<&mut dyn Schedulable> = vec![&mut job];
    let found = solve_pass(
        &mut list,
        SolveMethod::ByPriority,
        UnitOrder::Need,
        &mut hosts,
        &mut cycle,
        true,
    );

    assert!(found.is_none());
}

// ==================== Capability degradation ====================

/// A kind that implements nothing beyond the core accessors. The default
/// capability surface must keep it out of the way without breaking the pass.
struct BareUnit {
    core: UnitCore,
}

impl Schedulable for BareUnit {
    fn core(&self) -> &UnitCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut UnitCore {
        &mut self.core
    }
}

#[test]
fn test_unimplemented_kind_degrades_to_noop() {
    let mut hosts = HostList::new();
    hosts.add(render_host("h1"));

    let mut bare = BareUnit {
        core: UnitCore::new(1, "bare", 200),
    };
    let mut job = render_job(2, "real", 1, 1);
    let mut cycle = SolveCycle::new();

    let mut list: Vec<&mut dyn Schedulable> = vec![&mut bare, &mut job];
    let found = solve_pass(
        &mut list,
        SolveMethod::ByPriority,
        UnitOrder::Need,
        &mut hosts,
        &mut cycle,
        false,
    )
    .unwrap();

    assert_eq!(found.unit_name, "real");
}

// ==================== Job compatibility ====================

#[test]
fn test_job_rejects_host_without_service() {
    let mut hosts = HostList::new();
    hosts.add(RenderHost::new("h1", 100, 4).with_service("comp"));

    let mut job = render_job(1, "j1", 5, 1);
    let mut cycle = SolveCycle::new();

    let mut list: Vec<&mut dyn Schedulable> = vec![&mut job];
    let found = solve_pass(
        &mut list,
        SolveMethod::ByPriority,
        UnitOrder::Need,
        &mut hosts,
        &mut cycle,
        false,
    );

    assert!(found.is_none());
}

#[test]
fn test_job_host_mask_restricts_candidates() {
    let mut hosts = HostList::new();
    hosts.add(render_host("room-a-01"));
    let wanted = hosts.add(render_host("room-b-01"));

    let spec = JobSpec::new("masked", "user", 5, "render", 10, 1).with_host_mask("room-b");
    let mut job = RenderJob::new(UnitCore::new(1, "masked", 5), &spec);
    job.calc_need();
    let mut cycle = SolveCycle::new();

    let mut list: Vec<&mut dyn Schedulable> = vec![&mut job];
    let found = solve_pass(
        &mut list,
        SolveMethod::ByPriority,
        UnitOrder::Need,
        &mut hosts,
        &mut cycle,
        false,
    )
    .unwrap();

    assert_eq!(found.host, wanted);
}

#[test]
fn test_job_respects_max_running_limit() {
    let mut hosts = HostList::new();
    hosts.add(render_host("h1"));

    let spec = JobSpec::new("limited", "user", 5, "render", 10, 4).with_max_running(1);
    let mut job = RenderJob::new(UnitCore::new(1, "limited", 5), &spec);
    job.calc_need();
    let mut cycle = SolveCycle::new();

    {
        let mut list: Vec<&mut dyn Schedulable> = vec![&mut job];
        assert!(solve_pass(
            &mut list,
            SolveMethod::ByPriority,
            UnitOrder::Need,
            &mut hosts,
            &mut cycle,
            false,
        )
        .is_some());
    }

    assert!(!job.can_run());

    let mut list: Vec<&mut dyn Schedulable> = vec![&mut job];
    let found = solve_pass(
        &mut list,
        SolveMethod::ByPriority,
        UnitOrder::Need,
        &mut hosts,
        &mut cycle,
        false,
    );
    assert!(found.is_none());
}

#[test]
fn test_locked_job_is_excluded() {
    let mut hosts = HostList::new();
    hosts.add(render_host("h1"));

    let mut job = render_job(1, "j1", 5, 1);
    job.core_mut().locked = true;
    let mut cycle = SolveCycle::new();

    let mut list: Vec<&mut dyn Schedulable> = vec![&mut job];
    let found = solve_pass(
        &mut list,
        SolveMethod::ByPriority,
        UnitOrder::Need,
        &mut hosts,
        &mut cycle,
        false,
    );

    assert!(found.is_none());
    assert!(list.is_empty());
}
