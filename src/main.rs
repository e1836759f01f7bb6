use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use farm_lite::config::{FarmConfig, SolveConfig};
use farm_lite::error::FarmError;
use farm_lite::events::{LoggingWake, TracingSink};
use farm_lite::farm::{JobBoard, JobSpec};
use farm_lite::scheduler::{HostList, RenderHost, Schedulable, Solver};

#[derive(Parser, Debug)]
#[command(name = "farm-lite")]
#[command(version)]
#[command(about = "A render farm job scheduler with fair-share solving")]
struct Args {
    /// Host spec, repeatable (format: "name:capacity:max_tasks:svc+svc[:flags]",
    /// flags: "wol", "asleep")
    #[arg(long = "host")]
    hosts: Vec<String>,

    /// Job spec, repeatable (format:
    /// "name:owner:priority:service:task_capacity:tasks_total")
    #[arg(long = "job")]
    jobs: Vec<String>,

    /// Flatten the solve list per owning user instead of per job priority
    #[arg(long)]
    by_user: bool,

    /// Sort by priority and age instead of the fair-share need metric
    #[arg(long)]
    simpler: bool,

    /// Max task assignments per solving invocation (unbounded if omitted)
    #[arg(long)]
    tasks_per_pass: Option<u32>,

    /// Max sleeping hosts woken per solving invocation
    #[arg(long, default_value = "1")]
    wake_per_pass: u32,

    /// Milliseconds between solving invocations
    #[arg(long, default_value = "500")]
    interval_ms: u64,

    /// Output format for the final snapshot
    #[arg(long, short = 'o', default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

// =============================================================================
// Snapshot Output Types
// =============================================================================

#[derive(Serialize)]
struct JobOutput {
    name: String,
    owner: String,
    priority: u8,
    need: f64,
    solve_cycle: u64,
    tasks_done: u32,
    tasks_total: u32,
    state: String,
}

#[derive(Serialize)]
struct HostOutput {
    name: String,
    tasks: u32,
    capacity_free: u32,
    capacity: u32,
    ready: bool,
    busy: bool,
}

#[derive(Serialize)]
struct Snapshot {
    ticks: u64,
    tasks_solved: u32,
    awakened_hosts: u32,
    jobs: Vec<JobOutput>,
    hosts: Vec<HostOutput>,
}

// =============================================================================
// Spec Parsing
// =============================================================================

fn parse_host_spec(spec: &str) -> Result<RenderHost, FarmError> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() < 4 || parts.len() > 5 {
        return Err(FarmError::InvalidHostSpec(
            spec.to_string(),
            "expected name:capacity:max_tasks:services[:flags]".to_string(),
        ));
    }

    let capacity: u32 = parts[1].parse().map_err(|_| {
        FarmError::InvalidHostSpec(spec.to_string(), "capacity must be an integer".to_string())
    })?;
    let max_tasks: u32 = parts[2].parse().map_err(|_| {
        FarmError::InvalidHostSpec(spec.to_string(), "max_tasks must be an integer".to_string())
    })?;

    let mut host = RenderHost::new(parts[0], capacity, max_tasks);
    for service in parts[3].split('+').filter(|s| !s.is_empty()) {
        host = host.with_service(service);
    }

    if parts.len() == 5 {
        for flag in parts[4].split('+') {
            match flag {
                "wol" => host = host.wol_capable(),
                "asleep" => host = host.asleep(),
                other => {
                    return Err(FarmError::InvalidHostSpec(
                        spec.to_string(),
                        format!("unknown flag '{other}'"),
                    ))
                }
            }
        }
    }

    Ok(host)
}

fn parse_job_spec(spec: &str) -> Result<JobSpec, FarmError> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() != 6 {
        return Err(FarmError::InvalidJobSpec(
            spec.to_string(),
            "expected name:owner:priority:service:task_capacity:tasks_total".to_string(),
        ));
    }

    let priority: u8 = parts[2].parse().map_err(|_| {
        FarmError::InvalidJobSpec(spec.to_string(), "priority must be 0-255".to_string())
    })?;
    let task_capacity: u32 = parts[4].parse().map_err(|_| {
        FarmError::InvalidJobSpec(
            spec.to_string(),
            "task_capacity must be an integer".to_string(),
        )
    })?;
    let tasks_total: u32 = parts[5].parse().map_err(|_| {
        FarmError::InvalidJobSpec(
            spec.to_string(),
            "tasks_total must be an integer".to_string(),
        )
    })?;

    Ok(JobSpec::new(
        parts[0],
        parts[1],
        priority,
        parts[3],
        task_capacity,
        tasks_total,
    ))
}

/// Small built-in farm for running without arguments.
fn seed_demo(board: &mut JobBoard, hosts: &mut HostList) -> Result<(), FarmError> {
    hosts.add(
        RenderHost::new("hal01", 100, 2)
            .with_service("maya")
            .with_service("nuke"),
    );
    hosts.add(RenderHost::new("hal02", 100, 2).with_service("maya"));
    hosts.add(
        RenderHost::new("hal03", 200, 4)
            .with_service("nuke")
            .wol_capable()
            .asleep(),
    );

    board.submit(JobSpec::new("shot-010-fx", "ada", 90, "maya", 50, 6))?;
    board.submit(JobSpec::new("shot-020-comp", "ada", 50, "nuke", 40, 4))?;
    board.submit(JobSpec::new("shot-030-anim", "grace", 50, "maya", 50, 5))?;
    Ok(())
}

// =============================================================================
// Snapshot Printing
// =============================================================================

fn build_snapshot(
    board: &JobBoard,
    hosts: &HostList,
    ticks: u64,
    tasks_solved: u32,
    awakened_hosts: u32,
) -> Snapshot {
    let jobs = board
        .iter()
        .map(|job| {
            let state = if job.is_done() {
                "done"
            } else if job.tasks_running > 0 {
                "running"
            } else {
                "pending"
            };
            JobOutput {
                name: job.core().name.clone(),
                owner: job.owner.clone(),
                priority: job.core().priority,
                need: job.core().need(),
                solve_cycle: job.core().solve_cycle(),
                tasks_done: job.tasks_done,
                tasks_total: job.tasks_total,
                state: state.to_string(),
            }
        })
        .collect();

    let hosts = hosts
        .iter()
        .map(|host| HostOutput {
            name: host.name.clone(),
            tasks: host.tasks_count,
            capacity_free: host.capacity_free,
            capacity: host.capacity,
            ready: host.ready,
            busy: host.busy,
        })
        .collect();

    Snapshot {
        ticks,
        tasks_solved,
        awakened_hosts,
        jobs,
        hosts,
    }
}

fn print_snapshot(snapshot: &Snapshot, output: &OutputFormat) -> Result<(), serde_json::Error> {
    match output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(snapshot)?);
        }
        OutputFormat::Table => {
            println!(
                "Solved {} tasks, woke {} hosts in {} ticks",
                snapshot.tasks_solved, snapshot.awakened_hosts, snapshot.ticks
            );
            println!();
            println!(
                "{:<16} {:<8} {:<4} {:<10} {:<8} TASKS",
                "JOB", "OWNER", "PRI", "STATE", "CYCLE"
            );
            println!("{}", "-".repeat(60));
            for job in &snapshot.jobs {
                println!(
                    "{:<16} {:<8} {:<4} {:<10} {:<8} {}/{}",
                    job.name,
                    job.owner,
                    job.priority,
                    job.state,
                    job.solve_cycle,
                    job.tasks_done,
                    job.tasks_total
                );
            }
            println!();
            println!("{:<16} {:<6} {:<12} STATUS", "HOST", "TASKS", "CAPACITY");
            println!("{}", "-".repeat(45));
            for host in &snapshot.hosts {
                let status = if host.ready { "ready" } else { "asleep" };
                println!(
                    "{:<16} {:<6} {:<12} {}",
                    host.name,
                    host.tasks,
                    format!("{}/{}", host.capacity_free, host.capacity),
                    status
                );
            }
        }
    }
    Ok(())
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let solve = SolveConfig {
        use_user_priority: args.by_user,
        simpler_sort: args.simpler,
        tasks_per_pass: args.tasks_per_pass,
        wake_per_pass: args.wake_per_pass,
        ..SolveConfig::default()
    };
    let config = FarmConfig {
        solve,
        solve_interval_ms: args.interval_ms,
    };

    let mut hosts = HostList::new();
    let mut board = JobBoard::new();
    if args.hosts.is_empty() && args.jobs.is_empty() {
        tracing::info!("No specs given, seeding demo farm");
        seed_demo(&mut board, &mut hosts)?;
    } else {
        for spec in &args.hosts {
            hosts.add(parse_host_spec(spec)?);
        }
        for spec in &args.jobs {
            board.submit(parse_job_spec(spec)?)?;
        }
    }

    tracing::info!(
        jobs = board.len(),
        hosts = hosts.len(),
        by_user = config.solve.use_user_priority,
        simpler = config.solve.simpler_sort,
        "Starting farm-lite"
    );

    let mut solver = Solver::new(config.solve.clone());
    let sink = TracingSink;
    let wake = LoggingWake;

    let mut interval = tokio::time::interval(tokio::time::Duration::from_millis(
        config.solve_interval_ms,
    ));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut ticks = 0u64;
    let mut tasks_solved = 0u32;
    let mut awakened_hosts = 0u32;
    let mut idle_ticks = 0u32;

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("Interrupted, stopping");
                break;
            }
            _ = interval.tick() => {
                ticks += 1;

                // Stand-ins for host reports: running tasks complete after
                // one interval, woken hosts come back online.
                let finished = board.finish_running_tasks(&mut hosts);
                for host in hosts.iter_mut() {
                    if host.wake_pending {
                        host.wake_complete();
                    }
                }

                let stats = solver.solve(&mut board, &mut hosts, &wake, &sink);
                tasks_solved += stats.tasks_solved;
                awakened_hosts += stats.awakened_hosts;

                if board.all_done() {
                    tracing::info!("All jobs finished");
                    break;
                }

                if stats.tasks_solved == 0 && stats.awakened_hosts == 0 && finished == 0 {
                    idle_ticks += 1;
                    if idle_ticks >= 3 {
                        tracing::warn!("No schedulable work remains, stopping");
                        break;
                    }
                } else {
                    idle_ticks = 0;
                }
            }
        }
    }

    let snapshot = build_snapshot(&board, &hosts, ticks, tasks_solved, awakened_hosts);
    print_snapshot(&snapshot, &args.output)?;
    Ok(())
}
