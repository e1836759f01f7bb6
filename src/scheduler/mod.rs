pub mod engine;
pub mod host;
pub mod matcher;
pub mod unit;

pub use engine::{Solver, SolveStats, SourceMode, UnitSource};
pub use host::{HostId, HostList, RenderHost};
pub use matcher::{solve_pass, Match, SolveMethod, UnitOrder};
pub use unit::{need_score, try_solve, Schedulable, SolveCycle, UnitCore};
