// Reindeer - Crawling Job Definitions
//
// Task graphs for the periodic crawlers plus the runner and scheduler that
// execute them. Each task is either a shell script (docker build/run/prune)
// or an in-process environment check.

pub mod config;
pub mod context;
pub mod dag;
pub mod definitions;
pub mod runner;
pub mod scheduler;

pub use config::JobsConfig;
pub use context::RunContext;
pub use dag::{CheckKind, Dag, DagError, DefaultArgs, Task, TaskKind};
pub use definitions::{all_dags, danawa_crawling_dag, find_dag, test_dag};
pub use runner::{run_dag, DagRunReport, ShellExecutor, TaskExecutor, TaskRun, TaskState};
pub use scheduler::start_scheduler;
