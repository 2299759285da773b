//! Executes one DAG run: tasks in dependency order, retries per
//! [`DefaultArgs`](crate::dag::DefaultArgs), downstream tasks skipped once an
//! upstream fails.

use std::collections::HashMap;
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::context::RunContext;
use crate::dag::{Dag, DagError, TaskKind};

// =============================================================================
// Executor
// =============================================================================

/// Runs rendered shell scripts.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn run_shell(&self, task_id: &str, script: &str) -> Result<()>;
}

/// `bash -c <script>` via tokio's process API.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    shell: String,
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self {
            shell: "bash".to_string(),
        }
    }
}

impl ShellExecutor {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

#[async_trait]
impl TaskExecutor for ShellExecutor {
    async fn run_shell(&self, task_id: &str, script: &str) -> Result<()> {
        let output = tokio::process::Command::new(&self.shell)
            .arg("-c")
            .arg(script)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("Failed to spawn {} for task {}", self.shell, task_id))?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            info!(task = task_id, "{}", line);
        }
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            warn!(task = task_id, "{}", line);
        }

        if !output.status.success() {
            bail!("task {} exited with {}", task_id, output.status);
        }
        Ok(())
    }
}

// =============================================================================
// Report
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Success,
    Failed(String),
    /// Not attempted because an upstream task did not succeed
    UpstreamFailed,
}

#[derive(Debug, Clone)]
pub struct TaskRun {
    pub task_id: String,
    pub state: TaskState,
    pub attempts: u32,
}

#[derive(Debug, Clone)]
pub struct DagRunReport {
    pub dag_id: String,
    pub logical_date: DateTime<Utc>,
    pub tasks: Vec<TaskRun>,
}

impl DagRunReport {
    pub fn is_success(&self) -> bool {
        self.tasks.iter().all(|t| t.state == TaskState::Success)
    }

    pub fn state_of(&self, task_id: &str) -> Option<&TaskState> {
        self.tasks
            .iter()
            .find(|t| t.task_id == task_id)
            .map(|t| &t.state)
    }
}

// =============================================================================
// Run
// =============================================================================

/// Execute every task of `dag` for the given logical date.
///
/// Only graph validation errors are returned; task failures end up in the
/// report.
pub async fn run_dag(
    dag: &Dag,
    ctx: &RunContext,
    executor: &dyn TaskExecutor,
) -> Result<DagRunReport, DagError> {
    let order = dag.topological_order()?;
    let args = &dag.default_args;

    info!(dag = %dag.id, logical_date = %ctx.ts(), tasks = order.len(), "Starting DAG run");

    let mut states: HashMap<&str, TaskState> = HashMap::new();
    let mut runs = Vec::with_capacity(order.len());

    for task in order {
        let blocked = dag
            .upstream_of(&task.id)
            .iter()
            .any(|up| states.get(up) != Some(&TaskState::Success));

        if blocked {
            warn!(dag = %dag.id, task = %task.id, "Skipping task: upstream failed");
            states.insert(task.id.as_str(), TaskState::UpstreamFailed);
            runs.push(TaskRun {
                task_id: task.id.clone(),
                state: TaskState::UpstreamFailed,
                attempts: 0,
            });
            continue;
        }

        let mut attempts = 0;
        let state = loop {
            attempts += 1;
            let result = match &task.kind {
                TaskKind::Shell(template) => executor.run_shell(&task.id, &ctx.render(template)).await,
                TaskKind::Check(check) => check.run(ctx).map(|_| ()),
            };

            match result {
                Ok(()) => {
                    info!(dag = %dag.id, task = %task.id, attempts, "Task succeeded");
                    break TaskState::Success;
                }
                Err(e) if attempts <= args.retries => {
                    warn!(
                        dag = %dag.id,
                        task = %task.id,
                        attempt = attempts,
                        retry_in = ?args.retry_delay,
                        error = %e,
                        "Task failed, retrying"
                    );
                    tokio::time::sleep(args.retry_delay).await;
                }
                Err(e) => {
                    error!(dag = %dag.id, task = %task.id, attempts, error = %e, "Task failed");
                    break TaskState::Failed(format!("{:#}", e));
                }
            }
        };

        states.insert(task.id.as_str(), state.clone());
        runs.push(TaskRun {
            task_id: task.id.clone(),
            state,
            attempts,
        });
    }

    let report = DagRunReport {
        dag_id: dag.id.clone(),
        logical_date: ctx.logical_date,
        tasks: runs,
    };

    if report.is_success() {
        info!(dag = %dag.id, "DAG run succeeded");
    } else {
        error!(dag = %dag.id, "DAG run failed");
    }

    Ok(report)
}
