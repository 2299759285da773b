//! Task graph model for crawling jobs.
//!
//! A [`Dag`] is a set of named tasks plus `upstream -> downstream` edges.
//! Graphs are built with a small builder and validated lazily by
//! [`Dag::topological_order`].

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;

use crate::context::RunContext;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DagError {
    #[error("dag {dag}: duplicate task id '{task}'")]
    DuplicateTask { dag: String, task: String },

    #[error("dag {dag}: edge references unknown task '{task}'")]
    UnknownTask { dag: String, task: String },

    #[error("dag {dag}: dependency cycle through {tasks:?}")]
    Cycle { dag: String, tasks: Vec<String> },
}

/// Run settings shared by every task of a DAG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultArgs {
    pub owner: String,
    pub depends_on_past: bool,
    pub start_date: DateTime<Utc>,
    pub email_on_failure: bool,
    pub email_on_retry: bool,
    /// Extra attempts after the first failure
    pub retries: u32,
    pub retry_delay: Duration,
}

impl Default for DefaultArgs {
    fn default() -> Self {
        Self {
            owner: "airflow".to_string(),
            depends_on_past: false,
            start_date: Utc
                .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
                .single()
                .unwrap_or_default(),
            email_on_failure: false,
            email_on_retry: false,
            retries: 1,
            retry_delay: Duration::from_secs(5 * 60),
        }
    }
}

/// In-process checks that bracket a crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    PreCrawl,
    PostCrawlCleanup,
}

impl CheckKind {
    /// Log the environment and return a short status line.
    pub fn run(&self, ctx: &RunContext) -> anyhow::Result<String> {
        match self {
            CheckKind::PreCrawl => {
                let cwd = std::env::current_dir()?;
                tracing::info!(
                    logical_date = %ctx.ds(),
                    now = %Utc::now(),
                    cwd = %cwd.display(),
                    "Pre-crawl environment check: crawler runs inside docker"
                );
                Ok("check complete".to_string())
            }
            CheckKind::PostCrawlCleanup => {
                tracing::info!(logical_date = %ctx.ds(), "Post-crawl cleanup complete");
                Ok("cleanup complete".to_string())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskKind {
    /// Bash script, rendered against the run context before execution
    Shell(String),
    Check(CheckKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub kind: TaskKind,
}

impl Task {
    pub fn shell(id: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: TaskKind::Shell(script.into()),
        }
    }

    pub fn check(id: impl Into<String>, kind: CheckKind) -> Self {
        Self {
            id: id.into(),
            kind: TaskKind::Check(kind),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Dag {
    pub id: String,
    pub description: String,
    pub schedule: Duration,
    pub catchup: bool,
    pub tags: Vec<String>,
    pub default_args: DefaultArgs,
    tasks: Vec<Task>,
    edges: Vec<(String, String)>,
}

impl Dag {
    pub fn new(id: impl Into<String>, schedule: Duration) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            schedule,
            catchup: false,
            tags: Vec::new(),
            default_args: DefaultArgs::default(),
            tasks: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn default_args(mut self, args: DefaultArgs) -> Self {
        self.default_args = args;
        self
    }

    pub fn task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    /// Wire `a >> b >> c`: each task depends on the one before it.
    pub fn chain(mut self, ids: &[&str]) -> Self {
        for pair in ids.windows(2) {
            self.edges.push((pair[0].to_string(), pair[1].to_string()));
        }
        self
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn edges(&self) -> &[(String, String)] {
        &self.edges
    }

    pub fn get_task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Direct upstream task ids of `id`.
    pub fn upstream_of(&self, id: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|(_, down)| down == id)
            .map(|(up, _)| up.as_str())
            .collect()
    }

    /// Validate the graph and order tasks so every task follows its upstreams.
    ///
    /// Ties keep declaration order.
    pub fn topological_order(&self) -> Result<Vec<&Task>, DagError> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        for (i, task) in self.tasks.iter().enumerate() {
            if index.insert(task.id.as_str(), i).is_some() {
                return Err(DagError::DuplicateTask {
                    dag: self.id.clone(),
                    task: task.id.clone(),
                });
            }
        }

        let mut in_degree = vec![0usize; self.tasks.len()];
        let mut downstream: Vec<Vec<usize>> = vec![Vec::new(); self.tasks.len()];
        let mut seen_edges = HashSet::new();
        for (up, down) in &self.edges {
            let lookup = |id: &String| {
                index.get(id.as_str()).copied().ok_or_else(|| DagError::UnknownTask {
                    dag: self.id.clone(),
                    task: id.clone(),
                })
            };
            let (u, d) = (lookup(up)?, lookup(down)?);
            if seen_edges.insert((u, d)) {
                downstream[u].push(d);
                in_degree[d] += 1;
            }
        }

        let mut ready: VecDeque<usize> = (0..self.tasks.len())
            .filter(|&i| in_degree[i] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.tasks.len());

        while let Some(i) = ready.pop_front() {
            order.push(&self.tasks[i]);
            let mut next: Vec<usize> = Vec::new();
            for &d in &downstream[i] {
                in_degree[d] -= 1;
                if in_degree[d] == 0 {
                    next.push(d);
                }
            }
            next.sort_unstable();
            ready.extend(next);
        }

        if order.len() != self.tasks.len() {
            let tasks = self
                .tasks
                .iter()
                .enumerate()
                .filter(|(i, _)| in_degree[*i] > 0)
                .map(|(_, t)| t.id.clone())
                .collect();
            return Err(DagError::Cycle {
                dag: self.id.clone(),
                tasks,
            });
        }

        Ok(order)
    }
}
