//! Periodic DAG runs using tokio-cron-scheduler.
//!
//! ```text
//! Scheduler (every dag.schedule)
//!     │
//!     └─► skip if before start_date or a run is still active
//!             └─► run_dag(logical_date = now - schedule)
//! ```
//!
//! There is no catchup: missed slots are not replayed.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::context::RunContext;
use crate::dag::Dag;
use crate::runner::{run_dag, TaskExecutor};

/// Register every DAG on its fixed interval and start the scheduler.
pub async fn start_scheduler(
    dags: Vec<Dag>,
    executor: Arc<dyn TaskExecutor>,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    for dag in dags {
        // Fail at startup rather than on the first tick
        dag.topological_order()?;

        let interval = dag.schedule;
        let dag_id = dag.id.clone();
        let dag = Arc::new(dag);
        let active = Arc::new(Mutex::new(()));
        let executor = executor.clone();

        let job = Job::new_repeated_async(interval, move |_uuid, _lock| {
            let dag = dag.clone();
            let active = active.clone();
            let executor = executor.clone();
            Box::pin(async move {
                scheduled_run(&dag, &active, executor.as_ref()).await;
            })
        })?;

        scheduler.add(job).await?;
        tracing::info!(dag = %dag_id, interval = ?interval, "Registered DAG");
    }

    scheduler.start().await?;
    tracing::info!("Crawl job scheduler started");
    Ok(scheduler)
}

async fn scheduled_run(dag: &Dag, active: &Mutex<()>, executor: &dyn TaskExecutor) {
    let now = Utc::now();
    if now < dag.default_args.start_date {
        tracing::debug!(dag = %dag.id, "Before start date, skipping");
        return;
    }

    let Ok(_guard) = active.try_lock() else {
        tracing::warn!(dag = %dag.id, "Previous run still active, skipping this slot");
        return;
    };

    let schedule = chrono::Duration::from_std(dag.schedule).unwrap_or(chrono::Duration::zero());
    let ctx = RunContext::new(now - schedule);

    match run_dag(dag, &ctx, executor).await {
        Ok(report) if !report.is_success() => {
            tracing::error!(dag = %dag.id, logical_date = %ctx.ts(), "Scheduled run failed");
        }
        Ok(_) => {}
        Err(e) => tracing::error!(dag = %dag.id, "Invalid DAG: {}", e),
    }
}
