//! Crawl job CLI
//!
//! List the job graphs, trigger a single run, or keep them on their schedule.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use crawl_jobs::{all_dags, find_dag, run_dag, start_scheduler, JobsConfig, RunContext, ShellExecutor};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "crawl-jobs")]
#[command(about = "Scheduled crawling jobs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all registered DAGs and their tasks
    List,

    /// Run one DAG now
    Run {
        dag_id: String,
        /// Logical date (YYYY-MM-DD); defaults to now
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Run every DAG on its schedule until interrupted
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,crawl_jobs=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    let cli = Cli::parse();
    let config = JobsConfig::from_env();
    tracing::debug!(dags_root = %config.dags_root.display(), docker = %config.docker_bin, "Loaded config");

    match cli.command {
        Commands::List => {
            for dag in all_dags(&config) {
                println!(
                    "{} (every {}h, tags: {})",
                    dag.id,
                    dag.schedule.as_secs() / 3600,
                    dag.tags.join(", ")
                );
                for task in dag.topological_order()? {
                    println!("  - {}", task.id);
                }
            }
        }

        Commands::Run { dag_id, date } => {
            let dag = find_dag(&config, &dag_id)
                .with_context(|| format!("Unknown DAG: {}", dag_id))?;
            let ctx = match date {
                Some(date) => RunContext::for_date(date),
                None => RunContext::new(Utc::now()),
            };

            let report = run_dag(&dag, &ctx, &ShellExecutor::default()).await?;
            for task in &report.tasks {
                println!("{:<24} {:?} (attempts: {})", task.task_id, task.state, task.attempts);
            }
            if !report.is_success() {
                bail!("DAG run {} for {} failed", dag_id, ctx.ds());
            }
        }

        Commands::Serve => {
            let mut scheduler =
                start_scheduler(all_dags(&config), Arc::new(ShellExecutor::default())).await?;

            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C")?;

            tracing::info!("Shutting down scheduler");
            scheduler.shutdown().await?;
        }
    }

    Ok(())
}
