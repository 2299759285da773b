//! The crawling jobs themselves.
//!
//! Each job builds a docker image from its source directory under
//! `dags_root`, runs it once per schedule slot, then prunes week-old images.

use std::time::Duration;

use crate::config::JobsConfig;
use crate::dag::{CheckKind, Dag, DefaultArgs, Task};

const EVERY_SIX_HOURS: Duration = Duration::from_secs(6 * 60 * 60);

const DANAWA_BUILD: &str = r#"echo "=== danawa crawling: docker build ==="
cd "$JOB_DIR"

echo "branch: $(git branch --show-current 2>/dev/null || echo 'no git info')"
echo "commit: $(git log -1 --oneline 2>/dev/null || echo 'no git info')"

"$DOCKER" build -t danawa-crawling:{{ ds_nodash }} -t danawa-crawling:latest .
"$DOCKER" images danawa-crawling:latest
"#;

const DANAWA_RUN: &str = r#"echo "=== danawa crawling: run ==="
CONTAINER_NAME="danawa_crawling_{{ ds_nodash }}_{{ ts_nodash }}"
echo "container: $CONTAINER_NAME, execution time: {{ ts }}"

"$DOCKER" run --rm \
    --name "$CONTAINER_NAME" \
    --env RUN_DATE="{{ ds }}" \
    --env EXECUTION_TIME="{{ ts }}" \
    danawa-crawling:{{ ds_nodash }}
"#;

const DANAWA_PRUNE: &str = r#"echo "=== pruning danawa-crawling images older than 7 days ==="
"$DOCKER" image prune -f --filter "label=danawa-crawling" --filter "until=168h" || true
"$DOCKER" images danawa-crawling
"#;

const TEST_BUILD: &str = r#"echo "=== test: docker build ==="
ls -la "$DAGS_ROOT"

TEST_PATH=""
if [ -d "$DAGS_ROOT/test_src" ]; then
    TEST_PATH="$DAGS_ROOT/test_src"
elif [ -d "$DAGS_ROOT/airflow/dags/test_src" ]; then
    TEST_PATH="$DAGS_ROOT/airflow/dags/test_src"
else
    echo "ERROR: test_src directory not found"
    find "$DAGS_ROOT" -name "test_src" -type d
    exit 1
fi

cd "$TEST_PATH"
"$DOCKER" build -t test:{{ ds_nodash }} -t test:latest .
"$DOCKER" images test:latest
"#;

const TEST_RUN: &str = r#"echo "=== test: run ==="
CONTAINER_NAME="test_{{ ds_nodash }}_{{ ts_nodash }}"
echo "container: $CONTAINER_NAME, execution time: {{ ts }}"

"$DOCKER" run --rm \
    --name "$CONTAINER_NAME" \
    --env RUN_DATE="{{ ds }}" \
    --env EXECUTION_TIME="{{ ts }}" \
    test:{{ ds_nodash }}
"#;

const TEST_PRUNE: &str = r#"echo "=== pruning test images older than 7 days ==="
"$DOCKER" image prune -f --filter "label=test" --filter "until=168h" || true
"$DOCKER" images test
"#;

/// Prefix a script body with shell variable assignments.
fn with_vars(vars: &[(&str, &str)], body: &str) -> String {
    let mut script = String::new();
    for (name, value) in vars {
        script.push_str(&format!("{}='{}'\n", name, value.replace('\'', r"'\''")));
    }
    script.push_str(body);
    script
}

pub fn danawa_crawling_dag(config: &JobsConfig) -> Dag {
    let job_dir = config.job_dir("danawa_crawling");
    let docker = config.docker_bin.as_str();

    Dag::new("danawa_crawling_dag", EVERY_SIX_HOURS)
        .description("Danawa product crawling")
        .tags(&["danawa", "crawling", "python"])
        .default_args(DefaultArgs::default())
        .task(Task::check("pre_crawling_check", CheckKind::PreCrawl))
        .task(Task::shell(
            "build_docker_image",
            with_vars(&[("DOCKER", docker), ("JOB_DIR", &job_dir)], DANAWA_BUILD),
        ))
        .task(Task::shell(
            "run_danawa_crawling",
            with_vars(&[("DOCKER", docker)], DANAWA_RUN),
        ))
        .task(Task::check("post_crawling_cleanup", CheckKind::PostCrawlCleanup))
        .task(Task::shell(
            "cleanup_old_images",
            with_vars(&[("DOCKER", docker)], DANAWA_PRUNE),
        ))
        .chain(&[
            "pre_crawling_check",
            "build_docker_image",
            "run_danawa_crawling",
            "post_crawling_cleanup",
            "cleanup_old_images",
        ])
}

pub fn test_dag(config: &JobsConfig) -> Dag {
    let dags_root = config.dags_root.display().to_string();
    let docker = config.docker_bin.as_str();

    Dag::new("test_dag", EVERY_SIX_HOURS)
        .description("test DAG")
        .tags(&["test", "python"])
        .task(Task::shell(
            "test_task",
            with_vars(&[("DOCKER", docker), ("DAGS_ROOT", &dags_root)], TEST_BUILD),
        ))
        .task(Task::shell("run_test", with_vars(&[("DOCKER", docker)], TEST_RUN)))
        .task(Task::shell(
            "cleanup_old_images",
            with_vars(&[("DOCKER", docker)], TEST_PRUNE),
        ))
        .chain(&["test_task", "run_test", "cleanup_old_images"])
}

pub fn all_dags(config: &JobsConfig) -> Vec<Dag> {
    vec![danawa_crawling_dag(config), test_dag(config)]
}

pub fn find_dag(config: &JobsConfig, dag_id: &str) -> Option<Dag> {
    all_dags(config).into_iter().find(|d| d.id == dag_id)
}
