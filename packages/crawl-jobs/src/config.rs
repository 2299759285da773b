use std::env;
use std::path::PathBuf;

use dotenvy::dotenv;

pub const DEFAULT_DAGS_ROOT: &str = "/opt/airflow/dags";
pub const DEFAULT_DOCKER_BIN: &str = "docker";

/// Where job sources live and which container CLI to call.
#[derive(Debug, Clone)]
pub struct JobsConfig {
    /// Directory holding one build context per job (`danawa_crawling/`, `test_src/`)
    pub dags_root: PathBuf,
    pub docker_bin: String,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            dags_root: PathBuf::from(DEFAULT_DAGS_ROOT),
            docker_bin: DEFAULT_DOCKER_BIN.to_string(),
        }
    }
}

impl JobsConfig {
    /// Load from `CRAWL_DAGS_ROOT` and `DOCKER_BIN`, reading `.env` first.
    pub fn from_env() -> Self {
        let _ = dotenv();

        let defaults = Self::default();
        Self {
            dags_root: non_empty_var("CRAWL_DAGS_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.dags_root),
            docker_bin: non_empty_var("DOCKER_BIN").unwrap_or(defaults.docker_bin),
        }
    }

    pub fn job_dir(&self, name: &str) -> String {
        self.dags_root.join(name).display().to_string()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_dir_joins_under_root() {
        let config = JobsConfig {
            dags_root: PathBuf::from("/srv/jobs"),
            docker_bin: "podman".to_string(),
        };
        assert_eq!(config.job_dir("danawa_crawling"), "/srv/jobs/danawa_crawling");
    }

    #[test]
    fn default_matches_airflow_layout() {
        let config = JobsConfig::default();
        assert_eq!(config.job_dir("test_src"), "/opt/airflow/dags/test_src");
        assert_eq!(config.docker_bin, "docker");
    }
}
