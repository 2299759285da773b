//! Per-run template values.
//!
//! Shell tasks reference the run's logical date through `{{ ds }}`,
//! `{{ ds_nodash }}`, `{{ ts }}` and `{{ ts_nodash }}`. Unknown placeholders
//! are left in place.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub logical_date: DateTime<Utc>,
}

impl RunContext {
    pub fn new(logical_date: DateTime<Utc>) -> Self {
        Self { logical_date }
    }

    /// Run for midnight UTC of the given day.
    pub fn for_date(date: NaiveDate) -> Self {
        Self::new(date.and_time(chrono::NaiveTime::MIN).and_utc())
    }

    /// `2024-01-01`
    pub fn ds(&self) -> String {
        self.logical_date.format("%Y-%m-%d").to_string()
    }

    /// `20240101`
    pub fn ds_nodash(&self) -> String {
        self.logical_date.format("%Y%m%d").to_string()
    }

    /// `2024-01-01T00:00:00+00:00`
    pub fn ts(&self) -> String {
        self.logical_date.to_rfc3339_opts(SecondsFormat::Secs, false)
    }

    /// `20240101T000000`
    pub fn ts_nodash(&self) -> String {
        self.logical_date.format("%Y%m%dT%H%M%S").to_string()
    }

    pub fn render(&self, template: &str) -> String {
        template
            .replace("{{ ds }}", &self.ds())
            .replace("{{ ds_nodash }}", &self.ds_nodash())
            .replace("{{ ts }}", &self.ts())
            .replace("{{ ts_nodash }}", &self.ts_nodash())
    }
}
