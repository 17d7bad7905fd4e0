use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};

use crate::models::AccessLog;
use crate::utils::value::csv_cell;

/// How many log rows are listed before the view is expanded.
pub const INITIAL_LIMIT: usize = 7;

const CSV_HEADER: &str = "ID,Timestamp,Patient,Worker Job,Facility,Action,Result";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeRange {
    Last24Hours,
    #[default]
    Last7Days,
    Last30Days,
    All,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::Last24Hours => "24h",
            TimeRange::Last7Days => "7days",
            TimeRange::Last30Days => "30days",
            TimeRange::All => "all",
        }
    }

    /// Oldest timestamp still inside the range, or `None` for [`TimeRange::All`].
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            TimeRange::Last24Hours => Some(now - Duration::hours(24)),
            TimeRange::Last7Days => Some(now - Duration::days(7)),
            TimeRange::Last30Days => Some(now - Duration::days(30)),
            TimeRange::All => None,
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "24h" => Ok(TimeRange::Last24Hours),
            "7days" => Ok(TimeRange::Last7Days),
            "30days" => Ok(TimeRange::Last30Days),
            "all" => Ok(TimeRange::All),
            other => Err(format!(
                "unknown time range '{}' (expected 24h, 7days, 30days or all)",
                other
            )),
        }
    }
}

/// Narrows the admin access-log listing by age and a free-text query.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub range: TimeRange,
    pub query: Option<String>,
}

impl LogFilter {
    pub fn new(range: TimeRange, query: Option<String>) -> Self {
        LogFilter { range, query }
    }

    /// Keep the entries inside the time range that match the query, in their original order.
    ///
    /// Entries whose timestamp cannot be read fall outside every bounded range.
    pub fn apply(&self, logs: &[AccessLog], now: DateTime<Utc>) -> Vec<AccessLog> {
        let cutoff = self.range.cutoff(now);
        let query = self
            .query
            .as_deref()
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase);

        logs.iter()
            .filter(|log| match cutoff {
                Some(cutoff) => log.timestamp_utc().is_some_and(|ts| ts >= cutoff),
                None => true,
            })
            .filter(|log| match query.as_deref() {
                Some(q) => matches_query(log, q),
                None => true,
            })
            .cloned()
            .collect()
    }

    /// The rows to list: all of them when expanded, otherwise the first [`INITIAL_LIMIT`].
    pub fn visible(logs: &[AccessLog], expanded: bool) -> &[AccessLog] {
        if expanded {
            logs
        } else {
            &logs[..logs.len().min(INITIAL_LIMIT)]
        }
    }
}

fn matches_query(log: &AccessLog, query: &str) -> bool {
    if log.patient_name().to_lowercase().contains(query) {
        return true;
    }
    if let Some(worker) = log.healthcare_worker.as_ref() {
        let info = format!(
            "{} {}",
            worker.job_title.as_deref().unwrap_or_default(),
            worker.license_number.as_deref().unwrap_or_default()
        );
        if info.to_lowercase().contains(query) {
            return true;
        }
    }
    log.facility_name()
        .is_some_and(|name| name.to_lowercase().contains(query))
}

/// Render access logs as CSV, one row per entry under a fixed header.
pub fn export_csv(logs: &[AccessLog]) -> String {
    let mut out = String::from(CSV_HEADER);
    for log in logs {
        let job = log
            .healthcare_worker
            .as_ref()
            .and_then(|w| w.job_title.as_deref())
            .unwrap_or_default();
        let row = [
            log.log_id.to_string(),
            csv_cell(&log.timestamp),
            csv_cell(&log.patient_name()),
            csv_cell(job),
            csv_cell(log.facility_name().unwrap_or_default()),
            log.action.as_str().to_string(),
            log.result.as_str().to_string(),
        ];
        out.push('\n');
        out.push_str(&row.join(","));
    }
    out
}
