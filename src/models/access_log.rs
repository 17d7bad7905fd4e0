use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::facility::Facility;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessAction {
    #[serde(rename = "VIEW", alias = "view")]
    View,
    #[serde(rename = "EDIT", alias = "edit")]
    Edit,
    #[serde(rename = "SHARE", alias = "share")]
    Share,
    #[serde(other)]
    Other,
}

impl AccessAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessAction::View => "VIEW",
            AccessAction::Edit => "EDIT",
            AccessAction::Share => "SHARE",
            AccessAction::Other => "OTHER",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessResult {
    #[serde(rename = "ALLOWED", alias = "allowed")]
    Allowed,
    #[serde(rename = "DENIED", alias = "denied")]
    Denied,
}

impl AccessResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessResult::Allowed => "ALLOWED",
            AccessResult::Denied => "DENIED",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct LogPatient {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl LogPatient {
    pub fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        )
        .trim()
        .to_string()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LogWorkerUser {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct LogWorker {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub license_number: Option<String>,
    #[serde(default)]
    pub healthcare_facility: Option<Facility>,
    #[serde(default)]
    pub user: Option<LogWorkerUser>,
}

/// One entry of who accessed which patient's data, and whether it was allowed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AccessLog {
    pub log_id: i64,
    pub action: AccessAction,
    pub result: AccessResult,
    #[serde(default)]
    pub reason: Option<String>,
    pub timestamp: String,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub patient: Option<LogPatient>,
    #[serde(default)]
    pub healthcare_worker: Option<LogWorker>,
}

impl AccessLog {
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }

    pub fn patient_name(&self) -> String {
        self.patient
            .as_ref()
            .map(LogPatient::full_name)
            .unwrap_or_default()
    }

    pub fn facility_name(&self) -> Option<&str> {
        self.healthcare_worker
            .as_ref()
            .and_then(|w| w.healthcare_facility.as_ref())
            .map(|f| f.name.as_str())
    }

    /// Who accessed the record, as shown to the patient.
    pub fn accessor_label(&self) -> String {
        let Some(worker) = self.healthcare_worker.as_ref() else {
            return "Unknown Staff".to_string();
        };
        if let Some(first) = worker.first_name.as_deref().filter(|s| !s.is_empty()) {
            return format!("Dr. {} {}", first, worker.last_name.as_deref().unwrap_or(""))
                .trim_end()
                .to_string();
        }
        if let Some(title) = worker.job_title.as_deref().filter(|s| !s.is_empty()) {
            return title.to_string();
        }
        worker
            .user
            .as_ref()
            .and_then(|u| u.email.clone())
            .unwrap_or_else(|| "Unknown Staff".to_string())
    }
}

/// Parse the timestamp formats the portal backend emits (RFC 3339, RFC 2822,
/// and naive ISO-like strings which are taken as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
