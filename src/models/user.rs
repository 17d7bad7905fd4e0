use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::facility::Facility;

/// The three kinds of portal account.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Patient,
    HealthcareWorker,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Patient => "patient",
            Role::HealthcareWorker => "healthcare_worker",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "admin" => Ok(Role::Admin),
            "patient" => Ok(Role::Patient),
            "healthcare_worker" => Ok(Role::HealthcareWorker),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// The patient profile nested in a patient's user summary.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PatientProfile {
    pub patient_id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
}

/// The staff profile nested in a healthcare worker's user summary.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WorkerProfile {
    pub worker_id: i64,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub license_number: Option<String>,
    #[serde(default)]
    pub healthcare_facility: Option<Facility>,
}

/// The user record stored next to the tokens at login.
///
/// Read-only for the request pipeline; only login, registration and refresh write it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    #[serde(alias = "user_id")]
    pub id: i64,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub national_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient: Option<PatientProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthcare_worker: Option<WorkerProfile>,
}

impl UserSummary {
    /// Greeting name for banners: the patient's full name, else the email.
    pub fn display_name(&self) -> String {
        let full = self
            .patient
            .as_ref()
            .map(|p| {
                format!(
                    "{} {}",
                    p.first_name.as_deref().unwrap_or_default(),
                    p.last_name.as_deref().unwrap_or_default()
                )
                .trim()
                .to_string()
            })
            .unwrap_or_default();
        if full.is_empty() {
            self.email.clone()
        } else {
            full
        }
    }

    pub fn patient_id(&self) -> Option<i64> {
        self.patient.as_ref().map(|p| p.patient_id)
    }
}
