use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use super::facility::Facility;
use crate::utils::value::parse_json_field;

/// Wire format the consent endpoint expects for `expires_at`.
pub const EXPIRY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// What a facility may do with the patient's data.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsentType {
    #[serde(rename = "VIEW", alias = "view")]
    View,
    #[serde(rename = "EDIT", alias = "edit")]
    Edit,
    #[serde(rename = "SHARE", alias = "share")]
    Share,
}

impl ConsentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentType::View => "VIEW",
            ConsentType::Edit => "EDIT",
            ConsentType::Share => "SHARE",
        }
    }
}

impl std::str::FromStr for ConsentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "view" => Ok(ConsentType::View),
            "edit" => Ok(ConsentType::Edit),
            "share" => Ok(ConsentType::Share),
            other => Err(format!("unknown consent type '{}'", other)),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ConsentStatus {
    #[serde(alias = "ACTIVE")]
    Active,
    #[serde(alias = "EXPIRED")]
    Expired,
    #[serde(alias = "REVOKED")]
    Revoked,
}

/// A consent as returned by the patient and facility listings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConsentRecord {
    pub consent_id: i64,
    pub consent_type: ConsentType,
    #[serde(default)]
    pub status: Option<ConsentStatus>,
    #[serde(default)]
    pub granted_at: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub patient_id: Option<i64>,
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub facility: Option<Facility>,
}

impl ConsentRecord {
    pub fn is_active(&self) -> bool {
        self.status == Some(ConsentStatus::Active)
    }

    pub fn facility_name(&self) -> &str {
        self.facility
            .as_ref()
            .map(|f| f.name.as_str())
            .unwrap_or("Unknown Facility")
    }
}

/// Body of `POST /api/consents`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NewConsent {
    pub facility_name: String,
    pub consent_type: ConsentType,
    #[serde(serialize_with = "serialize_expiry")]
    pub expires_at: NaiveDateTime,
    pub purpose: String,
    pub patient_id: i64,
}

fn serialize_expiry<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.format(EXPIRY_FORMAT).to_string())
}

/// Accepts `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM[:SS]` and `YYYY-MM-DD HH:MM`.
pub fn parse_expiry(input: &str) -> Option<NaiveDateTime> {
    let input = input.trim();
    [
        EXPIRY_FORMAT,
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
}

/// The record a healthcare worker gets back from a consent check.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PatientRecord {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub national_id: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub address: Option<Value>,
    #[serde(default)]
    pub emergency_contact: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PatientRecord {
    /// Decode `address` and `emergency_contact` when the registry sent them as JSON strings.
    pub fn normalized(mut self) -> Self {
        self.address = self.address.map(parse_json_field);
        self.emergency_contact = self.emergency_contact.map(parse_json_field);
        self
    }
}

/// Friendly text for the failure codes a consent check can return.
pub fn lookup_failure_message(code: &str) -> Option<&'static str> {
    match code {
        "patient_not_found_in_registry" => {
            Some("We couldn't find a patient with that National ID in the registry.")
        }
        "no_valid_consent_found" => {
            Some("No active consent record was found for this patient at your facility.")
        }
        "consent_not_active" => {
            Some("The patient's consent for this facility is currently inactive or has expired.")
        }
        "not_found" => Some("The requested record could not be found."),
        "unauthorized" => Some("You are not authorized to perform this search."),
        "database_transaction_failed" => {
            Some("A temporary system error occurred. Please try again in a few moments.")
        }
        _ => None,
    }
}
