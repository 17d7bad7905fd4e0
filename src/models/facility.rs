use serde::{Deserialize, Serialize};

/// A healthcare facility as listed by `GET /facilities`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Facility {
    #[serde(alias = "facility_id", default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facility_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}
