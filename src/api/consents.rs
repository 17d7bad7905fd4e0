use std::sync::Arc;

use reqwest::Url;
use serde_json::Value;
use tracing::{debug, info};

use super::{read_envelope, read_json};
use crate::client::{AuthClient, RequestOptions};
use crate::error::{ApiError, ClientError};
use crate::models::consent::lookup_failure_message;
use crate::models::{ConsentRecord, NewConsent, PatientRecord};

/// Consent management for patients and consent checks for healthcare workers.
pub struct ConsentsApi {
    client: Arc<AuthClient>,
}

impl ConsentsApi {
    pub fn new(client: Arc<AuthClient>) -> Self {
        ConsentsApi { client }
    }

    /// Grant a facility access to the patient's data.
    pub async fn grant(&self, consent: &NewConsent) -> Result<Value, ApiError> {
        let options = RequestOptions::post().json(consent)?;
        let response = self.client.request("/api/consents", options).await?;
        let body = read_json(response).await?;
        info!(
            event_name = "consents.grant",
            event_domain = "consents",
            patient_id = consent.patient_id,
            facility = consent.facility_name.as_str(),
            "Granted consent"
        );
        Ok(body)
    }

    pub async fn revoke(&self, consent_id: i64) -> Result<(), ApiError> {
        let endpoint = format!("/api/consents/{}/revoke", consent_id);
        let response = self.client.request(&endpoint, RequestOptions::patch()).await?;
        read_json(response).await?;
        info!(consent_id, "Revoked consent");
        Ok(())
    }

    pub async fn for_patient(&self, patient_id: i64) -> Result<Vec<ConsentRecord>, ApiError> {
        let endpoint = format!("/api/consents/patient/{}", patient_id);
        let response = self.client.request(&endpoint, RequestOptions::get()).await?;
        read_envelope(response).await
    }

    /// Consents granted to the calling worker's facility.
    pub async fn for_facility(&self) -> Result<Vec<ConsentRecord>, ApiError> {
        let response = self
            .client
            .request("/api/consents/facility", RequestOptions::get())
            .await?;
        let body = read_json(response).await?;
        let data = body.get("data").cloned().unwrap_or(Value::Array(Vec::new()));
        serde_json::from_value(data).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Look a patient up by national ID. Succeeds only when the patient has an
    /// active consent for the caller's facility. Known failure codes are
    /// reported with a readable message.
    pub async fn check(&self, national_id: &str) -> Result<PatientRecord, ApiError> {
        let national_id = national_id.trim();
        let endpoint = query_endpoint("/api/consents/check", &[("national_id", national_id)])?;
        let response = self.client.request(&endpoint, RequestOptions::get()).await?;

        let status = response.status().as_u16();
        let body = match read_json(response).await {
            Ok(body) => body,
            Err(ApiError::Status { status, message }) => {
                return Err(ApiError::Status {
                    status,
                    message: describe_lookup_failure(&message),
                });
            }
            Err(e) => return Err(e),
        };

        let succeeded = body.get("success").and_then(Value::as_bool).unwrap_or(false);
        match body.get("data") {
            Some(data) if succeeded && !data.is_null() => {
                let record: PatientRecord = serde_json::from_value(data.clone())
                    .map_err(|e| ApiError::Decode(e.to_string()))?;
                debug!("Consent check succeeded");
                Ok(record.normalized())
            }
            _ => Err(ApiError::Status {
                status,
                message: "Could not retrieve patient data. Please verify the ID and try again."
                    .to_string(),
            }),
        }
    }
}

fn describe_lookup_failure(code: &str) -> String {
    lookup_failure_message(code)
        .unwrap_or("An unexpected error occurred while searching.")
        .to_string()
}

/// `path?key=value` with form-style percent encoding of the values.
fn query_endpoint(path: &str, params: &[(&str, &str)]) -> Result<String, ClientError> {
    let raw = format!("http://portal.invalid{}", path);
    let url = Url::parse_with_params(&raw, params).map_err(|_| ClientError::InvalidUrl(raw))?;
    Ok(match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    })
}
