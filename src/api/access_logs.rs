use std::sync::Arc;

use super::{bare_or_enveloped, read_envelope, read_json};
use crate::client::{AuthClient, RequestOptions};
use crate::error::ApiError;
use crate::models::AccessLog;

/// Audit trail of who accessed patient data.
pub struct AccessLogsApi {
    client: Arc<AuthClient>,
}

impl AccessLogsApi {
    pub fn new(client: Arc<AuthClient>) -> Self {
        AccessLogsApi { client }
    }

    /// Logs for one patient user, newest first. Patients may only read their own.
    pub async fn for_user(&self, user_id: i64) -> Result<Vec<AccessLog>, ApiError> {
        let endpoint = format!("/api/access-logs/user/{}", user_id);
        let response = self.client.request(&endpoint, RequestOptions::get()).await?;
        read_envelope(response).await
    }

    /// System-wide logs for administrators.
    pub async fn admin(&self) -> Result<Vec<AccessLog>, ApiError> {
        let response = self
            .client
            .request("/api/admin/access-logs", RequestOptions::get())
            .await?;
        let status = response.status().as_u16();
        bare_or_enveloped(read_json(response).await?, status)
    }
}
