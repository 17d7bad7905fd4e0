use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use super::read_json;
use crate::client::{AuthClient, RequestOptions};
use crate::error::ApiError;
use crate::models::{CredentialBundle, Role, UserSummary};

/// Sign-up details. Admin accounts cannot be created through registration.
#[derive(Serialize, Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub national_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facility_name: Option<String>,
}

impl NewAccount {
    pub fn new(email: impl Into<String>, password: impl Into<String>, role: Role) -> Self {
        NewAccount {
            email: email.into(),
            password: password.into(),
            role,
            national_id: None,
            first_name: None,
            last_name: None,
            date_of_birth: None,
            license_number: None,
            job_title: None,
            facility_name: None,
        }
    }
}

/// Login, registration and logout.
pub struct AuthApi {
    client: Arc<AuthClient>,
}

impl AuthApi {
    pub fn new(client: Arc<AuthClient>) -> Self {
        AuthApi { client }
    }

    /// Log in and store the returned bundle in the durable scope when
    /// `remember` is set, otherwise in the session scope.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        remember: bool,
    ) -> Result<UserSummary, ApiError> {
        // A new login replaces whatever session was stored, and must go out anonymously.
        self.client.credentials().clear_all().await?;

        let options = RequestOptions::post().json(&json!({
            "email": email,
            "password": password,
        }))?;
        let response = self
            .client
            .request(&self.client.config().login_path, options)
            .await?;
        let bundle = bundle_from(read_json(response).await?)?
            .ok_or_else(|| ApiError::Decode("login response carried no tokens".to_string()))?;

        let scope = self.client.credentials().save(&bundle, remember).await?;
        info!(
            event_name = "auth.login.success",
            event_domain = "auth",
            role = %bundle.user.role,
            scope = %scope,
            "Logged in as '{}'",
            bundle.user.email
        );
        Ok(bundle.user)
    }

    /// Create a patient or healthcare-worker account. When the server logs
    /// the new user straight in, the bundle is kept in the session scope.
    pub async fn register(&self, account: &NewAccount) -> Result<Option<UserSummary>, ApiError> {
        if account.role == Role::Admin {
            return Err(ApiError::AdminSignupDisabled);
        }
        let options = RequestOptions::post().json(account)?;
        let response = self
            .client
            .request(&self.client.config().register_path, options)
            .await?;
        let Some(bundle) = bundle_from(read_json(response).await?)? else {
            info!("Registered '{}'; login required", account.email);
            return Ok(None);
        };
        self.client.credentials().save(&bundle, false).await?;
        info!("Registered and logged in as '{}'", bundle.user.email);
        Ok(Some(bundle.user))
    }

    /// Forget the session and return to the login entry point.
    pub async fn logout(&self) {
        self.client.sign_out().await;
    }

    pub async fn current_user(&self) -> Result<Option<UserSummary>, ApiError> {
        Ok(self.client.credentials().current_user().await?)
    }
}

/// A credential bundle from either a bare body or a `data` envelope.
/// `Ok(None)` when the body has no access token at all.
fn bundle_from(body: Value) -> Result<Option<CredentialBundle>, ApiError> {
    let payload = match body.get("data") {
        Some(data) if data.get("access_token").is_some() => data.clone(),
        _ => body,
    };
    if payload.get("access_token").is_none() {
        return Ok(None);
    }
    serde_json::from_value(payload)
        .map(Some)
        .map_err(|e| ApiError::Decode(e.to_string()))
}
