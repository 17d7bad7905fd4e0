//! Shared client state.
//!
//! Everything a command needs to talk to the portal: configuration, the
//! credential scopes, the authenticated pipeline and the typed endpoints
//! built on top of it.

use std::sync::Arc;

use crate::api::{AccessLogsApi, AuthApi, ConsentsApi, FacilitiesApi};
use crate::client::{AuthClient, RecordingNavigator};
use crate::config::ConfigV1;
use crate::store::CredentialStore;

/// State shared by every command of one process.
#[derive(Clone)]
pub struct AppState {
    /// Configuration loaded at startup.
    pub config: Arc<ConfigV1>,
    pub credentials: Arc<CredentialStore>,
    pub client: Arc<AuthClient>,
    /// Records every redirect to the login entry point.
    pub navigator: Arc<RecordingNavigator>,
    pub auth: Arc<AuthApi>,
    pub facilities: Arc<FacilitiesApi>,
    pub consents: Arc<ConsentsApi>,
    pub access_logs: Arc<AccessLogsApi>,
}

impl AppState {
    /// True once a failed refresh has ended the session. Logging out does not count.
    pub fn session_expired(&self) -> bool {
        self.client.session_expired()
    }
}
