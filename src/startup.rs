//! Client initialization: storage scopes, the request pipeline and the API handles.

use std::sync::Arc;

use tracing::info;

use crate::api::{AccessLogsApi, AuthApi, ConsentsApi, FacilitiesApi};
use crate::client::{AuthClient, RecordingNavigator};
use crate::config::ConfigV1;
use crate::error::ConfigError;
use crate::state::AppState;
use crate::store::{create_durable_store, CredentialStore, MemoryStore};

/// Builds the shared state from a loaded configuration.
///
/// # Errors
///
/// Returns an error when the durable storage location cannot be resolved.
pub fn build_state(config: ConfigV1) -> Result<AppState, ConfigError> {
    let durable = create_durable_store(&config.storage.durable)?;
    let session = Arc::new(MemoryStore::new("session"));
    let credentials = Arc::new(CredentialStore::new(durable, session));
    let navigator = Arc::new(RecordingNavigator::new());

    let client = Arc::new(AuthClient::new(
        config.api.clone(),
        credentials.clone(),
        navigator.clone(),
    ));
    info!(
        event_name = "startup.ready",
        event_domain = "startup",
        base_url = config.api.base_url.as_str(),
        "Client initialised"
    );

    Ok(AppState {
        config: Arc::new(config),
        credentials,
        navigator,
        auth: Arc::new(AuthApi::new(client.clone())),
        facilities: Arc::new(FacilitiesApi::new(client.clone())),
        consents: Arc::new(ConsentsApi::new(client.clone())),
        access_logs: Arc::new(AccessLogsApi::new(client.clone())),
        client,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DurableStoreConfig;

    #[test]
    fn test_build_state_with_memory_storage() {
        let mut config = ConfigV1::default();
        config.storage.durable = DurableStoreConfig::Memory;
        let state = build_state(config).unwrap();
        assert!(!state.session_expired());
        assert!(!state.client.is_refreshing());
        assert_eq!(state.client.config().refresh_path, "/auth/token-refresh");
    }

    #[tokio::test]
    async fn test_logout_is_not_reported_as_expired_session() {
        let mut config = ConfigV1::default();
        config.storage.durable = DurableStoreConfig::Memory;
        let state = build_state(config).unwrap();

        state.auth.logout().await;

        assert!(state.navigator.was_redirected());
        assert!(!state.session_expired());
    }
}
