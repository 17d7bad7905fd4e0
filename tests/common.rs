#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use healthgate::client::{AuthClient, RecordingNavigator};
use healthgate::config::ApiConfig;
use healthgate::models::credentials::{
    ACCESS_TOKEN_KEY, CREDENTIAL_KEYS, REFRESH_TOKEN_KEY, USER_KEY,
};
use healthgate::models::ScopeKind;
use healthgate::store::{CredentialStore, FileStore, KeyValueStore, MemoryStore};

pub const PATIENT_USER: &str = r#"{"id": 7, "email": "amina@example.org", "role": "patient", "patient": {"patient_id": 7, "first_name": "Amina", "last_name": "Otieno"}}"#;

pub const WORKER_USER: &str = r#"{"id": 12, "email": "nurse@clinic.org", "role": "healthcare_worker", "healthcare_worker": {"worker_id": 3, "job_title": "Nurse", "healthcare_facility": {"id": 1, "name": "Kenyatta Hospital"}}}"#;

/// A client wired to in-process storage and a navigator that records redirects.
pub struct Harness {
    pub client: Arc<AuthClient>,
    pub credentials: Arc<CredentialStore>,
    pub navigator: Arc<RecordingNavigator>,
}

pub fn harness(base_url: &str) -> Harness {
    build(base_url, Arc::new(CredentialStore::in_memory()))
}

/// Same as [`harness`], with the durable scope persisted at `path`.
pub fn harness_with_file(base_url: &str, path: &Path) -> Harness {
    let credentials = CredentialStore::new(
        Arc::new(FileStore::new(path)),
        Arc::new(MemoryStore::new("session")),
    );
    build(base_url, Arc::new(credentials))
}

fn build(base_url: &str, credentials: Arc<CredentialStore>) -> Harness {
    let navigator = Arc::new(RecordingNavigator::new());
    let config = ApiConfig {
        base_url: base_url.to_string(),
        ..ApiConfig::default()
    };
    let client = Arc::new(AuthClient::new(config, credentials.clone(), navigator.clone()));
    Harness {
        client,
        credentials,
        navigator,
    }
}

/// Store a bundle directly in one scope, the way a previous login would have.
pub async fn seed(credentials: &CredentialStore, kind: ScopeKind, access: &str, refresh: &str, user: &str) {
    let scope = credentials.scope(kind);
    scope.set(ACCESS_TOKEN_KEY, access).await.expect("seed access token");
    scope.set(REFRESH_TOKEN_KEY, refresh).await.expect("seed refresh token");
    scope.set(USER_KEY, user).await.expect("seed user");
}

pub async fn stored(credentials: &CredentialStore, kind: ScopeKind, key: &str) -> Option<String> {
    credentials.scope(kind).get(key).await.expect("storage read")
}

/// Every (scope, key) pair that still holds a value.
pub async fn remaining_keys(credentials: &CredentialStore) -> Vec<(ScopeKind, &'static str)> {
    let mut remaining = Vec::new();
    for kind in [ScopeKind::Durable, ScopeKind::Session] {
        for key in CREDENTIAL_KEYS {
            if stored(credentials, kind, key).await.is_some() {
                remaining.push((kind, key));
            }
        }
    }
    remaining
}
