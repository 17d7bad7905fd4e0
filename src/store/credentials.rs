use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{KeyValueStore, MemoryStore};
use crate::error::StorageError;
use crate::models::credentials::{
    ActiveCredential, CredentialBundle, ScopeKind, ACCESS_TOKEN_KEY, CREDENTIAL_KEYS,
    REFRESH_TOKEN_KEY, USER_KEY,
};
use crate::models::UserSummary;

/// Single view over the durable and session scopes.
///
/// Callers never pick a scope themselves: reads resolve the active one
/// (durable first, then session) and writes go back to where the bundle was found.
pub struct CredentialStore {
    durable: Arc<dyn KeyValueStore>,
    session: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(durable: Arc<dyn KeyValueStore>, session: Arc<dyn KeyValueStore>) -> Self {
        CredentialStore { durable, session }
    }

    /// Both scopes in memory; handy for tests and one-shot tools.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryStore::new("durable")),
            Arc::new(MemoryStore::new("session")),
        )
    }

    pub fn scope(&self, kind: ScopeKind) -> &Arc<dyn KeyValueStore> {
        match kind {
            ScopeKind::Durable => &self.durable,
            ScopeKind::Session => &self.session,
        }
    }

    /// The credential currently in force, if any.
    pub async fn active(&self) -> Result<Option<ActiveCredential>, StorageError> {
        for kind in [ScopeKind::Durable, ScopeKind::Session] {
            let scope = self.scope(kind);
            let Some(access_token) = scope.get(ACCESS_TOKEN_KEY).await? else {
                continue;
            };
            if access_token.is_empty() {
                continue;
            }
            let refresh_token = scope.get(REFRESH_TOKEN_KEY).await?;
            let user = parse_user(scope.get(USER_KEY).await?, kind);
            return Ok(Some(ActiveCredential {
                scope: kind,
                access_token,
                refresh_token,
                user,
            }));
        }
        Ok(None)
    }

    /// The user of the active credential. Malformed user JSON reads as `None`.
    pub async fn current_user(&self) -> Result<Option<UserSummary>, StorageError> {
        Ok(self.active().await?.and_then(|c| c.user))
    }

    /// Store a fresh bundle. Any bundle in either scope is removed first so that
    /// at most one scope ever holds credentials.
    pub async fn save(&self, bundle: &CredentialBundle, remember: bool) -> Result<ScopeKind, StorageError> {
        self.clear_all().await?;
        let kind = ScopeKind::for_remember(remember);
        let scope = self.scope(kind);
        scope.set(ACCESS_TOKEN_KEY, &bundle.access_token).await?;
        scope.set(REFRESH_TOKEN_KEY, &bundle.refresh_token).await?;
        scope
            .set(USER_KEY, &serde_json::to_string(&bundle.user)?)
            .await?;
        info!("Stored credentials for '{}' in the {} scope", bundle.user.email, kind);
        Ok(kind)
    }

    /// Overwrite only the access token in `kind`; refresh token and user stay as they are.
    pub async fn update_access_token(&self, kind: ScopeKind, token: &str) -> Result<(), StorageError> {
        self.scope(kind).set(ACCESS_TOKEN_KEY, token).await?;
        debug!("Rewrote access token in the {} scope", kind);
        Ok(())
    }

    /// Remove every credential key from both scopes. Attempts all removals
    /// and reports the first failure.
    pub async fn clear_all(&self) -> Result<(), StorageError> {
        let mut first_error = None;
        for kind in [ScopeKind::Durable, ScopeKind::Session] {
            let scope = self.scope(kind);
            for key in CREDENTIAL_KEYS {
                if let Err(e) = scope.remove(key).await {
                    warn!(
                        "Failed to remove '{}' from the {} scope: {}",
                        key,
                        scope.scope_name(),
                        e
                    );
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn parse_user(raw: Option<String>, kind: ScopeKind) -> Option<UserSummary> {
    let raw = raw?;
    match serde_json::from_str(&raw) {
        Ok(user) => Some(user),
        Err(e) => {
            warn!("Failed to parse stored user in the {} scope: {}", kind, e);
            None
        }
    }
}
