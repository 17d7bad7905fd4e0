use serde::{Deserialize, Serialize};

use super::user::UserSummary;

/// Storage key holding the short-lived bearer token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Storage key holding the token used only against the refresh endpoint.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
/// Storage key holding the JSON-serialized [`UserSummary`].
pub const USER_KEY: &str = "user";

/// Every key a credential bundle occupies within one scope.
pub const CREDENTIAL_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY];

/// The two storage scopes a bundle can live in, chosen at login by "remember me".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    /// Survives restarts.
    Durable,
    /// Lives as long as the current process.
    Session,
}

impl ScopeKind {
    pub fn for_remember(remember: bool) -> Self {
        if remember {
            ScopeKind::Durable
        } else {
            ScopeKind::Session
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Durable => "durable",
            ScopeKind::Session => "session",
        }
    }
}

impl std::fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The access/refresh/user triple written at login.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CredentialBundle {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserSummary,
}

/// What a read of the storage scopes found, tagged with the scope it came from.
///
/// Only `access_token` is required for a scope to count as holding a bundle;
/// the other fields are read from the same scope and never borrowed from the other one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveCredential {
    pub scope: ScopeKind,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub user: Option<UserSummary>,
}
