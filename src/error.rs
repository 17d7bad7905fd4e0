//! Error types shared across the crate.
//!
//! Storage and pipeline errors are kept separate from the typed API errors so
//! callers that only use [`crate::client::AuthClient::request`] never have to
//! match on envelope-level failures.

use thiserror::Error;

/// Failure while reading or writing one of the credential storage scopes.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage contents could not be (de)serialized: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Why a refresh cycle did not produce a new access token.
///
/// Cloned to every caller that was queued behind the cycle.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RefreshError {
    #[error("no refresh token is stored for the active session")]
    MissingRefreshToken,
    #[error("token refresh was rejected with status {0}")]
    Status(u16),
    #[error("token refresh request failed: {0}")]
    Transport(String),
    #[error("token refresh response was malformed: {0}")]
    MalformedBody(String),
    #[error("refreshed token could not be stored: {0}")]
    Storage(String),
    #[error("token refresh was abandoned before it completed")]
    Abandoned,
}

/// Errors surfaced by the authenticated request pipeline.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("session could not be refreshed: {0}")]
    Refresh(#[from] RefreshError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("invalid header '{0}'")]
    InvalidHeader(String),
    #[error("invalid endpoint '{0}'")]
    InvalidUrl(String),
    #[error("request body could not be encoded: {0}")]
    Body(#[from] serde_json::Error),
}

impl ClientError {
    /// True when this error ended the session (storage cleared, login forced).
    ///
    /// An abandoned cycle touched neither storage nor navigation.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, ClientError::Refresh(e) if *e != RefreshError::Abandoned)
    }
}

/// Errors surfaced by the typed endpoint wrappers in [`crate::api`].
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("server responded with {status}: {message}")]
    Status { status: u16, message: String },
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("not logged in")]
    NotAuthenticated,
    #[error("logged-in user has no {0} profile")]
    MissingProfile(&'static str),
    #[error("admin accounts cannot be registered")]
    AdminSignupDisabled,
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::Client(ClientError::Storage(err))
    }
}

/// Errors raised while loading configuration or initializing logging.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("error loading configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("invalid logging.level '{0}'. Valid values: trace, debug, info, warn, error")]
    InvalidLogLevel(String),
    #[error("logging already initialized: {0}")]
    LoggingInit(String),
    #[error("could not determine a default storage directory")]
    NoStorageDir,
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Load(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_settled_refresh_failures_expire_the_session() {
        assert!(ClientError::Refresh(RefreshError::Status(403)).is_session_expired());
        assert!(ClientError::Refresh(RefreshError::MissingRefreshToken).is_session_expired());
        assert!(!ClientError::Refresh(RefreshError::Abandoned).is_session_expired());
        assert!(!ClientError::InvalidUrl("::".into()).is_session_expired());
    }
}
