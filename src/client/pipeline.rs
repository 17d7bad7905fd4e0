//! The authenticated request pipeline.
//!
//! Every call to the portal API goes through [`AuthClient::request`], which
//! attaches the stored bearer token and recovers from an expired access token
//! by refreshing it once and replaying the request. Concurrent 401s share a
//! single refresh call (see [`super::refresh`]). A refresh that fails ends the
//! session: both storage scopes are cleared and the navigator is sent to the
//! login entry point.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::navigator::Navigator;
use super::options::{join_url, PreparedRequest, RequestOptions};
use super::refresh::{RefreshCoordinator, Ticket};
use crate::config::ApiConfig;
use crate::error::{ClientError, RefreshError};
use crate::models::ActiveCredential;
use crate::store::CredentialStore;

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
}

/// HTTP client for the portal API with transparent token refresh.
pub struct AuthClient {
    http: reqwest::Client,
    config: ApiConfig,
    credentials: Arc<CredentialStore>,
    navigator: Arc<dyn Navigator>,
    refresh: RefreshCoordinator,
    expired: AtomicBool,
}

impl AuthClient {
    pub fn new(
        config: ApiConfig,
        credentials: Arc<CredentialStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self::with_http_client(reqwest::Client::new(), config, credentials, navigator)
    }

    pub fn with_http_client(
        http: reqwest::Client,
        config: ApiConfig,
        credentials: Arc<CredentialStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        info!("Creating API client for {}", config.base_url);
        AuthClient {
            http,
            config,
            credentials,
            navigator,
            refresh: RefreshCoordinator::new(),
            expired: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    /// True while a refresh call is outstanding.
    pub fn is_refreshing(&self) -> bool {
        self.refresh.is_refreshing()
    }

    /// Callers currently waiting on the outstanding refresh.
    pub fn pending_subscribers(&self) -> usize {
        self.refresh.pending_subscribers()
    }

    /// True once a failed refresh has ended the session. A voluntary
    /// [`AuthClient::sign_out`] does not set it.
    pub fn session_expired(&self) -> bool {
        self.expired.load(Ordering::SeqCst)
    }

    /// Send `endpoint` (relative to the configured base address) with the stored credential.
    ///
    /// Any status other than 401 is returned untouched. A 401 on an anonymous
    /// request is returned untouched too. A 401 on an authenticated request
    /// triggers (or joins) a refresh, after which the request is replayed
    /// exactly once with the new token and the replay's response is returned,
    /// whatever its status.
    ///
    /// # Errors
    ///
    /// [`ClientError::Transport`] when the server cannot be reached, and
    /// [`ClientError::Refresh`] when the session could not be refreshed. The
    /// latter has already cleared stored credentials and navigated to the
    /// login entry point.
    pub async fn request(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<Response, ClientError> {
        let request_id = Uuid::new_v4();
        let credential = self.credentials.active().await?;
        let bearer = credential.as_ref().map(|c| c.access_token.as_str());
        let prepared = PreparedRequest::build(&self.config.base_url, endpoint, options, bearer)?;

        debug!(
            event_name = "client.request.send",
            event_domain = "client",
            request_id = %request_id,
            method = %prepared.method,
            endpoint = prepared.path(),
            authenticated = credential.is_some(),
            "Sending request"
        );
        let response = self.send(&prepared).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let Some(credential) = credential else {
            debug!(
                event_name = "client.request.unauthorized",
                event_domain = "client",
                request_id = %request_id,
                endpoint = prepared.path(),
                "Anonymous request was rejected with 401"
            );
            return Ok(response);
        };

        match self.refresh.join() {
            Ticket::Follower(outcome) => {
                debug!(
                    event_name = "client.request.queued",
                    event_domain = "client",
                    request_id = %request_id,
                    endpoint = prepared.path(),
                    "Waiting on in-flight token refresh"
                );
                let token = outcome.await.unwrap_or(Err(RefreshError::Abandoned))?;
                self.replay(&prepared, &token, request_id).await
            }
            Ticket::Leader(cycle) => {
                if let Some(token) = self.rotated_token(&credential).await? {
                    debug!(
                        event_name = "client.refresh.skipped",
                        event_domain = "client",
                        request_id = %request_id,
                        scope = %credential.scope,
                        "Stored token changed since the request was sent; replaying"
                    );
                    cycle.succeed(&token);
                    return self.replay(&prepared, &token, request_id).await;
                }
                info!(
                    event_name = "client.refresh.start",
                    event_domain = "client",
                    request_id = %request_id,
                    scope = %credential.scope,
                    "Access token rejected; refreshing"
                );
                match self.refresh_access_token(&credential).await {
                    Ok(token) => {
                        info!(
                            event_name = "client.refresh.success",
                            event_domain = "client",
                            request_id = %request_id,
                            scope = %credential.scope,
                            pending = self.refresh.pending_subscribers(),
                            "Access token refreshed"
                        );
                        cycle.succeed(&token);
                        self.replay(&prepared, &token, request_id).await
                    }
                    Err(err) => {
                        error!(
                            event_name = "client.refresh.failure",
                            event_domain = "client",
                            request_id = %request_id,
                            pending = self.refresh.pending_subscribers(),
                            "Token refresh failed: {}",
                            err
                        );
                        self.expire_session().await;
                        cycle.fail(err.clone());
                        Err(ClientError::Refresh(err))
                    }
                }
            }
        }
    }

    /// Forget the stored session at the user's request and return to the
    /// login entry point.
    pub async fn sign_out(&self) {
        self.end_session().await;
    }

    async fn expire_session(&self) {
        self.expired.store(true, Ordering::SeqCst);
        self.end_session().await;
    }

    async fn end_session(&self) {
        if let Err(e) = self.credentials.clear_all().await {
            error!("Failed to clear stored credentials: {}", e);
        }
        self.navigator.navigate(&self.config.login_entry_point);
    }

    /// The access token now stored for the credential's scope, when it is no
    /// longer the one the rejected request carried. Another cycle refreshed it
    /// in the meantime, so the request only needs replaying.
    async fn rotated_token(
        &self,
        credential: &ActiveCredential,
    ) -> Result<Option<String>, ClientError> {
        let current = self.credentials.active().await?;
        Ok(current
            .filter(|c| c.scope == credential.scope && c.access_token != credential.access_token)
            .map(|c| c.access_token))
    }

    async fn send(&self, prepared: &PreparedRequest) -> Result<Response, ClientError> {
        let mut builder = self
            .http
            .request(prepared.method.clone(), prepared.url.clone())
            .headers(prepared.headers.clone());
        if let Some(body) = &prepared.body {
            builder = builder.body(body.clone());
        }
        Ok(builder.send().await?)
    }

    async fn replay(
        &self,
        prepared: &PreparedRequest,
        token: &str,
        request_id: Uuid,
    ) -> Result<Response, ClientError> {
        let replay = prepared.with_bearer(token)?;
        let response = self.send(&replay).await?;
        debug!(
            event_name = "client.request.replay",
            event_domain = "client",
            request_id = %request_id,
            endpoint = replay.path(),
            status = response.status().as_u16(),
            "Replayed request with refreshed token"
        );
        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(
                request_id = %request_id,
                endpoint = replay.path(),
                "Request was rejected again after a successful refresh"
            );
        }
        Ok(response)
    }

    /// Exchange the stored refresh token for a new access token and write it
    /// back into the scope the credential came from.
    async fn refresh_access_token(
        &self,
        credential: &ActiveCredential,
    ) -> Result<String, RefreshError> {
        let refresh_token = credential
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(RefreshError::MissingRefreshToken)?;

        let url = join_url(&self.config.base_url, &self.config.refresh_path)
            .map_err(|e| RefreshError::Transport(e.to_string()))?;
        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", refresh_token))
            .map_err(|_| RefreshError::MalformedBody("refresh token is not a valid header".into()))?;
        authorization.set_sensitive(true);

        let response = self
            .http
            .post(url)
            .header(AUTHORIZATION, authorization)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RefreshError::Status(response.status().as_u16()));
        }

        let body = response
            .json::<RefreshResponse>()
            .await
            .map_err(|e| RefreshError::MalformedBody(e.to_string()))?;
        if body.access_token.is_empty() {
            return Err(RefreshError::MalformedBody("empty access_token".into()));
        }

        self.credentials
            .update_access_token(credential.scope, &body.access_token)
            .await
            .map_err(|e| RefreshError::Storage(e.to_string()))?;
        Ok(body.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RecordingNavigator;
    use crate::models::credentials::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY};
    use crate::models::ScopeKind;
    use mockito::{Matcher, Server};

    fn api_config(url: String) -> ApiConfig {
        ApiConfig {
            base_url: url,
            ..ApiConfig::default()
        }
    }

    async fn client_with(
        server: &Server,
        scope: Option<(ScopeKind, &str, &str)>,
    ) -> (AuthClient, Arc<CredentialStore>, Arc<RecordingNavigator>) {
        let store = Arc::new(CredentialStore::in_memory());
        if let Some((kind, access, refresh)) = scope {
            let scope = store.scope(kind);
            scope.set(ACCESS_TOKEN_KEY, access).await.unwrap();
            scope.set(REFRESH_TOKEN_KEY, refresh).await.unwrap();
            scope
                .set(USER_KEY, r#"{"id": 7, "email": "p@example.org", "role": "patient"}"#)
                .await
                .unwrap();
        }
        let navigator = Arc::new(RecordingNavigator::new());
        let client = AuthClient::new(api_config(server.url()), store.clone(), navigator.clone());
        (client, store, navigator)
    }

    #[tokio::test]
    async fn test_attaches_stored_bearer_token() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/facilities")
            .match_header("authorization", "Bearer A1")
            .match_header("content-type", "application/json")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let (client, _, _) = client_with(&server, Some((ScopeKind::Durable, "A1", "R1"))).await;
        let response = client.request("/facilities", RequestOptions::new()).await.unwrap();

        m.assert_async().await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_anonymous_401_is_returned_without_refresh() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/api/admin/access-logs")
            .match_header("authorization", Matcher::Missing)
            .with_status(401)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/auth/token-refresh")
            .expect(0)
            .create_async()
            .await;

        let (client, _, navigator) = client_with(&server, None).await;
        let response = client
            .request("/api/admin/access-logs", RequestOptions::new())
            .await
            .unwrap();

        m.assert_async().await;
        refresh.assert_async().await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(!navigator.was_redirected());
    }

    #[tokio::test]
    async fn test_non_401_errors_are_returned_verbatim() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/consents/facility")
            .with_status(403)
            .with_body(r#"{"success": false, "message": "unauthorized"}"#)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/auth/token-refresh")
            .expect(0)
            .create_async()
            .await;

        let (client, _, _) = client_with(&server, Some((ScopeKind::Session, "A1", "R1"))).await;
        let response = client
            .request("/api/consents/facility", RequestOptions::new())
            .await
            .unwrap();

        refresh.assert_async().await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            response.text().await.unwrap(),
            r#"{"success": false, "message": "unauthorized"}"#
        );
    }

    #[tokio::test]
    async fn test_refresh_then_replay_in_session_scope() {
        let mut server = Server::new_async().await;
        let rejected = server
            .mock("PATCH", "/api/consents/4/revoke")
            .match_header("authorization", "Bearer A1")
            .with_status(401)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/auth/token-refresh")
            .match_header("authorization", "Bearer R1")
            .with_status(200)
            .with_body(r#"{"access_token": "A2"}"#)
            .expect(1)
            .create_async()
            .await;
        let replayed = server
            .mock("PATCH", "/api/consents/4/revoke")
            .match_header("authorization", "Bearer A2")
            .match_body(r#"{"reason":"moved"}"#)
            .with_status(200)
            .with_body(r#"{"success": true}"#)
            .create_async()
            .await;

        let (client, store, navigator) =
            client_with(&server, Some((ScopeKind::Session, "A1", "R1"))).await;
        let options = RequestOptions::patch().body(r#"{"reason":"moved"}"#);
        let response = client.request("/api/consents/4/revoke", options).await.unwrap();

        rejected.assert_async().await;
        refresh.assert_async().await;
        replayed.assert_async().await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!client.is_refreshing());
        assert!(!navigator.was_redirected());

        let session = store.scope(ScopeKind::Session);
        assert_eq!(session.get(ACCESS_TOKEN_KEY).await.unwrap().as_deref(), Some("A2"));
        assert_eq!(session.get(REFRESH_TOKEN_KEY).await.unwrap().as_deref(), Some("R1"));
        assert!(session.get(USER_KEY).await.unwrap().is_some());
        let durable = store.scope(ScopeKind::Durable);
        assert_eq!(durable.get(ACCESS_TOKEN_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_second_401_after_refresh_is_not_retried() {
        let mut server = Server::new_async().await;
        let protected = server
            .mock("GET", "/api/admin/access-logs")
            .with_status(401)
            .expect(2)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/auth/token-refresh")
            .with_status(200)
            .with_body(r#"{"access_token": "A2"}"#)
            .expect(1)
            .create_async()
            .await;

        let (client, _, navigator) =
            client_with(&server, Some((ScopeKind::Durable, "A1", "R1"))).await;
        let response = client
            .request("/api/admin/access-logs", RequestOptions::new())
            .await
            .unwrap();

        protected.assert_async().await;
        refresh.assert_async().await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(!client.is_refreshing());
        assert!(!navigator.was_redirected());
    }

    #[tokio::test]
    async fn test_malformed_refresh_body_ends_session() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/facilities")
            .with_status(401)
            .create_async()
            .await;
        server
            .mock("POST", "/auth/token-refresh")
            .with_status(200)
            .with_body(r#"{"token": "A2"}"#)
            .create_async()
            .await;

        let (client, store, navigator) =
            client_with(&server, Some((ScopeKind::Durable, "A1", "R1"))).await;
        let err = client
            .request("/facilities", RequestOptions::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Refresh(RefreshError::MalformedBody(_))));
        assert!(err.is_session_expired());
        assert!(client.session_expired());
        assert_eq!(store.active().await.unwrap(), None);
        assert_eq!(navigator.visited(), vec!["/".to_string()]);
        assert!(!client.is_refreshing());
    }

    #[tokio::test]
    async fn test_missing_refresh_token_ends_session_without_network_call() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/facilities")
            .with_status(401)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/auth/token-refresh")
            .expect(0)
            .create_async()
            .await;

        let (client, store, navigator) = client_with(&server, None).await;
        store
            .scope(ScopeKind::Session)
            .set(ACCESS_TOKEN_KEY, "A1")
            .await
            .unwrap();

        let err = client
            .request("/facilities", RequestOptions::new())
            .await
            .unwrap_err();

        refresh.assert_async().await;
        assert!(matches!(err, ClientError::Refresh(RefreshError::MissingRefreshToken)));
        assert!(navigator.was_redirected());
    }

    #[tokio::test]
    async fn test_transport_error_leaves_storage_alone() {
        let store = Arc::new(CredentialStore::in_memory());
        store
            .scope(ScopeKind::Durable)
            .set(ACCESS_TOKEN_KEY, "A1")
            .await
            .unwrap();
        let navigator = Arc::new(RecordingNavigator::new());
        // Grab a free port and release it so nothing is listening there.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .and_then(|l| l.local_addr())
            .expect("bind ephemeral port")
            .port();
        let client = AuthClient::new(
            api_config(format!("http://127.0.0.1:{}", port)),
            store.clone(),
            navigator.clone(),
        );

        let err = client
            .request("/facilities", RequestOptions::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Transport(_)));
        assert!(store.active().await.unwrap().is_some());
        assert!(!navigator.was_redirected());
    }

    #[tokio::test]
    async fn test_sign_out_clears_storage_without_expiring() {
        let server = Server::new_async().await;
        let (client, store, navigator) =
            client_with(&server, Some((ScopeKind::Durable, "A1", "R1"))).await;

        client.sign_out().await;

        assert_eq!(store.active().await.unwrap(), None);
        assert_eq!(navigator.visited(), vec!["/".to_string()]);
        assert!(!client.session_expired());
    }
}
