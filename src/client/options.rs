use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Url};
use serde::Serialize;

use crate::error::ClientError;

/// Per-call options for [`super::AuthClient::request`]. Everything is optional;
/// the default is a `GET` with a JSON content type.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Option<Method>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get() -> Self {
        Self::default().method(Method::GET)
    }

    pub fn post() -> Self {
        Self::default().method(Method::POST)
    }

    pub fn patch() -> Self {
        Self::default().method(Method::PATCH)
    }

    pub fn delete() -> Self {
        Self::default().method(Method::DELETE)
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self, ClientError> {
        Ok(self.body(serde_json::to_string(value)?))
    }
}

/// A fully resolved request that can be sent, and re-sent, any number of times.
#[derive(Debug, Clone)]
pub(crate) struct PreparedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

impl PreparedRequest {
    /// Merge headers: JSON content type first, caller headers over it, then the
    /// resolved bearer token over everything. Without a bearer token the caller's
    /// headers, including any `Authorization`, pass through untouched.
    pub fn build(
        base_url: &str,
        endpoint: &str,
        options: RequestOptions,
        bearer: Option<&str>,
    ) -> Result<Self, ClientError> {
        let url = join_url(base_url, endpoint)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ClientError::InvalidHeader(name.clone()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| ClientError::InvalidHeader(name.to_string()))?;
            headers.insert(name, value);
        }

        let mut prepared = PreparedRequest {
            method: options.method.unwrap_or(Method::GET),
            url,
            headers,
            body: options.body,
        };
        if let Some(token) = bearer {
            prepared.set_bearer(token)?;
        }
        Ok(prepared)
    }

    pub fn set_bearer(&mut self, token: &str) -> Result<(), ClientError> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ClientError::InvalidHeader(AUTHORIZATION.to_string()))?;
        value.set_sensitive(true);
        self.headers.insert(AUTHORIZATION, value);
        Ok(())
    }

    /// A copy of this request carrying `token` instead of the original bearer.
    pub fn with_bearer(&self, token: &str) -> Result<Self, ClientError> {
        let mut copy = self.clone();
        copy.set_bearer(token)?;
        Ok(copy)
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }
}

/// Resolve `endpoint` (path plus optional query) against the fixed base address.
pub(crate) fn join_url(base_url: &str, endpoint: &str) -> Result<Url, ClientError> {
    let base = base_url.trim_end_matches('/');
    let raw = if endpoint.starts_with('/') {
        format!("{}{}", base, endpoint)
    } else {
        format!("{}/{}", base, endpoint)
    };
    Url::parse(&raw).map_err(|_| ClientError::InvalidUrl(raw))
}
