//! Authenticated request gateway.
//!
//! Every call to the backend goes through [`Gateway::send`], which attaches
//! the current bearer token and recovers from a single 401 by refreshing the
//! credentials and retrying once. Refreshes are single-flight: however many
//! requests fail at the same time, one refresh request is sent and the rest
//! wait for it and reuse its result.

use std::sync::Arc;

use reqwest::{Client, Method, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::auth::{CredentialPair, SessionStore};

use super::ApiError;

/// Path of the token refresh endpoint, relative to the accounts API
const REFRESH_PATH: &str = "token/refresh/";

/// Path of the login endpoint, relative to the accounts API
const LOGIN_PATH: &str = "token/";

/// A request that can be replayed after a credential refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| ApiError::Encode(e.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access: String,
    // Only present when the backend rotates refresh tokens
    #[serde(default)]
    refresh: Option<String>,
}

/// Token a retry is sent with, and the session generation it belongs to.
struct RetryCredentials {
    access_token: String,
    generation: u64,
}

pub struct Gateway {
    http: Client,
    session: Arc<SessionStore>,
    /// Held for the duration of a refresh request.
    refresh_lock: Mutex<()>,
    accounts_url: String,
}

impl Gateway {
    pub fn new(http: Client, session: Arc<SessionStore>, accounts_url: impl Into<String>) -> Self {
        Self {
            http,
            session,
            refresh_lock: Mutex::new(()),
            accounts_url: accounts_url.into(),
        }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    fn accounts_endpoint(&self, path: &str) -> String {
        join_url(&self.accounts_url, path)
    }

    /// Send a request with the current credentials.
    ///
    /// Any status other than 401 is returned as-is for the caller to
    /// interpret. A 401 triggers one refresh-and-retry; a 401 on the retry
    /// ends the session and is reported as [`ApiError::AuthFailure`].
    pub async fn send(&self, request: &ApiRequest) -> Result<Response, ApiError> {
        // Don't start a request with credentials that are about to be replaced
        drop(self.refresh_lock.lock().await);

        let sent_with = self.session.snapshot().await;
        let response = self
            .dispatch(request, sent_with.access_token.as_deref())
            .await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!(url = %request.url, generation = sent_with.generation, "Unauthorized, recovering credentials");
        let retry_with = self.recover(sent_with.generation).await?;

        let retry = self.dispatch(request, Some(&retry_with.access_token)).await?;
        if retry.status() == StatusCode::UNAUTHORIZED {
            warn!(url = %request.url, "Still unauthorized after refresh, ending session");
            self.end_session(retry_with.generation).await;
            return Err(ApiError::AuthFailure);
        }
        Ok(retry)
    }

    /// Send a request without credentials (login, registration).
    pub async fn send_anonymous(&self, request: &ApiRequest) -> Result<Response, ApiError> {
        self.dispatch(request, None).await
    }

    /// Exchange a username and password for a new credential pair.
    pub async fn login(&self, username: &str, password: &str) -> Result<CredentialPair, ApiError> {
        let request = ApiRequest::post(self.accounts_endpoint(LOGIN_PATH))
            .json(&LoginRequest { username, password })?;
        let response = self.send_anonymous(&request).await?;
        let tokens: TokenResponse = parse_token_response(response).await?;

        let refresh = tokens
            .refresh
            .ok_or_else(|| ApiError::InvalidResponse("Login response has no refresh token".to_string()))?;
        let pair = CredentialPair::new(tokens.access, refresh);

        // Serialize with any refresh still holding the old credentials
        let _guard = self.refresh_lock.lock().await;
        self.session.set_credentials(pair.clone()).await;
        info!(username = %username, "Logged in");
        Ok(pair)
    }

    /// Clear the session. Returns false if no one was logged in.
    pub async fn logout(&self) -> bool {
        let _guard = self.refresh_lock.lock().await;
        self.session.clear().await
    }

    /// Refresh ahead of time if the access token expires within the buffer.
    /// Returns whether a refresh happened.
    pub async fn refresh_if_expiring(&self) -> Result<bool, ApiError> {
        let _guard = self.refresh_lock.lock().await;
        match self.session.credentials().await {
            Some(pair) if pair.needs_refresh() => {}
            _ => return Ok(false),
        }
        self.refresh_or_end_session().await?;
        Ok(true)
    }

    /// Obtain an access token to retry with after a 401.
    ///
    /// The first caller to take the lock refreshes. Callers that queued
    /// behind it find the generation moved on and reuse whatever it left:
    /// new credentials to retry with, or a cleared session.
    async fn recover(&self, seen_generation: u64) -> Result<RetryCredentials, ApiError> {
        let _guard = self.refresh_lock.lock().await;

        let current = self.session.snapshot().await;
        if current.generation != seen_generation {
            debug!(
                seen = seen_generation,
                current = current.generation,
                "Credentials changed while waiting, skipping refresh"
            );
            let access_token = current.access_token.ok_or(ApiError::AuthFailure)?;
            return Ok(RetryCredentials {
                access_token,
                generation: current.generation,
            });
        }

        self.refresh_or_end_session().await
    }

    /// Clear the session after a rejected retry, unless a login or refresh
    /// replaced the credentials the retry was sent with.
    async fn end_session(&self, retried_generation: u64) -> bool {
        let _guard = self.refresh_lock.lock().await;
        let current = self.session.generation().await;
        if current != retried_generation {
            debug!(retried = retried_generation, current, "Credentials replaced since retry, keeping session");
            return false;
        }
        self.session.clear().await
    }

    /// Must be called with `refresh_lock` held.
    async fn refresh_or_end_session(&self) -> Result<RetryCredentials, ApiError> {
        let Some(refresh_token) = self.session.refresh_token().await else {
            return Err(ApiError::NotAuthenticated);
        };

        match self.request_refresh(&refresh_token).await {
            Ok(pair) => {
                let access_token = pair.access_token.clone();
                let generation = self.session.set_credentials(pair).await;
                info!("Access token refreshed");
                Ok(RetryCredentials {
                    access_token,
                    generation,
                })
            }
            Err(e) => {
                warn!(error = %e, "Credential refresh failed, ending session");
                self.session.clear().await;
                Err(ApiError::AuthFailure)
            }
        }
    }

    async fn request_refresh(&self, refresh_token: &str) -> Result<CredentialPair, ApiError> {
        let request = ApiRequest::post(self.accounts_endpoint(REFRESH_PATH))
            .json(&RefreshRequest { refresh: refresh_token })?;
        let response = self.dispatch(&request, None).await?;
        let tokens = parse_token_response(response).await?;
        let refresh = tokens.refresh.unwrap_or_else(|| refresh_token.to_string());
        Ok(CredentialPair::new(tokens.access, refresh))
    }

    async fn dispatch(&self, request: &ApiRequest, token: Option<&str>) -> Result<Response, ApiError> {
        let mut builder = self.http.request(request.method.clone(), &request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }
        Ok(builder.send().await?)
    }
}

async fn parse_token_response(response: Response) -> Result<TokenResponse, ApiError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ApiError::from_status(status, &body));
    }
    serde_json::from_str(&body)
        .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse token response: {}", e)))
}

/// Join a base URL and a relative path with exactly one slash between them.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
