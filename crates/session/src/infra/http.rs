//! Hosted Auth Service Store
//!
//! `SessionStore` implementation against the hosted service's auth
//! REST API (GoTrue-style): password grant, signup with profile
//! metadata, logout, refresh-token grant. Tokens are persisted through
//! [`TokenCache`] when the config names a path, so a session survives
//! process restarts the way the original hosted client kept it in
//! local storage.

use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::application::config::StoreConfig;
use crate::domain::entity::session::Session;
use crate::domain::store::{SessionStore, SignUpOutcome, Subscription};
use crate::domain::value_object::{
    credentials::{SignInCredentials, SignUpCredentials},
    email::Email,
    profile::Profile,
};
use crate::error::{SessionError, SessionResult, normalize_error_body};
use crate::infra::SubscriberRegistry;
use crate::infra::token_cache::{PersistedSession, TokenCache, mask_token};

/// Default access-token lifetime when the service reports none
const DEFAULT_TOKEN_TTL_MS: i64 = 3_600_000;

/// Store backed by the hosted auth service
pub struct HttpSessionStore {
    http: reqwest::Client,
    config: StoreConfig,
    cache: Option<TokenCache>,
    current: Mutex<Option<PersistedSession>>,
    subscribers: SubscriberRegistry,
}

impl HttpSessionStore {
    pub fn new(config: StoreConfig) -> SessionResult<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| SessionError::Internal(format!("Failed to build HTTP client: {e}")))?;
        let cache = config.cache_path.clone().map(TokenCache::new);

        Ok(Self {
            http,
            config,
            cache,
            current: Mutex::new(None),
            subscribers: SubscriberRegistry::new(),
        })
    }

    fn current(&self) -> MutexGuard<'_, Option<PersistedSession>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adopt freshly issued tokens: persist, publish, hand back the
    /// session.
    fn adopt(&self, tokens: TokenResponse) -> SessionResult<Session> {
        let persisted = persisted_from_response(tokens)?;
        let session = persisted.session.clone();

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.save(&persisted) {
                // Persistence failure degrades to an in-memory session.
                tracing::warn!(error = %e, "Failed to persist session tokens");
            }
        }
        tracing::debug!(
            user_id = %session.user_id,
            access_token = %mask_token(&persisted.access_token),
            "Adopted session tokens"
        );
        *self.current() = Some(persisted);
        self.subscribers.emit(Some(session.clone()));
        Ok(session)
    }

    /// Drop the local session copy and announce the end of session.
    fn invalidate_local(&self) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.clear() {
                tracing::warn!(error = %e, "Failed to clear session token cache");
            }
        }
        *self.current() = None;
        self.subscribers.emit(None);
    }

    async fn post_token(&self, grant_type: &str, body: Value) -> SessionResult<TokenResponse> {
        let url = self
            .config
            .auth_endpoint(&format!("token?grant_type={grant_type}"));
        let response = self
            .http
            .post(&url)
            .header("apikey", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SessionError::Internal(format!("Request to auth service failed: {e}")))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| SessionError::Internal(format!("Invalid auth service response: {e}")))?;

        if !status.is_success() {
            return Err(SessionError::Rejected(normalize_error_body(&body)));
        }
        serde_json::from_value(body)
            .map_err(|e| SessionError::Internal(format!("Invalid token payload: {e}")))
    }

    async fn refresh(&self, refresh_token: &str) -> SessionResult<TokenResponse> {
        self.post_token("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    /// Bearer token for same-backend data queries, if signed in
    pub fn access_token(&self) -> Option<String> {
        self.current()
            .as_ref()
            .map(|persisted| persisted.access_token.clone())
    }

    /// Locate persisted tokens: the in-memory copy first, then the
    /// cache file.
    fn persisted_tokens(&self) -> Option<PersistedSession> {
        if let Some(persisted) = self.current().clone() {
            return Some(persisted);
        }
        let cache = self.cache.as_ref()?;
        match cache.load() {
            Ok(persisted) => persisted,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable session token cache");
                None
            }
        }
    }
}

impl SessionStore for HttpSessionStore {
    async fn current_session(&self) -> Option<Session> {
        let persisted = self.persisted_tokens()?;

        if !persisted.is_expired() {
            let session = persisted.session.clone();
            *self.current() = Some(persisted);
            return Some(session);
        }

        // Persisted access token is stale; mint a fresh one before
        // reporting the session. Any failure here is absorbed as
        // "no session".
        match self.refresh(&persisted.refresh_token).await {
            Ok(tokens) => match self.adopt(tokens) {
                Ok(session) => Some(session),
                Err(e) => {
                    tracing::warn!(error = %e, "Discarding unusable refreshed session");
                    None
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Session restore failed; treating as signed out");
                if let Some(cache) = &self.cache {
                    if let Err(e) = cache.clear() {
                        tracing::debug!(error = %e, "Failed to drop stale token cache");
                    }
                }
                *self.current() = None;
                None
            }
        }
    }

    async fn sign_in(&self, credentials: &SignInCredentials) -> SessionResult<Session> {
        let tokens = self
            .post_token(
                "password",
                json!({
                    "email": credentials.email.as_str(),
                    "password": credentials.password,
                }),
            )
            .await?;
        self.adopt(tokens)
    }

    async fn sign_up(&self, credentials: &SignUpCredentials) -> SessionResult<SignUpOutcome> {
        let url = self.config.auth_endpoint("signup");
        let response = self
            .http
            .post(&url)
            .header("apikey", &self.config.api_key)
            .json(&json!({
                "email": credentials.email.as_str(),
                "password": credentials.password,
                "data": credentials.profile,
            }))
            .send()
            .await
            .map_err(|e| SessionError::Internal(format!("Request to auth service failed: {e}")))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| SessionError::Internal(format!("Invalid auth service response: {e}")))?;

        if !status.is_success() {
            return Err(SessionError::Rejected(normalize_error_body(&body)));
        }

        if body.get("access_token").is_some() {
            let tokens: TokenResponse = serde_json::from_value(body)
                .map_err(|e| SessionError::Internal(format!("Invalid token payload: {e}")))?;
            return Ok(SignUpOutcome::Active(self.adopt(tokens)?));
        }

        // Account created, no session issued: the service wants the
        // email confirmed first.
        tracing::info!("Account created; email confirmation required");
        Ok(SignUpOutcome::ConfirmationRequired)
    }

    async fn sign_out(&self) -> SessionResult<()> {
        let Some(persisted) = self.persisted_tokens() else {
            // No active session: a no-op, not an error.
            return Ok(());
        };

        let url = self.config.auth_endpoint("logout");
        let result = self
            .http
            .post(&url)
            .header("apikey", &self.config.api_key)
            .bearer_auth(&persisted.access_token)
            .send()
            .await;

        // The server-side session expires on its own; a failed revoke
        // call must not keep the user locally signed in.
        match result {
            Ok(response) if !response.status().is_success() => {
                tracing::warn!(status = %response.status(), "Sign-out revoke returned an error");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Sign-out revoke request failed");
            }
            Ok(_) => {}
        }

        self.invalidate_local();
        Ok(())
    }

    fn subscribe(&self) -> Subscription {
        self.subscribers.subscribe()
    }
}

/// Token grant response from the auth service
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    /// Lifetime in seconds
    #[serde(default)]
    expires_in: Option<i64>,
    /// Absolute expiry, Unix seconds
    #[serde(default)]
    expires_at: Option<i64>,
    user: WireUser,
}

/// User record as the auth service reports it
#[derive(Debug, Deserialize)]
struct WireUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Option<Profile>,
}

fn persisted_from_response(tokens: TokenResponse) -> SessionResult<PersistedSession> {
    let expires_at_ms = match (tokens.expires_at, tokens.expires_in) {
        (Some(at), _) => at * 1_000,
        (None, Some(ttl)) => Utc::now().timestamp_millis() + ttl * 1_000,
        (None, None) => Utc::now().timestamp_millis() + DEFAULT_TOKEN_TTL_MS,
    };

    let email = tokens
        .user
        .email
        .filter(|email| !email.is_empty())
        .ok_or_else(|| SessionError::Internal("Session payload missing email".to_string()))?;

    let session = Session::new(
        tokens.user.id,
        Email::from_remote(email),
        tokens.user.user_metadata.unwrap_or_default(),
    );

    Ok(PersistedSession {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_at_ms,
        session,
    })
}
