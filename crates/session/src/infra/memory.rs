//! In-Memory Session Store
//!
//! `SessionStore` implementation holding accounts in process memory.
//! Used by the portal when no backend is configured, and by tests that
//! need a collaborator with real sign-in/sign-up behavior. Error
//! messages match the hosted service's wording so rendering is
//! identical in both modes.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use uuid::Uuid;

use crate::domain::entity::session::Session;
use crate::domain::store::{SessionStore, SignUpOutcome, Subscription};
use crate::domain::value_object::{
    credentials::{SignInCredentials, SignUpCredentials},
    email::Email,
    profile::Profile,
};
use crate::error::{SessionError, SessionResult};
use crate::infra::SubscriberRegistry;

struct Account {
    user_id: Uuid,
    password: String,
    profile: Profile,
    confirmed: bool,
}

#[derive(Default)]
struct Inner {
    accounts: HashMap<String, Account>,
    active: Option<Session>,
}

/// In-process session store
pub struct MemorySessionStore {
    inner: Mutex<Inner>,
    subscribers: SubscriberRegistry,
    /// When set, sign-up creates the account unconfirmed and issues no
    /// session until [`MemorySessionStore::confirm`] is called.
    require_confirmation: bool,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            subscribers: SubscriberRegistry::new(),
            require_confirmation: false,
        }
    }

    pub fn with_confirmation_required() -> Self {
        Self {
            require_confirmation: true,
            ..Self::new()
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Seed a confirmed account (builder style, for wiring and tests)
    pub fn with_account(
        self,
        email: &str,
        password: impl Into<String>,
        profile: Profile,
    ) -> SessionResult<Self> {
        let email = Email::new(email)?;
        self.inner().accounts.insert(
            email.as_str().to_string(),
            Account {
                user_id: Uuid::new_v4(),
                password: password.into(),
                profile,
                confirmed: true,
            },
        );
        Ok(self)
    }

    /// Mark an account confirmed, as if the confirmation link was
    /// followed. The user still has to sign in.
    pub fn confirm(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        match self.inner().accounts.get_mut(&email) {
            Some(account) => {
                account.confirmed = true;
                true
            }
            None => false,
        }
    }
}

impl SessionStore for MemorySessionStore {
    async fn current_session(&self) -> Option<Session> {
        self.inner().active.clone()
    }

    async fn sign_in(&self, credentials: &SignInCredentials) -> SessionResult<Session> {
        let session = {
            let mut inner = self.inner();
            let account = inner
                .accounts
                .get(credentials.email.as_str())
                .filter(|account| account.password == credentials.password)
                .ok_or_else(|| {
                    SessionError::Rejected("Invalid login credentials".to_string())
                })?;

            if !account.confirmed {
                return Err(SessionError::Rejected("Email not confirmed".to_string()));
            }

            let session = Session::new(
                account.user_id,
                credentials.email.clone(),
                account.profile.clone(),
            );
            inner.active = Some(session.clone());
            session
        };

        tracing::debug!(user_id = %session.user_id, "In-memory sign-in");
        self.subscribers.emit(Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, credentials: &SignUpCredentials) -> SessionResult<SignUpOutcome> {
        let outcome = {
            let mut inner = self.inner();
            let key = credentials.email.as_str().to_string();
            if inner.accounts.contains_key(&key) {
                return Err(SessionError::Rejected("User already registered".to_string()));
            }

            let account = Account {
                user_id: Uuid::new_v4(),
                password: credentials.password.clone(),
                profile: credentials.profile.clone(),
                confirmed: !self.require_confirmation,
            };

            let outcome = if account.confirmed {
                let session = Session::new(
                    account.user_id,
                    credentials.email.clone(),
                    account.profile.clone(),
                );
                inner.active = Some(session.clone());
                SignUpOutcome::Active(session)
            } else {
                SignUpOutcome::ConfirmationRequired
            };

            inner.accounts.insert(key, account);
            outcome
        };

        if let SignUpOutcome::Active(session) = &outcome {
            self.subscribers.emit(Some(session.clone()));
        }
        Ok(outcome)
    }

    async fn sign_out(&self) -> SessionResult<()> {
        let had_session = self.inner().active.take().is_some();
        if had_session {
            self.subscribers.emit(None);
        }
        // Signing out with no active session is a no-op.
        Ok(())
    }

    fn subscribe(&self) -> Subscription {
        self.subscribers.subscribe()
    }
}
