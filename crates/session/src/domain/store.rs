//! Session Store Trait
//!
//! Interface to the external authentication collaborator. This is the
//! sole authorized path to it; implementations live in the
//! infrastructure layer. The store is constructed explicitly and
//! injected; there is no shared global client.

use tokio::sync::mpsc;

use crate::domain::entity::session::Session;
use crate::domain::value_object::credentials::{SignInCredentials, SignUpCredentials};
use crate::error::SessionResult;

/// Outcome of a sign-up submission
#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
    /// The account is active and a session was issued. The session is
    /// also announced to subscribers; the subscription, not this
    /// value, drives phase transitions.
    Active(Session),
    /// The account was created but the collaborator requires email
    /// confirmation before issuing a session. No session event is
    /// emitted.
    ConfirmationRequired,
}

/// Session transition notification: the new session, or `None` when
/// the session ended.
pub type SessionEvent = Option<Session>;

/// Session store trait
#[trait_variant::make(SessionStore: Send)]
pub trait LocalSessionStore {
    /// Query the collaborator for an existing session (e.g. restored
    /// from persisted credentials).
    ///
    /// Fails softly: transport and parse errors are logged inside the
    /// implementation and reported as no session, never returned.
    async fn current_session(&self) -> Option<Session>;

    /// Submit sign-in credentials.
    ///
    /// On success the new session is returned and also delivered to
    /// subscribers. On failure the error carries a normalized
    /// human-readable message.
    async fn sign_in(&self, credentials: &SignInCredentials) -> SessionResult<Session>;

    /// Submit sign-up credentials, attaching the profile as account
    /// metadata.
    ///
    /// Does not log the user in implicitly when the collaborator
    /// requires confirmation; see [`SignUpOutcome`].
    async fn sign_up(&self, credentials: &SignUpCredentials) -> SessionResult<SignUpOutcome>;

    /// Invalidate the current session. Idempotent: with no active
    /// session this is a no-op, not an error.
    async fn sign_out(&self) -> SessionResult<()>;

    /// Register for session transitions (login, logout, token
    /// refresh). Events are delivered in emission order and never
    /// dropped while the subscription is held.
    fn subscribe(&self) -> Subscription;
}

/// A live store subscription: an ordered event stream plus the guard
/// that releases the listener registration.
pub struct Subscription {
    events: mpsc::UnboundedReceiver<SessionEvent>,
    _guard: SubscriptionGuard,
}

impl Subscription {
    pub fn new(events: mpsc::UnboundedReceiver<SessionEvent>, guard: SubscriptionGuard) -> Self {
        Self {
            events,
            _guard: guard,
        }
    }

    /// Next session transition, or `None` once the store side closed.
    pub async fn next(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }
}

/// Releases a store listener registration exactly once.
///
/// Dropping the guard releases it; [`SubscriptionGuard::release`] does
/// so explicitly. Either way the disposer runs at most once.
pub struct SubscriptionGuard {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl SubscriptionGuard {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Guard that releases nothing (for test doubles without a
    /// registry).
    pub fn noop() -> Self {
        Self { release: None }
    }

    /// Release the registration now instead of at drop.
    pub fn release(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.run();
    }
}

impl std::fmt::Debug for SubscriptionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionGuard")
            .field("released", &self.release.is_none())
            .finish()
    }
}
