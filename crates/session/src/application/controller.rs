//! Session Lifecycle Controller
//!
//! Reconciles the asynchronous external authentication source with
//! locally observable state. The controller owns the phase machine
//! (`Initializing -> {Authenticated, Unauthenticated}`, then
//! `Authenticated <-> Unauthenticated`) and mediates submissions
//! against it.
//!
//! ## Rules the implementation enforces
//! - The store subscription is authoritative: submission return values
//!   never set the phase, the next session event does.
//! - Startup races the restore query against the first session event;
//!   whichever answers first sets the initial phase, and the loser's
//!   answer is discarded. Later events always apply.
//! - Events apply in strict arrival order through a single consumer
//!   task; nothing is coalesced or reordered.
//! - At most one sign-in/sign-up submission is outstanding; a second
//!   attempt is rejected synchronously with zero store calls.
//! - Teardown releases the store subscription exactly once, on every
//!   exit path.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::entity::session::Session;
use crate::domain::store::{SessionEvent, SessionStore, SignUpOutcome, Subscription};
use crate::domain::value_object::credentials::{SignInCredentials, SignUpCredentials};
use crate::error::{SessionError, SessionResult};

/// Lifecycle phase. Exactly one variant holds at any observable
/// instant.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    /// Neither the restore query nor the subscription has answered yet
    Initializing,
    /// The collaborator reported an active session
    Authenticated(Session),
    /// No active session; `last_error` is the message from the most
    /// recent failed submission, if any
    Unauthenticated { last_error: Option<String> },
}

impl Phase {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Phase::Authenticated(_))
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            Phase::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn last_error(&self) -> Option<&str> {
        match self {
            Phase::Unauthenticated { last_error } => last_error.as_deref(),
            _ => None,
        }
    }
}

/// Observable controller state
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerState {
    pub phase: Phase,
    /// True only while one sign-in/sign-up call is outstanding
    pub submitting: bool,
}

impl ControllerState {
    fn initializing() -> Self {
        Self {
            phase: Phase::Initializing,
            submitting: false,
        }
    }
}

/// Session lifecycle controller
pub struct SessionController<S>
where
    S: SessionStore + Send + Sync + 'static,
{
    store: Arc<S>,
    state: watch::Sender<ControllerState>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<S> SessionController<S>
where
    S: SessionStore + Send + Sync + 'static,
{
    /// Start the controller: enter `Initializing` and concurrently
    /// (a) consume the store subscription and (b) run the restore
    /// query. Returns immediately; observers see the initial phase
    /// once either source answers.
    pub fn start(store: Arc<S>) -> Self {
        let (state, _) = watch::channel(ControllerState::initializing());

        // Subscribe before the restore query so no transition emitted
        // during startup can be missed.
        let subscription = store.subscribe();
        let initial_resolved = Arc::new(AtomicBool::new(false));

        let events_task = tokio::spawn(run_events(
            subscription,
            state.clone(),
            Arc::clone(&initial_resolved),
        ));
        let restore_task = tokio::spawn(run_restore(
            Arc::clone(&store),
            state.clone(),
            initial_resolved,
        ));

        Self {
            store,
            state,
            tasks: Mutex::new(vec![events_task, restore_task]),
        }
    }

    /// Snapshot of the current state
    pub fn state(&self) -> ControllerState {
        self.state.borrow().clone()
    }

    /// Register an observer. Receivers see every state replacement
    /// published after registration (latest-value channel).
    pub fn observe(&self) -> watch::Receiver<ControllerState> {
        self.state.subscribe()
    }

    /// Submit sign-in credentials.
    ///
    /// Rejected synchronously with [`SessionError::SubmissionInProgress`]
    /// while another submission is outstanding (no store call is made).
    /// Success leaves the phase transition to the session event; the
    /// store's answer is not applied optimistically. Failure records
    /// the normalized message as `last_error`. `submitting` is cleared
    /// on every exit path.
    pub async fn submit_sign_in(&self, credentials: &SignInCredentials) -> SessionResult<()> {
        self.begin_submission()?;
        let _clear = SubmitClear { state: &self.state };

        match self.store.sign_in(credentials).await {
            Ok(session) => {
                tracing::info!(
                    user_id = %session.user_id,
                    "Sign-in accepted; awaiting session event"
                );
                Ok(())
            }
            Err(err) => {
                self.record_failure(&err);
                Err(err)
            }
        }
    }

    /// Submit sign-up credentials.
    ///
    /// Same guards as sign-in. A confirmation-required outcome leaves
    /// the phase `Unauthenticated` with no error: the user is not
    /// signed in until the collaborator emits a session event.
    pub async fn submit_sign_up(
        &self,
        credentials: &SignUpCredentials,
    ) -> SessionResult<SignUpOutcome> {
        self.begin_submission()?;
        let _clear = SubmitClear { state: &self.state };

        match self.store.sign_up(credentials).await {
            Ok(SignUpOutcome::Active(session)) => {
                tracing::info!(
                    user_id = %session.user_id,
                    "Sign-up accepted; awaiting session event"
                );
                Ok(SignUpOutcome::Active(session))
            }
            Ok(SignUpOutcome::ConfirmationRequired) => {
                tracing::info!("Sign-up accepted; email confirmation required");
                Ok(SignUpOutcome::ConfirmationRequired)
            }
            Err(err) => {
                self.record_failure(&err);
                Err(err)
            }
        }
    }

    /// Sign out of the active session.
    ///
    /// Callable only when `Authenticated`. The phase transition is
    /// driven by the subsequent session event, not set here; if the
    /// collaborator never emits one the controller stays
    /// `Authenticated`, which tests detect by timing out on the
    /// observer channel.
    pub async fn sign_out(&self) -> SessionResult<()> {
        if !self.state.borrow().phase.is_authenticated() {
            return Err(SessionError::NotAuthenticated);
        }

        self.store.sign_out().await.map_err(|err| {
            err.log();
            err
        })?;

        tracing::debug!("Sign-out acknowledged; awaiting session event");
        Ok(())
    }

    /// Stop the startup and event tasks and release the store
    /// subscription. Events delivered after this mutate nothing.
    pub async fn shutdown(&self) {
        let tasks: Vec<JoinHandle<()>> = match self.tasks.lock() {
            Ok(mut guard) => guard.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        };
        for task in &tasks {
            task.abort();
        }
        for task in tasks {
            // Cancellation is the expected way these tasks end.
            let _ = task.await;
        }
        tracing::debug!("Session controller shut down");
    }

    /// Reject-or-claim the submission slot and clear any displayed
    /// error, both in one state replacement.
    fn begin_submission(&self) -> SessionResult<()> {
        let mut rejected = false;
        self.state.send_if_modified(|state| {
            if state.submitting {
                rejected = true;
                return false;
            }
            state.submitting = true;
            if let Phase::Unauthenticated { last_error } = &mut state.phase {
                *last_error = None;
            }
            true
        });

        if rejected {
            return Err(SessionError::SubmissionInProgress);
        }
        Ok(())
    }

    fn record_failure(&self, err: &SessionError) {
        err.log();
        let message = err.display_message();
        self.state.send_if_modified(|state| {
            state.phase = Phase::Unauthenticated {
                last_error: Some(message),
            };
            true
        });
    }
}

impl<S> Drop for SessionController<S>
where
    S: SessionStore + Send + Sync + 'static,
{
    fn drop(&mut self) {
        // Aborting the event task drops the Subscription it owns,
        // which releases the store registration.
        let guard = match self.tasks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        for task in guard.iter() {
            task.abort();
        }
    }
}

/// Clears `submitting` when dropped, so the slot is released even if
/// the store call panics.
struct SubmitClear<'a> {
    state: &'a watch::Sender<ControllerState>,
}

impl Drop for SubmitClear<'_> {
    fn drop(&mut self) {
        self.state.send_if_modified(|state| {
            if state.submitting {
                state.submitting = false;
                true
            } else {
                false
            }
        });
    }
}

/// Single consumer of the store subscription: applies every event in
/// arrival order. A stale "authenticated" notification arriving after
/// a "signed out" one must not resurrect the session, so there is no
/// batching and no reordering here.
async fn run_events(
    mut subscription: Subscription,
    state: watch::Sender<ControllerState>,
    initial_resolved: Arc<AtomicBool>,
) {
    while let Some(event) = subscription.next().await {
        initial_resolved.store(true, Ordering::SeqCst);
        apply_event(&state, event);
    }
    // Store side closed; the subscription guard releases on drop.
    tracing::debug!("Session event stream ended");
}

fn apply_event(state: &watch::Sender<ControllerState>, event: SessionEvent) {
    state.send_if_modified(|current| {
        match event {
            Some(session) => {
                tracing::info!(user_id = %session.user_id, "Session active");
                current.phase = Phase::Authenticated(session);
            }
            None => {
                tracing::info!("Session ended");
                // A signed-out notification while already
                // unauthenticated keeps the displayed error.
                let last_error = match &current.phase {
                    Phase::Unauthenticated { last_error } => last_error.clone(),
                    _ => None,
                };
                current.phase = Phase::Unauthenticated { last_error };
            }
        }
        true
    });
}

/// Restore query half of the dual-path start. Its answer applies only
/// if no session event has settled the initial phase first.
async fn run_restore<S>(
    store: Arc<S>,
    state: watch::Sender<ControllerState>,
    initial_resolved: Arc<AtomicBool>,
) where
    S: SessionStore + Send + Sync + 'static,
{
    let restored = store.current_session().await;

    if initial_resolved.swap(true, Ordering::SeqCst) {
        tracing::debug!("Initial session query superseded by a session event");
        return;
    }

    state.send_if_modified(|current| {
        // An event may still have applied between the flag swap and
        // here; the first real answer stands.
        if !matches!(current.phase, Phase::Initializing) {
            return false;
        }
        current.phase = match restored {
            Some(session) => {
                tracing::info!(user_id = %session.user_id, "Restored existing session");
                Phase::Authenticated(session)
            }
            None => {
                tracing::debug!("No existing session");
                Phase::Unauthenticated { last_error: None }
            }
        };
        true
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::store::SubscriptionGuard;
    use crate::domain::value_object::email::Email;
    use crate::domain::value_object::profile::Profile;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::{Notify, mpsc};
    use uuid::Uuid;

    fn session(email: &str) -> Session {
        Session::new(Uuid::new_v4(), Email::new(email).unwrap(), Profile::new())
    }

    fn sign_in_creds() -> SignInCredentials {
        SignInCredentials::new("a@b.com", "x").unwrap()
    }

    fn sign_up_creds() -> SignUpCredentials {
        SignUpCredentials::new("a@b.com", "secret1", Profile::new()).unwrap()
    }

    /// Scripted store double with manual event injection.
    struct MockStore {
        restore: Mutex<Option<Session>>,
        restore_gate: Option<Arc<Notify>>,
        sign_in_results: Mutex<VecDeque<SessionResult<Session>>>,
        sign_up_results: Mutex<VecDeque<SessionResult<SignUpOutcome>>>,
        sign_in_gate: Mutex<Option<Arc<Notify>>>,
        sign_in_panics_once: AtomicBool,
        sign_in_calls: AtomicUsize,
        sign_out_calls: AtomicUsize,
        subscribers: Mutex<Vec<mpsc::UnboundedSender<SessionEvent>>>,
        released: Arc<AtomicBool>,
    }

    impl MockStore {
        fn new() -> Self {
            Self {
                restore: Mutex::new(None),
                restore_gate: None,
                sign_in_results: Mutex::new(VecDeque::new()),
                sign_up_results: Mutex::new(VecDeque::new()),
                sign_in_gate: Mutex::new(None),
                sign_in_panics_once: AtomicBool::new(false),
                sign_in_calls: AtomicUsize::new(0),
                sign_out_calls: AtomicUsize::new(0),
                subscribers: Mutex::new(Vec::new()),
                released: Arc::new(AtomicBool::new(false)),
            }
        }

        fn with_restored(session: Session) -> Self {
            let store = Self::new();
            *store.restore.lock().unwrap() = Some(session);
            store
        }

        /// Hold the restore query until the returned gate is notified.
        fn gate_restore(mut self) -> (Self, Arc<Notify>) {
            let gate = Arc::new(Notify::new());
            self.restore_gate = Some(Arc::clone(&gate));
            (self, gate)
        }

        fn queue_sign_in(&self, result: SessionResult<Session>) {
            self.sign_in_results.lock().unwrap().push_back(result);
        }

        fn queue_sign_up(&self, result: SessionResult<SignUpOutcome>) {
            self.sign_up_results.lock().unwrap().push_back(result);
        }

        /// Make the next sign-in call panic instead of returning.
        fn panic_next_sign_in(&self) {
            self.sign_in_panics_once.store(true, Ordering::SeqCst);
        }

        /// Hold sign-in calls until the returned gate is notified.
        fn gate_sign_in(&self) -> Arc<Notify> {
            let gate = Arc::new(Notify::new());
            *self.sign_in_gate.lock().unwrap() = Some(Arc::clone(&gate));
            gate
        }

        fn emit(&self, event: SessionEvent) {
            self.subscribers
                .lock()
                .unwrap()
                .retain(|tx| tx.send(event.clone()).is_ok());
        }

        fn sign_in_calls(&self) -> usize {
            self.sign_in_calls.load(Ordering::SeqCst)
        }

        fn released(&self) -> bool {
            self.released.load(Ordering::SeqCst)
        }
    }

    impl SessionStore for MockStore {
        async fn current_session(&self) -> Option<Session> {
            if let Some(gate) = &self.restore_gate {
                gate.notified().await;
            }
            self.restore.lock().unwrap().clone()
        }

        async fn sign_in(&self, _credentials: &SignInCredentials) -> SessionResult<Session> {
            self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
            if self.sign_in_panics_once.swap(false, Ordering::SeqCst) {
                panic!("scripted sign-in panic");
            }
            let gate = self.sign_in_gate.lock().unwrap().clone();
            if let Some(gate) = gate {
                gate.notified().await;
            }
            self.sign_in_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(SessionError::Internal("unscripted sign-in".to_string())))
        }

        async fn sign_up(&self, _credentials: &SignUpCredentials) -> SessionResult<SignUpOutcome> {
            self.sign_up_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(SessionError::Internal("unscripted sign-up".to_string())))
        }

        async fn sign_out(&self) -> SessionResult<()> {
            self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn subscribe(&self) -> Subscription {
            let (tx, rx) = mpsc::unbounded_channel();
            self.subscribers.lock().unwrap().push(tx);
            let released = Arc::clone(&self.released);
            Subscription::new(
                rx,
                SubscriptionGuard::new(move || {
                    released.store(true, Ordering::SeqCst);
                }),
            )
        }
    }

    async fn wait_for(
        rx: &mut watch::Receiver<ControllerState>,
        predicate: impl Fn(&ControllerState) -> bool,
    ) -> ControllerState {
        tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                {
                    let state = rx.borrow_and_update();
                    if predicate(&state) {
                        return (*state).clone();
                    }
                }
                rx.changed().await.expect("controller state channel closed");
            }
        })
        .await
        .expect("timed out waiting for controller state")
    }

    #[tokio::test]
    async fn test_restore_null_settles_unauthenticated() {
        // Restore answers "no session" before any event arrives.
        let store = Arc::new(MockStore::new());
        let controller = SessionController::start(Arc::clone(&store));
        let mut rx = controller.observe();

        let state = wait_for(&mut rx, |s| s.phase != Phase::Initializing).await;
        assert_eq!(
            state.phase,
            Phase::Unauthenticated { last_error: None }
        );
        assert!(!state.submitting);
    }

    #[tokio::test]
    async fn test_restore_with_session_settles_authenticated() {
        let restored = session("restored@example.com");
        let store = Arc::new(MockStore::with_restored(restored.clone()));
        let controller = SessionController::start(Arc::clone(&store));
        let mut rx = controller.observe();

        let state = wait_for(&mut rx, |s| s.phase.is_authenticated()).await;
        assert_eq!(state.phase.session(), Some(&restored));
    }

    #[tokio::test]
    async fn test_first_resolution_wins_event_over_restore() {
        // The event settles the phase; the late restore answer (null)
        // must not downgrade it back to Unauthenticated.
        let (store, restore_gate) = MockStore::new().gate_restore();
        let store = Arc::new(store);
        let controller = SessionController::start(Arc::clone(&store));
        let mut rx = controller.observe();

        let active = session("event@example.com");
        store.emit(Some(active.clone()));
        wait_for(&mut rx, |s| s.phase.is_authenticated()).await;

        restore_gate.notify_one();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(controller.state().phase.session(), Some(&active));
    }

    #[tokio::test]
    async fn test_no_double_submit() {
        // The second attempt performs zero store calls and leaves
        // state unchanged apart from the deterministic error.
        let store = Arc::new(MockStore::new());
        let gate = store.gate_sign_in();
        store.queue_sign_in(Ok(session("a@b.com")));
        let controller = Arc::new(SessionController::start(Arc::clone(&store)));
        let mut rx = controller.observe();
        wait_for(&mut rx, |s| s.phase != Phase::Initializing).await;

        let first = Arc::clone(&controller);
        let handle = tokio::spawn(async move { first.submit_sign_in(&sign_in_creds()).await });
        wait_for(&mut rx, |s| s.submitting).await;

        let err = controller
            .submit_sign_in(&sign_in_creds())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::SubmissionInProgress));
        assert_eq!(store.sign_in_calls(), 1);
        assert!(controller.state().submitting);
        assert_eq!(controller.state().phase.last_error(), None);

        gate.notify_one();
        handle.await.unwrap().unwrap();
        assert!(!controller.state().submitting);
    }

    #[tokio::test]
    async fn test_subscription_is_authoritative_over_submission() {
        // Sign-in resolving with a session does not set the phase;
        // the delivered event value does.
        let store = Arc::new(MockStore::new());
        store.queue_sign_in(Ok(session("returned@example.com")));
        let controller = SessionController::start(Arc::clone(&store));
        let mut rx = controller.observe();
        wait_for(&mut rx, |s| s.phase != Phase::Initializing).await;

        controller.submit_sign_in(&sign_in_creds()).await.unwrap();
        assert!(!controller.state().phase.is_authenticated());
        assert!(!controller.state().submitting);

        let delivered = session("delivered@example.com");
        store.emit(Some(delivered.clone()));
        let state = wait_for(&mut rx, |s| s.phase.is_authenticated()).await;
        assert_eq!(state.phase.session(), Some(&delivered));
    }

    #[tokio::test]
    async fn test_sign_in_rejection_records_message() {
        let store = Arc::new(MockStore::new());
        store.queue_sign_in(Err(SessionError::Rejected(
            "Invalid login credentials".to_string(),
        )));
        let controller = SessionController::start(Arc::clone(&store));
        let mut rx = controller.observe();
        wait_for(&mut rx, |s| s.phase != Phase::Initializing).await;

        let err = controller
            .submit_sign_in(&sign_in_creds())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Rejected(_)));

        let state = wait_for(&mut rx, |s| !s.submitting && s.phase.last_error().is_some()).await;
        assert_eq!(state.phase.last_error(), Some("Invalid login credentials"));
        assert!(!state.phase.is_authenticated());
    }

    #[tokio::test]
    async fn test_error_clears_before_result_is_known() {
        // Retrying clears the previous message before the store
        // call resolves.
        let store = Arc::new(MockStore::new());
        store.queue_sign_in(Err(SessionError::Rejected("bad password".to_string())));
        let controller = Arc::new(SessionController::start(Arc::clone(&store)));
        let mut rx = controller.observe();
        wait_for(&mut rx, |s| s.phase != Phase::Initializing).await;

        let _ = controller.submit_sign_in(&sign_in_creds()).await;
        wait_for(&mut rx, |s| s.phase.last_error() == Some("bad password")).await;

        let gate = store.gate_sign_in();
        store.queue_sign_in(Ok(session("a@b.com")));
        let retrying = Arc::clone(&controller);
        let handle = tokio::spawn(async move { retrying.submit_sign_in(&sign_in_creds()).await });

        let state = wait_for(&mut rx, |s| s.submitting).await;
        assert_eq!(state.phase.last_error(), None);

        gate.notify_one();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_sign_up_confirmation_stays_unauthenticated() {
        let store = Arc::new(MockStore::new());
        store.queue_sign_up(Ok(SignUpOutcome::ConfirmationRequired));
        let controller = SessionController::start(Arc::clone(&store));
        let mut rx = controller.observe();
        wait_for(&mut rx, |s| s.phase != Phase::Initializing).await;

        let outcome = controller.submit_sign_up(&sign_up_creds()).await.unwrap();
        assert_eq!(outcome, SignUpOutcome::ConfirmationRequired);

        let state = wait_for(&mut rx, |s| !s.submitting).await;
        assert_eq!(state.phase, Phase::Unauthenticated { last_error: None });
    }

    #[tokio::test]
    async fn test_sign_up_failure_records_message() {
        let store = Arc::new(MockStore::new());
        store.queue_sign_up(Err(SessionError::Rejected(
            "User already registered".to_string(),
        )));
        let controller = SessionController::start(Arc::clone(&store));
        let mut rx = controller.observe();
        wait_for(&mut rx, |s| s.phase != Phase::Initializing).await;

        let err = controller.submit_sign_up(&sign_up_creds()).await.unwrap_err();
        assert!(matches!(err, SessionError::Rejected(_)));

        let state = wait_for(&mut rx, |s| !s.submitting && s.phase.last_error().is_some()).await;
        assert_eq!(state.phase.last_error(), Some("User already registered"));
    }

    #[tokio::test]
    async fn test_events_apply_in_arrival_order() {
        // Session then null, observed in that order.
        let store = Arc::new(MockStore::new());
        let controller = SessionController::start(Arc::clone(&store));
        let mut rx = controller.observe();
        wait_for(&mut rx, |s| s.phase != Phase::Initializing).await;

        store.emit(Some(session("u1@example.com")));
        wait_for(&mut rx, |s| s.phase.is_authenticated()).await;

        tokio::time::sleep(Duration::from_millis(10)).await;
        store.emit(None);
        let state = wait_for(&mut rx, |s| !s.phase.is_authenticated()).await;
        assert_eq!(state.phase, Phase::Unauthenticated { last_error: None });
    }

    #[tokio::test]
    async fn test_sign_out_requires_active_session() {
        let store = Arc::new(MockStore::new());
        let controller = SessionController::start(Arc::clone(&store));
        let mut rx = controller.observe();
        wait_for(&mut rx, |s| s.phase != Phase::Initializing).await;

        let err = controller.sign_out().await.unwrap_err();
        assert!(matches!(err, SessionError::NotAuthenticated));
        assert_eq!(store.sign_out_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sign_out_waits_for_session_event() {
        // The store resolving sign-out does not end the session; only
        // the event does. Absent the event, the controller stays
        // Authenticated (the detectable protocol inconsistency).
        let store = Arc::new(MockStore::new());
        let controller = SessionController::start(Arc::clone(&store));
        let mut rx = controller.observe();
        wait_for(&mut rx, |s| s.phase != Phase::Initializing).await;

        store.emit(Some(session("u1@example.com")));
        wait_for(&mut rx, |s| s.phase.is_authenticated()).await;

        controller.sign_out().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(controller.state().phase.is_authenticated());

        store.emit(None);
        wait_for(&mut rx, |s| !s.phase.is_authenticated()).await;
    }

    #[tokio::test]
    async fn test_shutdown_releases_subscription_and_ignores_events() {
        let store = Arc::new(MockStore::new());
        let controller = SessionController::start(Arc::clone(&store));
        let mut rx = controller.observe();
        wait_for(&mut rx, |s| s.phase != Phase::Initializing).await;

        controller.shutdown().await;
        assert!(store.released());

        let before = controller.state();
        store.emit(Some(session("late@example.com")));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(controller.state(), before);
    }

    #[tokio::test]
    async fn test_drop_without_shutdown_releases_subscription() {
        let store = Arc::new(MockStore::new());
        let controller = SessionController::start(Arc::clone(&store));
        let mut rx = controller.observe();
        wait_for(&mut rx, |s| s.phase != Phase::Initializing).await;

        drop(controller);

        // Dropping only aborts the tasks; the subscription guard runs
        // once the event task actually unwinds.
        tokio::time::timeout(Duration::from_secs(1), async {
            while !store.released() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("subscription not released after drop");

        let before = (*rx.borrow()).clone();
        store.emit(Some(session("late@example.com")));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(*rx.borrow(), before);
    }

    #[tokio::test]
    async fn test_submitting_clears_when_store_call_panics() {
        let store = Arc::new(MockStore::new());
        store.panic_next_sign_in();
        let controller = Arc::new(SessionController::start(Arc::clone(&store)));
        let mut rx = controller.observe();
        wait_for(&mut rx, |s| s.phase != Phase::Initializing).await;

        let handle = Arc::clone(&controller);
        let attempt =
            tokio::spawn(async move { handle.submit_sign_in(&sign_in_creds()).await });
        let joined = attempt.await;
        assert!(joined.unwrap_err().is_panic());

        assert!(!controller.state().submitting);

        // The slot is reusable after the unwound attempt.
        store.queue_sign_in(Ok(session("a@b.com")));
        controller.submit_sign_in(&sign_in_creds()).await.unwrap();
        assert_eq!(store.sign_in_calls(), 2);
    }

    #[tokio::test]
    async fn test_new_session_event_replaces_stored_session() {
        // A refresh-style event while authenticated replaces the copy.
        let store = Arc::new(MockStore::new());
        let controller = SessionController::start(Arc::clone(&store));
        let mut rx = controller.observe();
        wait_for(&mut rx, |s| s.phase != Phase::Initializing).await;

        store.emit(Some(session("first@example.com")));
        wait_for(&mut rx, |s| s.phase.is_authenticated()).await;

        let refreshed = session("second@example.com");
        store.emit(Some(refreshed.clone()));
        let state = wait_for(&mut rx, |s| {
            s.phase.session().map(|q| q.email.as_str()) == Some("second@example.com")
        })
        .await;
        assert_eq!(state.phase.session(), Some(&refreshed));
    }
}
