//! Session Lifecycle Core
//!
//! Client-side session management for the education portal. The portal
//! delegates persistence and authentication to a hosted
//! backend-as-a-service; this crate owns the one piece with real
//! state-machine structure: reconciling that asynchronous external
//! source with locally observable state.
//!
//! Structure:
//! - `domain/` - Session entity, value objects, the `SessionStore` trait
//! - `application/` - The `SessionController` state machine and config
//! - `infra/` - Store implementations (hosted HTTP service, in-memory)
//!
//! ## Lifecycle model
//! - Exactly one of `Initializing`, `Authenticated`, `Unauthenticated`
//!   holds at any observable instant
//! - Session events from the store are authoritative and applied in
//!   strict arrival order; submission return values never set the phase
//! - Only one sign-in/sign-up submission may be outstanding at a time
//! - The store subscription is released exactly once on teardown

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;

// Re-exports for convenience
pub use application::config::StoreConfig;
pub use application::controller::{ControllerState, Phase, SessionController};
pub use domain::entity::session::Session;
pub use domain::store::{SessionStore, SignUpOutcome, Subscription, SubscriptionGuard};
pub use domain::value_object::credentials::{SignInCredentials, SignUpCredentials};
pub use domain::value_object::email::Email;
pub use domain::value_object::profile::Profile;
pub use error::{SessionError, SessionResult};
pub use infra::http::HttpSessionStore;
pub use infra::memory::MemorySessionStore;
