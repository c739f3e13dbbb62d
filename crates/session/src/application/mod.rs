//! Application Layer
//!
//! The session lifecycle controller and store configuration.

pub mod config;
pub mod controller;

// Re-exports
pub use config::StoreConfig;
pub use controller::{ControllerState, Phase, SessionController};
