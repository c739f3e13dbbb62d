//! Session Entity
//!
//! The most recently observed copy of the identity issued by the
//! external authentication collaborator. The collaborator owns the
//! session; this process never persists it itself and drops it
//! entirely on sign-out or on a null session notification.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_object::{email::Email, profile::Profile};

/// Observed session identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Stable user identifier assigned by the collaborator
    pub user_id: Uuid,
    /// Account email
    pub email: Email,
    /// Free-form profile metadata attached at sign-up
    #[serde(default)]
    pub profile: Profile,
}

impl Session {
    pub fn new(user_id: Uuid, email: Email, profile: Profile) -> Self {
        Self {
            user_id,
            email,
            profile,
        }
    }

    /// Name to greet the user with: profile display name, falling back
    /// to the local part of the email.
    pub fn display_name(&self) -> &str {
        self.profile
            .display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.email.local_part())
    }
}
