//! Credentials Value Objects
//!
//! Transient submission inputs. A value exists only for the duration
//! of one store call and is never retained after it resolves.

use crate::domain::value_object::{email::Email, profile::Profile};
use crate::error::{SessionError, SessionResult};

/// Sign-in submission input
#[derive(Debug, Clone)]
pub struct SignInCredentials {
    pub email: Email,
    pub password: String,
}

impl SignInCredentials {
    /// Validate and build sign-in credentials
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> SessionResult<Self> {
        let email = Email::new(email)?;
        let password = password.into();
        if password.is_empty() {
            return Err(SessionError::Validation(
                "Password cannot be empty".to_string(),
            ));
        }
        Ok(Self { email, password })
    }
}

/// Sign-up submission input
#[derive(Debug, Clone)]
pub struct SignUpCredentials {
    pub email: Email,
    pub password: String,
    pub profile: Profile,
}

impl SignUpCredentials {
    /// Validate and build sign-up credentials.
    ///
    /// The minimum password length mirrors what the portal's sign-up
    /// form enforced.
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        profile: Profile,
    ) -> SessionResult<Self> {
        let email = Email::new(email)?;
        let password = password.into();
        if password.len() < 6 {
            return Err(SessionError::Validation(
                "Password must be at least 6 characters".to_string(),
            ));
        }
        Ok(Self {
            email,
            password,
            profile,
        })
    }
}
