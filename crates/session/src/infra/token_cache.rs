//! Token Cache
//!
//! Persists the collaborator-issued tokens (plus the user snapshot
//! they came with) between runs, in a JSON file with restricted
//! permissions (0600). Tokens are never logged in full.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::domain::entity::session::Session;
use crate::error::{SessionError, SessionResult};

/// Tokens and identity snapshot as last issued by the collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedSession {
    /// Short-lived bearer token
    pub access_token: String,
    /// Long-lived token used to mint a fresh access token
    pub refresh_token: String,
    /// Access token expiry, Unix milliseconds
    pub expires_at_ms: i64,
    /// User identity delivered alongside the tokens
    pub session: Session,
}

impl PersistedSession {
    /// True if the access token is expired or about to expire.
    /// A small margin avoids presenting a token that dies in flight.
    pub fn is_expired(&self) -> bool {
        const MARGIN_MS: i64 = 30_000;
        Utc::now().timestamp_millis() + MARGIN_MS >= self.expires_at_ms
    }
}

/// File-backed persistence for [`PersistedSession`]
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the persisted session. A missing file is `None`; an
    /// unreadable or unparseable file is an error the caller decides
    /// how to absorb.
    pub fn load(&self) -> SessionResult<Option<PersistedSession>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path).map_err(|e| {
            SessionError::Internal(format!(
                "Failed to read token cache {}: {e}",
                self.path.display()
            ))
        })?;

        let persisted = serde_json::from_str(&contents).map_err(|e| {
            SessionError::Internal(format!(
                "Failed to parse token cache {}: {e}",
                self.path.display()
            ))
        })?;
        Ok(Some(persisted))
    }

    /// Save the persisted session with restricted permissions (0600).
    pub fn save(&self, persisted: &PersistedSession) -> SessionResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SessionError::Internal(format!(
                    "Failed to create directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let contents = serde_json::to_string_pretty(persisted)
            .map_err(|e| SessionError::Internal(format!("Failed to serialize token cache: {e}")))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.path)
                .map_err(|e| {
                    SessionError::Internal(format!(
                        "Failed to open {} for writing: {e}",
                        self.path.display()
                    ))
                })?;
            file.write_all(contents.as_bytes()).map_err(|e| {
                SessionError::Internal(format!("Failed to write {}: {e}", self.path.display()))
            })?;
        }

        #[cfg(not(unix))]
        {
            fs::write(&self.path, contents).map_err(|e| {
                SessionError::Internal(format!("Failed to write {}: {e}", self.path.display()))
            })?;
        }

        Ok(())
    }

    /// Remove the persisted session. Returns whether anything existed.
    pub fn clear(&self) -> SessionResult<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path).map_err(|e| {
            SessionError::Internal(format!(
                "Failed to remove token cache {}: {e}",
                self.path.display()
            ))
        })?;
        Ok(true)
    }
}

/// Shorten a token for log output. Counts characters, not bytes, so a
/// token that is not ASCII cannot split a code point.
pub(crate) fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        "***".to_string()
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    }
}
