//! Bearer token storage with file locking.
//!
//! One token string is persisted under the key `token` in `session.json`.
//! Reads take a shared lock, writes go through an exclusively locked temp file
//! that is renamed over the existing one. The token is never cached in memory:
//! [`TokenStore::current`] reads it fresh on every call.

use crate::{Error, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
}

/// Claims the client reads from the token payload
#[derive(Debug, Deserialize)]
struct TokenPayload {
    id: i64,
}

/// Identity of the logged-in user, as observed at one instant
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrentSession {
    pub token: String,
    pub user_id: i64,
}

/// Extract the numeric subject id from a JWT-shaped token
///
/// Only the payload segment is decoded. Signature and expiry are not checked;
/// the backend rejecting a request is the only invalidity signal.
pub fn decode_subject(token: &str) -> Result<i64> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| Error::InvalidToken("missing payload segment".into()))?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| Error::InvalidToken(format!("payload is not base64url: {}", e)))?;

    let claims: TokenPayload = serde_json::from_slice(&bytes)
        .map_err(|e| Error::InvalidToken(format!("payload has no numeric id: {}", e)))?;

    Ok(claims.id)
}

/// File-backed token storage
#[derive(Clone, Debug)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored token
    ///
    /// A missing, unreadable or corrupted file means "no token".
    pub fn load(&self) -> Option<String> {
        if !self.path.exists() {
            return None;
        }

        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!("Unable to open session file {:?}: {}", self.path, e);
                return None;
            }
        };

        if let Err(e) = file.lock_shared() {
            tracing::warn!("Unable to lock session file {:?}: {}", self.path, e);
            return None;
        }

        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        let _ = file.unlock();
        if let Err(e) = read {
            tracing::warn!("Failed to read session file {:?}: {}", self.path, e);
            return None;
        }

        match serde_json::from_str::<StoredSession>(&contents) {
            Ok(stored) => stored.token.filter(|t| !t.trim().is_empty()),
            Err(e) => {
                tracing::warn!("Failed to parse session file {:?}: {}", self.path, e);
                None
            }
        }
    }

    /// Persist a token, replacing any previous one
    pub fn save(&self, token: &str) -> Result<()> {
        self.write(&StoredSession {
            token: Some(token.to_string()),
        })?;
        tracing::debug!("Saved session token to {:?}", self.path);
        Ok(())
    }

    /// Forget the stored token
    pub fn clear(&self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        self.write(&StoredSession::default())?;
        tracing::debug!("Cleared session token at {:?}", self.path);
        Ok(())
    }

    /// The single "current session" accessor
    ///
    /// Reads and decodes the token at call time, so a token replaced on disk
    /// is observed by the very next request.
    pub fn current(&self) -> Result<CurrentSession> {
        let token = self.load().ok_or(Error::NotAuthenticated)?;
        let user_id = decode_subject(&token)?;
        Ok(CurrentSession { token, user_id })
    }

    fn write(&self, stored: &StoredSession) -> Result<()> {
        let parent = self.path.parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "session path missing parent")
        })?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(stored)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

/// Build a JWT-shaped token carrying the given subject id (tests only)
#[cfg(test)]
pub(crate) fn token_for(user_id: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"id":{},"iat":1700000000}}"#, user_id));
    format!("{}.{}.assinatura", header, payload)
}
