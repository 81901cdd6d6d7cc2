//! Credential checks and the per-client session context.
//!
//! The credential store is a JSON object mapping usernames to the SHA-256 hex
//! digest of their password. Digests are unsalted and compared byte-for-byte.

use crate::error::{Error, Result};
use log::{info, warn};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::{self, File, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Pages a logged-in user can be on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    /// Daily lookup by item code.
    #[default]
    Lookup,
    /// Monthly stock evolution chart.
    Evolution,
}

/// Login state for one client.
///
/// Created logged out when a client first shows up; the presentation layer
/// decides whether to keep it between interactions.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Session {
    username: Option<String>,
    page: Page,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_logged_in(&self) -> bool {
        self.username.is_some()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn set_page(&mut self, page: Page) {
        self.page = page;
    }

    /// Returns to the logged-out state.
    pub fn log_out(&mut self) {
        *self = Session::default();
    }
}

/// SHA-256 hex digest of a password.
pub fn make_hash(password: &str) -> String {
    format!("{:x}", Sha256::digest(password.as_bytes()))
}

pub fn check_hash(password: &str, hashed: &str) -> bool {
    make_hash(password) == hashed
}

/// File-backed table of `(username, password digest)` pairs.
#[derive(Clone, Debug)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CredentialStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the parent directory and an empty store if the file is missing.
    pub fn init(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                create_dir_all(dir).map_err(|e| Error::Store(e.to_string()))?;
            }
        }
        if !self.path.exists() {
            let mut file = File::create(&self.path).map_err(|e| Error::Store(e.to_string()))?;
            file.write_all(b"{}").map_err(|e| Error::Store(e.to_string()))?;
        }
        Ok(())
    }

    pub fn users(&self) -> Result<HashMap<String, String>> {
        let contents = fs::read_to_string(&self.path).map_err(|e| {
            Error::Store(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            Error::Store(format!("cannot parse {}: {}", self.path.display(), e))
        })
    }

    fn save(&self, users: &HashMap<String, String>) -> Result<()> {
        let json = serde_json::to_string_pretty(users).map_err(|e| Error::Store(e.to_string()))?;
        fs::write(&self.path, json).map_err(|e| Error::Store(e.to_string()))
    }

    /// Adds or replaces a user with the digest of `password`.
    pub fn add_user(&self, username: &str, password: &str) -> Result<()> {
        if username.is_empty() || password.is_empty() {
            return Err(Error::Parse(
                "username and password cannot be empty".to_string(),
            ));
        }
        self.init()?;
        let mut users = self.users()?;
        users.insert(username.to_string(), make_hash(password));
        self.save(&users)
    }

    /// Checks a credential pair.
    ///
    /// # Errors
    /// * `Error::Auth` for an unknown user and for a wrong password alike
    /// * `Error::Store` when the store cannot be read
    pub fn verify(&self, username: &str, password: &str) -> Result<()> {
        let users = self.users()?;
        match users.get(username) {
            Some(stored) if check_hash(password, stored) => Ok(()),
            _ => Err(Error::Auth),
        }
    }
}

/// Logs `session` in when the credentials check out; leaves it untouched otherwise.
pub fn login(
    store: &CredentialStore,
    session: &mut Session,
    username: &str,
    password: &str,
) -> Result<()> {
    match store.verify(username, password) {
        Ok(()) => {
            info!("user '{}' logged in", username);
            session.username = Some(username.to_string());
            session.page = Page::default();
            Ok(())
        }
        Err(e) => {
            warn!("login rejected: {}", e);
            Err(e)
        }
    }
}
