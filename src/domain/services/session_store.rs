#[cfg(test)]
#[path = "session_store_test.rs"]
mod tests;

use std::fs;
use std::io::Write;
use std::path;
use std::sync::Arc;

use anyhow::Result;
use serde_derive::Deserialize;
use serde_derive::Serialize;
use tokio::sync::watch;

use crate::domain::models::Identity;
use crate::domain::models::Session;
use crate::domain::models::TokenPair;

/// On-disk form of the store, every value keyed by name.
#[derive(Default, Serialize, Deserialize)]
struct PersistedCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    identity: Option<Identity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    oauth_return_url: Option<String>,
}

impl PersistedCredentials {
    fn session(&self) -> Option<Session> {
        let access_token = self.access_token.clone()?;
        let refresh_token = self.refresh_token.clone()?;

        return Some(Session::new(
            TokenPair {
                access_token,
                refresh_token,
            },
            self.identity.clone(),
        ));
    }
}

struct StoreInner {
    file_path: Option<path::PathBuf>,
    session: watch::Sender<Option<Session>>,
    return_url: watch::Sender<Option<String>>,
}

/// Holds the current session. Every mutation replaces the whole value, is
/// visible to subscribers before the call returns, and is written through to
/// the credentials file when one is configured.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

impl SessionStore {
    fn new(file_path: Option<path::PathBuf>, persisted: PersistedCredentials) -> SessionStore {
        let (session, _) = watch::channel(persisted.session());
        let (return_url, _) = watch::channel(persisted.oauth_return_url);

        return SessionStore {
            inner: Arc::new(StoreInner {
                file_path,
                session,
                return_url,
            }),
        };
    }

    #[cfg(test)]
    pub fn in_memory() -> SessionStore {
        return SessionStore::new(None, PersistedCredentials::default());
    }

    /// Restores the store from the credentials file, starting empty when the
    /// file does not exist yet.
    pub fn load(file_path: path::PathBuf) -> Result<SessionStore> {
        let mut persisted = PersistedCredentials::default();
        if file_path.exists() {
            let payload = fs::read_to_string(&file_path)?;
            if !payload.trim().is_empty() {
                persisted = serde_yaml::from_str(&payload)?;
            }
        }

        return Ok(SessionStore::new(Some(file_path), persisted));
    }

    pub fn get(&self) -> Option<Session> {
        return self.inner.session.borrow().clone();
    }

    pub fn access_token(&self) -> Option<String> {
        return self
            .inner
            .session
            .borrow()
            .as_ref()
            .map(|session| return session.access_token().to_string());
    }

    pub fn refresh_token(&self) -> Option<String> {
        return self
            .inner
            .session
            .borrow()
            .as_ref()
            .map(|session| return session.refresh_token().to_string());
    }

    pub fn identity(&self) -> Option<Identity> {
        return self
            .inner
            .session
            .borrow()
            .as_ref()
            .and_then(|session| return session.identity.clone());
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        return self.inner.session.subscribe();
    }

    pub fn set(&self, session: Session) {
        self.inner.session.send_replace(Some(session));
        self.persist();
    }

    /// Drops the session together with any pending redirect target.
    pub fn clear(&self) {
        self.inner.session.send_replace(None);
        self.inner.return_url.send_replace(None);
        self.persist();
    }

    /// Replaces the credential pair of the session that still holds
    /// `refresh_token`. A session cleared or replaced in the meantime is left
    /// alone. Returns whether anything was replaced.
    pub fn rotate(&self, refresh_token: &str, tokens: TokenPair) -> bool {
        let rotated = self.inner.session.send_if_modified(|current| {
            let Some(session) = current else {
                return false;
            };
            if session.refresh_token() != refresh_token {
                return false;
            }

            *session = session.rotate(tokens);
            return true;
        });

        if rotated {
            self.persist();
        }

        return rotated;
    }

    /// Clears the session only while it still holds `refresh_token`.
    pub fn clear_if_current(&self, refresh_token: &str) -> bool {
        let current = self
            .get()
            .map(|session| return session.refresh_token() == refresh_token)
            .unwrap_or(false);
        if current {
            self.clear();
        }

        return current;
    }

    pub fn set_identity(&self, identity: Identity) -> bool {
        let updated = self.inner.session.send_if_modified(|current| {
            let Some(session) = current else {
                return false;
            };

            *session = session.with_identity(identity);
            return true;
        });

        if updated {
            self.persist();
        }

        return updated;
    }

    pub fn set_return_url(&self, url: &str) {
        self.inner.return_url.send_replace(Some(url.to_string()));
        self.persist();
    }

    /// Returns the redirect target once and forgets it.
    pub fn take_return_url(&self) -> Option<String> {
        let url = self.inner.return_url.send_replace(None);
        if url.is_some() {
            self.persist();
        }

        return url;
    }

    fn persist(&self) {
        if let Some(file_path) = &self.inner.file_path {
            if let Err(err) = self.write(file_path) {
                tracing::error!(error = ?err, path = ?file_path, "Failed to persist credentials");
            }
        }
    }

    fn write(&self, file_path: &path::Path) -> Result<()> {
        let session = self.get();
        let oauth_return_url = self.inner.return_url.borrow().clone();

        if session.is_none() && oauth_return_url.is_none() {
            if file_path.exists() {
                fs::remove_file(file_path)?;
            }
            return Ok(());
        }

        let persisted = PersistedCredentials {
            access_token: session
                .as_ref()
                .map(|session| return session.access_token().to_string()),
            refresh_token: session
                .as_ref()
                .map(|session| return session.refresh_token().to_string()),
            identity: session.and_then(|session| return session.identity),
            oauth_return_url,
        };

        let payload = serde_yaml::to_string(&persisted)?;
        if let Some(parent) = file_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(file_path)?;
        file.write_all(payload.as_bytes())?;
        file.flush()?;

        return Ok(());
    }
}
