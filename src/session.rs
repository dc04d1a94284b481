use std::{
    io,
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError, RwLock},
};

use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to access token store {0}: {1}")]
    StoreError(String, io::Error),
}

/// Where the bearer credential survives between runs.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> io::Result<Option<String>>;
    fn save(&self, token: &str) -> io::Result<()>;
    fn clear(&self) -> io::Result<()>;
    fn describe(&self) -> String;
}

pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> io::Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content.trim().to_string()).filter(|t| !t.is_empty())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn save(&self, token: &str) -> io::Result<()> {
        std::fs::write(&self.path, token)
    }

    fn clear(&self) -> io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    #[cfg(test)]
    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_string())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> io::Result<Option<String>> {
        Ok(self
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, token: &str) -> io::Result<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

struct Inner {
    token: RwLock<Option<String>>,
    store: Box<dyn TokenStore>,
}

/// Process-wide session context. Cheap to clone, every clone sees the same
/// credential.
///
/// Presence of a token is all "authenticated" means here: nothing checks
/// expiry, an expired token keeps reporting authenticated until the api
/// rejects a call.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl Session {
    pub fn open(store: impl TokenStore + 'static) -> Result<Self, SessionError> {
        let token = store
            .load()
            .map_err(|err| SessionError::StoreError(store.describe(), err))?;
        log::debug!(
            "session opened from {} (authenticated: {})",
            store.describe(),
            token.is_some()
        );
        Ok(Self {
            inner: Arc::new(Inner {
                token: RwLock::new(token),
                store: Box::new(store),
            }),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(Inner {
                token: RwLock::new(None),
                store: Box::new(MemoryTokenStore::default()),
            }),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.bearer().is_some()
    }

    pub fn bearer(&self) -> Option<String> {
        self.inner
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .filter(|token| !token.is_empty())
    }

    pub fn login(&self, token: &str) -> Result<(), SessionError> {
        self.inner
            .store
            .save(token)
            .map_err(|err| SessionError::StoreError(self.inner.store.describe(), err))?;
        *self
            .inner
            .token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        log::info!("logged in, token saved to {}", self.inner.store.describe());
        Ok(())
    }

    pub fn logout(&self) -> Result<(), SessionError> {
        self.inner
            .store
            .clear()
            .map_err(|err| SessionError::StoreError(self.inner.store.describe(), err))?;
        *self
            .inner
            .token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
        log::info!("logged out");
        Ok(())
    }

    /// The user id claim of a jwt shaped token. The signature is not checked,
    /// this only picks who is acting.
    pub fn user_id(&self) -> Option<u64> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Claims {
            #[serde(default)]
            sub: Option<serde_json::Value>,
            #[serde(default)]
            user_id: Option<serde_json::Value>,
        }

        let as_id = |value: serde_json::Value| match value {
            serde_json::Value::Number(n) => n.as_u64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        };

        let token = self.bearer()?;
        let payload = token.split('.').nth(1)?;
        let bytes = general_purpose::URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .ok()?;
        let claims: Claims = serde_json::from_slice(&bytes).ok()?;
        claims
            .user_id
            .and_then(as_id)
            .or_else(|| claims.sub.and_then(as_id))
    }
}
