use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::auth::dto::AuthResponse;
use crate::domain::PublicUser;

use super::api::{ApiClient, AuthApi};
use super::ClientError;

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

/// Durable key/value storage for the client session.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError>;
    fn set(&self, key: &str, value: &str) -> Result<(), ClientError>;
    fn remove(&self, key: &str) -> Result<(), ClientError>;
}

/// One file per key under `dir`.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        match std::fs::read_to_string(self.dir.join(key)) {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.dir.join(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        match std::fs::remove_file(self.dir.join(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        let entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.remove(key);
        Ok(())
    }
}

/// Bearer token plus the denormalized user it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: PublicUser,
}

impl Session {
    /// API client authenticated as this session.
    pub fn client(&self, base: &ApiClient) -> ApiClient {
        base.with_token(&self.token)
    }
}

/// Owns the current session and keeps it in sync with storage.
pub struct SessionManager<S: SessionStorage> {
    storage: S,
    current: Option<Session>,
}

impl<S: SessionStorage> SessionManager<S> {
    /// Loads a previous session. Both keys must be present and the user
    /// record must parse, otherwise the manager starts signed out.
    pub fn restore(storage: S) -> Result<Self, ClientError> {
        let token = storage.get(TOKEN_KEY)?;
        let user = storage.get(USER_KEY)?;
        let current = match (token, user) {
            (Some(token), Some(user)) if !token.is_empty() => {
                match serde_json::from_str::<PublicUser>(&user) {
                    Ok(user) => Some(Session { token, user }),
                    Err(e) => {
                        warn!(error = %e, "stored user record is unreadable; starting signed out");
                        None
                    }
                }
            }
            _ => None,
        };
        debug!(restored = current.is_some(), "session restore");
        Ok(Self { storage, current })
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }

    pub async fn sign_up<A: AuthApi + ?Sized>(
        &mut self,
        api: &A,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<&Session, ClientError> {
        let res = api.signup(email, password, full_name).await?;
        self.install(res)
    }

    pub async fn sign_in<A: AuthApi + ?Sized>(
        &mut self,
        api: &A,
        email: &str,
        password: &str,
    ) -> Result<&Session, ClientError> {
        let res = api.login(email, password).await?;
        self.install(res)
    }

    /// Clears both stored keys and the in-memory session.
    pub fn sign_out(&mut self) -> Result<(), ClientError> {
        self.storage.remove(TOKEN_KEY)?;
        self.storage.remove(USER_KEY)?;
        self.current = None;
        Ok(())
    }

    fn install(&mut self, res: AuthResponse) -> Result<&Session, ClientError> {
        if res.token.is_empty() {
            return Err(ClientError::Decode("response carried no token".into()));
        }
        let user = serde_json::to_string(&res.user).map_err(|e| ClientError::Decode(e.to_string()))?;
        self.storage.set(TOKEN_KEY, &res.token)?;
        self.storage.set(USER_KEY, &user)?;
        Ok(&*self.current.insert(Session {
            token: res.token,
            user: res.user,
        }))
    }
}
