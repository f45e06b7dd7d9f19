use crate::domain::session_gate::{self, Route};
use crate::infrastructure::error::InfraError;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default)]
    pub is_authenticated: bool,
    #[serde(default)]
    pub onboarding_complete: bool,
}

impl SessionSnapshot {
    pub fn authenticated(access_token: impl Into<String>, onboarding_complete: bool) -> Self {
        Self {
            access_token: Some(access_token.into()),
            is_authenticated: true,
            onboarding_complete,
        }
    }

    /// Bearer token to attach to requests; blank tokens count as absent.
    pub fn bearer_token(&self) -> Option<&str> {
        self.access_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

pub trait SessionStore: Send + Sync {
    fn load_session(&self) -> Result<Option<SessionSnapshot>, InfraError>;
    fn save_session(&self, session: &SessionSnapshot) -> Result<(), InfraError>;
    fn clear_session(&self) -> Result<(), InfraError>;
}

/// Decides the start screen from the stored session. A missing session routes
/// to login.
pub fn route_session(store: &dyn SessionStore) -> Result<Route, InfraError> {
    let session = store.load_session()?.unwrap_or_default();
    Ok(session_gate::route(
        session.is_authenticated,
        session.onboarding_complete,
    ))
}

#[derive(Debug, Clone)]
pub struct KeyringSessionStore {
    service_name: String,
    account_name: String,
}

impl KeyringSessionStore {
    pub fn new(service_name: impl Into<String>, account_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            account_name: account_name.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry, InfraError> {
        keyring::Entry::new(&self.service_name, &self.account_name)
            .map_err(|error| InfraError::Credential(error.to_string()))
    }
}

impl Default for KeyringSessionStore {
    fn default() -> Self {
        Self::new("moonly.session", "default")
    }
}

impl SessionStore for KeyringSessionStore {
    fn load_session(&self) -> Result<Option<SessionSnapshot>, InfraError> {
        let payload = match self.entry()?.get_password() {
            Ok(value) => value,
            Err(keyring::Error::NoEntry) => return Ok(None),
            Err(error) => return Err(InfraError::Credential(error.to_string())),
        };

        serde_json::from_str::<SessionSnapshot>(&payload)
            .map(Some)
            .map_err(|error| {
                InfraError::Credential(format!("stored session is unreadable: {error}"))
            })
    }

    fn save_session(&self, session: &SessionSnapshot) -> Result<(), InfraError> {
        let payload = serde_json::to_string(session)
            .map_err(|error| InfraError::Credential(error.to_string()))?;
        self.entry()?
            .set_password(&payload)
            .map_err(|error| InfraError::Credential(error.to_string()))
    }

    fn clear_session(&self) -> Result<(), InfraError> {
        match self.entry()?.delete_credential() {
            Ok(_) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(InfraError::Credential(error.to_string())),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    session: Mutex<Option<SessionSnapshot>>,
}

impl InMemorySessionStore {
    pub fn with_session(session: SessionSnapshot) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<SessionSnapshot>>, InfraError> {
        self.session
            .lock()
            .map_err(|error| InfraError::Credential(format!("in-memory lock poisoned: {error}")))
    }
}

impl SessionStore for InMemorySessionStore {
    fn load_session(&self) -> Result<Option<SessionSnapshot>, InfraError> {
        Ok(self.lock()?.clone())
    }

    fn save_session(&self, session: &SessionSnapshot) -> Result<(), InfraError> {
        *self.lock()? = Some(session.clone());
        Ok(())
    }

    fn clear_session(&self) -> Result<(), InfraError> {
        *self.lock()? = None;
        Ok(())
    }
}
