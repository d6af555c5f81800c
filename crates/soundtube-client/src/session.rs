//! SessionContext: the authenticated identity every other component is
//! gated on.
//!
//! The token and display name live together in an `Option<Session>`, so a
//! token without a name (or the reverse) cannot be represented.  The pair is
//! written through to [`SessionStorage`] on login and removed on logout.

use std::sync::Arc;

use soundtube_proto::protocol::{self, LoginRequest, RegisterRequest};
use soundtube_proto::storage::{SessionStorage, TOKEN_KEY, USER_NAME_KEY};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::{ClientError, Result};
use crate::transport::{ApiRequest, Transport};

pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 50;
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_name: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("user_name", &self.user_name)
            .finish()
    }
}

/// Local pre-conditions shared by login and registration.  The backend
/// enforces the same rules; this only saves a round trip.
pub fn validate_credentials(username: &str, password: &str) -> Result<()> {
    let name_len = username.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&name_len) {
        return Err(ClientError::validation(format!(
            "username must be between {MIN_USERNAME_LEN} and {MAX_USERNAME_LEN} characters"
        )));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ClientError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub struct SessionContext {
    current: RwLock<Option<Session>>,
    storage: Arc<dyn SessionStorage>,
    transport: Arc<dyn Transport>,
}

impl SessionContext {
    /// Build the context, restoring a persisted session if one is complete.
    pub fn restore(storage: Arc<dyn SessionStorage>, transport: Arc<dyn Transport>) -> Self {
        let token = storage.get(TOKEN_KEY).filter(|t| !t.is_empty());
        let user_name = storage.get(USER_NAME_KEY).filter(|n| !n.is_empty());

        let current = match (token, user_name) {
            (Some(token), Some(user_name)) => {
                info!("Restored session for {}", user_name);
                Some(Session { token, user_name })
            }
            (None, None) => None,
            _ => {
                warn!("Discarding half-written session from storage");
                remove_both(storage.as_ref());
                None
            }
        };

        Self {
            current: RwLock::new(current),
            storage,
            transport,
        }
    }

    pub async fn current(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    pub async fn has_session(&self) -> bool {
        self.current.read().await.is_some()
    }

    pub async fn token(&self) -> Option<String> {
        self.current.read().await.as_ref().map(|s| s.token.clone())
    }

    /// Token for an operation that cannot run anonymously.
    pub async fn require_token(&self) -> Result<String> {
        self.token().await.ok_or(ClientError::AuthRequired)
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<()> {
        validate_credentials(username, password)?;

        let request = ApiRequest::post("/api/auth/register").json(&RegisterRequest {
            username,
            email,
            password,
        })?;
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            warn!("Registration of {} rejected: {}", username, response.status);
            return Err(ClientError::remote(&response));
        }

        info!("Registered {}", username);
        Ok(())
    }

    /// Authenticate and install the resulting session.  On any failure the
    /// previous session (if any) is left untouched.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        validate_credentials(username, password)?;

        let request =
            ApiRequest::post("/api/auth/login").json(&LoginRequest { username, password })?;
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            warn!("Login for {} rejected: {}", username, response.status);
            return Err(ClientError::remote(&response));
        }

        let token = protocol::parse_login_token(&response.body).ok_or_else(|| {
            ClientError::UnexpectedResponse("login response carried no token".to_string())
        })?;
        let session = Session {
            token,
            user_name: username.to_string(),
        };

        if let Err(e) = self.storage.set(TOKEN_KEY, &session.token) {
            warn!("Could not persist session token: {}", e);
        }
        if let Err(e) = self.storage.set(USER_NAME_KEY, &session.user_name) {
            warn!("Could not persist user name: {}", e);
        }
        *self.current.write().await = Some(session.clone());

        info!("Logged in as {}", session.user_name);
        Ok(session)
    }

    /// Tell the backend we are leaving, then forget the session.  The remote
    /// call is best-effort; the local clear always happens.
    pub async fn logout(&self) {
        if let Some(token) = self.token().await {
            let request = ApiRequest::post("/api/auth/logout").bearer(Some(&token));
            match self.transport.send(request).await {
                Ok(response) if response.is_success() => {}
                Ok(response) => warn!(
                    "Logout not acknowledged ({}): {}",
                    response.status,
                    response.error_message()
                ),
                Err(e) => warn!("Logout request failed: {}", e),
            }
        }
        self.clear().await;
        info!("Logged out");
    }

    /// Forget the session locally without contacting the backend.
    pub async fn clear(&self) {
        *self.current.write().await = None;
        remove_both(self.storage.as_ref());
    }
}

fn remove_both(storage: &dyn SessionStorage) {
    for key in [TOKEN_KEY, USER_NAME_KEY] {
        if let Err(e) = storage.remove(key) {
            warn!("Could not remove {} from storage: {}", key, e);
        }
    }
}
