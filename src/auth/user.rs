use std::convert::Infallible;

use async_session::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_login::{AuthUser, AuthnBackend, UserId};
use serde::Deserialize;
use tracing::debug;

use super::directory::UserDirectory;
use crate::capability::Viewer;
use crate::error::AppError;
use crate::model::User;

impl AuthUser for User {
    type Id = String;

    fn id(&self) -> Self::Id {
        self.id.clone()
    }

    fn session_auth_hash(&self) -> &[u8] {
        self.email.as_bytes()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Binds the user directory to the session layer. The session record only
/// carries the user id; each request resolves it back through the directory
/// without asking for the password again.
#[derive(Debug, Clone)]
pub struct Backend {
    directory: UserDirectory,
}

impl Backend {
    pub fn new(directory: UserDirectory) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl AuthnBackend for Backend {
    type User = User;
    type Credentials = Credentials;
    type Error = Infallible;

    async fn authenticate(
        &self,
        creds: Self::Credentials,
    ) -> Result<Option<Self::User>, Self::Error> {
        match self.directory.authenticate(&creds.email, &creds.password) {
            Ok(user) => Ok(Some(user)),
            Err(err) => {
                debug!("login refused for {}: {}", creds.email, err);
                Ok(None)
            }
        }
    }

    async fn get_user(&self, user_id: &UserId<Self>) -> Result<Option<Self::User>, Self::Error> {
        Ok(self.directory.find(user_id).filter(|u| u.is_active))
    }
}

// We use a type alias for convenience.
pub type AuthSession = axum_login::AuthSession<Backend>;

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_session = AuthSession::from_request_parts(parts, state)
            .await
            .map_err(|(_, reason)| AppError::Session(reason.to_string()))?;

        auth_session.user.map(Viewer::new).ok_or(AppError::Forbidden)
    }
}
