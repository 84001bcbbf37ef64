/// Auth protocol
///
/// Register, login, refresh, logout, check and delete, built on the token
/// engine and the user store. The only session state is the fingerprint of
/// the live refresh token on the user row:
///
/// `NoSession -(register|login)-> Active -(refresh)-> Active -(logout)-> NoSession`
///
/// Logging in again while a session is active overwrites the fingerprint and
/// silently revokes the previous refresh token.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::auth::claims::{AccessPayload, RefreshPayload, Role};
use crate::auth::password::Credentials;
use crate::auth::token::{TokenEngine, VerifiedToken, BEARER_SCHEME};
use crate::codec::short_hash;
use crate::error::{AuthError, ErrorContext, ValidationError};
use crate::store::{NewUser, User, UserStore};

/// `{refresh, access}`; both empty after logout
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub refresh: String,
    pub access: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access: String,
}

pub struct AuthService {
    engine: Arc<TokenEngine>,
    users: Arc<dyn UserStore>,
}

impl AuthService {
    pub fn new(engine: Arc<TokenEngine>, users: Arc<dyn UserStore>) -> Self {
        Self { engine, users }
    }

    pub fn engine(&self) -> &TokenEngine {
        &self.engine
    }

    /// Create an account with role `user` and open its first session
    pub async fn register(&self, email: &str, password: &str) -> Result<TokenPair, AuthError> {
        let context = ErrorContext::new("register");
        let result: Result<_, AuthError> = async {
            let credentials = Credentials::parse(email, password)?;
            let user = self
                .users
                .create_user(NewUser {
                    email: credentials.email,
                    password_hash: credentials.password_hash,
                    role: Role::User,
                })
                .await
                .map_err(AuthError::Persist)?;

            let tokens = self.open_session(user.clone()).await?;
            tracing::info!(request_id = %context.request_id, user_id = user.id, "User registered");
            Ok(tokens)
        }
        .await;

        context.finish(result)
    }

    /// Check credentials and open a new session, revoking any previous one
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, AuthError> {
        let context = ErrorContext::new("login");
        let result: Result<_, AuthError> = async {
            let credentials = Credentials::parse(email, password)?;
            let user = self
                .users
                .find_by_email_and_password(&credentials.email, &credentials.password_hash)
                .await
                .map_err(AuthError::Lookup)?;

            let user_id = user.id;
            let tokens = self.open_session(user).await?;
            tracing::info!(request_id = %context.request_id, user_id, "User logged in");
            Ok(tokens)
        }
        .await;

        context.finish(result)
    }

    /// New access token for the holder of the live refresh token.
    /// The refresh token itself is not rotated.
    pub async fn refresh(&self, token: &VerifiedToken) -> Result<AccessToken, AuthError> {
        let context = ErrorContext::new("refresh");
        let result: Result<_, AuthError> = async {
            let user = self.session_owner(token).await?;
            let access = self.issue_access(&user)?;
            tracing::debug!(request_id = %context.request_id, user_id = user.id, "Access token renewed");
            Ok(AccessToken { access })
        }
        .await;

        context.finish(result)
    }

    /// Close the session: the fingerprint is cleared only if it still
    /// belongs to `token`.
    pub async fn logout(&self, token: &VerifiedToken) -> Result<TokenPair, AuthError> {
        let context = ErrorContext::new("logout");
        let result: Result<_, AuthError> = async {
            let user = self.session_owner(token).await?;
            self.users
                .swap_fingerprint(user.id, &token.fingerprint(), "")
                .await
                .map_err(AuthError::Persist)?;

            tracing::info!(request_id = %context.request_id, user_id = user.id, "User logged out");
            Ok(TokenPair::default())
        }
        .await;

        context.finish(result)
    }

    /// Stateless validation of a token (a `Bearer ` prefix is tolerated)
    pub fn check(&self, token: &str) -> Result<(), AuthError> {
        let context = ErrorContext::new("check");
        let token = token
            .strip_prefix(BEARER_SCHEME)
            .and_then(|rest| rest.strip_prefix(' '))
            .unwrap_or(token);

        context.finish(self.engine.verify(token).map(|_| ()).map_err(AuthError::from))
    }

    /// Admin-only removal of the user `target_id`
    pub async fn delete(&self, token: &VerifiedToken, target_id: i64) -> Result<(), AuthError> {
        let context = ErrorContext::new("delete_user");
        let result: Result<_, AuthError> = async {
            if target_id == 0 {
                return Err(ValidationError::EmptyField("user_id").into());
            }

            let caller = self.authorize_admin(token).await?;
            self.users.find_by_id(target_id).await.map_err(AuthError::Lookup)?;
            self.users.delete_user(target_id).await.map_err(AuthError::Persist)?;

            tracing::info!(
                request_id = %context.request_id,
                user_id = caller.id,
                target_id,
                "User deleted"
            );
            Ok(())
        }
        .await;

        context.finish(result)
    }

    /// Decode the access payload of `token` and require an admin caller
    pub async fn authorize_admin(&self, token: &VerifiedToken) -> Result<User, AuthError> {
        let payload = AccessPayload::decode(token.payload_json())?;
        self.require_admin(&payload).await
    }

    /// The stored record of the caller, if its role is admin.
    /// The role carried in the token is not trusted.
    pub async fn require_admin(&self, payload: &AccessPayload) -> Result<User, AuthError> {
        let caller = self
            .users
            .find_by_id(payload.user_id)
            .await
            .map_err(AuthError::Lookup)?;

        if caller.role != Role::Admin {
            return Err(AuthError::Forbidden);
        }
        Ok(caller)
    }

    async fn open_session(&self, user: User) -> Result<TokenPair, AuthError> {
        let refresh = self.engine.issue_payload(&RefreshPayload::new(user.id).into())?;
        self.users
            .set_fingerprint(user.id, &short_hash(&refresh))
            .await
            .map_err(AuthError::Persist)?;

        let access = self.issue_access(&user)?;
        Ok(TokenPair { refresh, access })
    }

    async fn session_owner(&self, token: &VerifiedToken) -> Result<User, AuthError> {
        let payload = RefreshPayload::decode(token.payload_json())?;
        self.users
            .find_by_id_and_fingerprint(payload.user_id, &token.fingerprint())
            .await
            .map_err(AuthError::Lookup)
    }

    fn issue_access(&self, user: &User) -> Result<String, AuthError> {
        let payload = AccessPayload::new(user.id, user.email.clone(), user.role);
        Ok(self.engine.issue_payload(&payload.into())?)
    }
}
