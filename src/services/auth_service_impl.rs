//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::config::SecurityConfig;
use crate::db::repositories::user::generate_reset_token;
use crate::db::{CreateUserError, Store, User};
use crate::services::auth_service::{
    AuthError, AuthService, Registration, validate_new_password, validate_registration,
};
use crate::services::password::{hash_password_async, verify_password_async};

pub struct SeaOrmAuthService {
    store: Store,
    security: SecurityConfig,
    /// Hash checked against when the username is unknown, so that path costs
    /// the same Argon2 work as a wrong password.
    decoy_hash: OnceCell<String>,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store, security: SecurityConfig) -> Self {
        Self {
            store,
            security,
            decoy_hash: OnceCell::const_new(),
        }
    }

    async fn decoy_hash(&self) -> &str {
        match self
            .decoy_hash
            .get_or_try_init(|| hash_password_async("decoy-password", &self.security))
            .await
        {
            Ok(hash) => hash.as_str(),
            Err(e) => {
                warn!("Failed to prepare decoy password hash: {e:#}");
                ""
            }
        }
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn login(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::validation("Username and password are required."));
        }

        let Some((user, password_hash)) = self.store.get_user_with_password(username).await?
        else {
            let _ = verify_password_async(self.decoy_hash().await, password).await;
            warn!("Failed login attempt for username: '{username}'");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password_async(&password_hash, password).await {
            warn!("Failed login attempt for username: '{username}'");
            return Err(AuthError::InvalidCredentials);
        }

        // A successful login makes any outstanding reset link moot.
        if user.reset_token.is_some()
            && let Err(e) = self.store.clear_reset_token(user.id).await
        {
            warn!(user_id = user.id, "Failed to clear reset token: {e:#}");
        }

        Ok(user)
    }

    async fn register(&self, registration: &Registration) -> Result<User, AuthError> {
        let (username, email) = validate_registration(registration)?;

        // Checked up front for the per-field messages; the unique constraints
        // still catch a concurrent registration at insert time.
        if self.store.get_user_by_username(&username).await?.is_some() {
            return Err(AuthError::UsernameTaken);
        }
        if self.store.get_user_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password = registration.password.as_deref().unwrap_or_default();
        let password_hash = hash_password_async(password, &self.security)
            .await
            .map_err(|e| AuthError::Internal(format!("{e:#}")))?;

        let id = self
            .store
            .create_user(&username, &email, &password_hash)
            .await
            .map_err(|e| match e {
                CreateUserError::UsernameTaken => AuthError::UsernameTaken,
                CreateUserError::EmailTaken => AuthError::EmailTaken,
                CreateUserError::Storage(e) => AuthError::from(e),
            })?;

        info!(user_id = id, "Registered new user '{username}'");

        self.store
            .get_user_by_id(id)
            .await?
            .ok_or_else(|| AuthError::Internal(format!("User {id} vanished after insert")))
    }

    async fn current_user(&self, user_id: i32) -> Result<Option<User>, AuthError> {
        Ok(self.store.get_user_by_id(user_id).await?)
    }

    async fn request_password_reset(&self, email: &str) -> Result<Option<String>, AuthError> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(AuthError::validation(
                "You have to enter a valid email address",
            ));
        }

        let Some(user) = self.store.get_user_by_email(email).await? else {
            return Ok(None);
        };

        let token = generate_reset_token();
        let expires_at = Utc::now() + Duration::minutes(self.security.reset_token_ttl_minutes);
        self.store.set_reset_token(user.id, &token, expires_at).await?;

        info!(user_id = user.id, "Issued password reset token");
        Ok(Some(token))
    }

    async fn reset_password_with_token(
        &self,
        token: &str,
        password: &str,
        password2: &str,
    ) -> Result<User, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::InvalidResetToken);
        }
        validate_new_password(password, password2)?;

        let user = self
            .store
            .get_user_by_reset_token(token)
            .await?
            .ok_or(AuthError::InvalidResetToken)?;

        let still_valid = user
            .reset_token_expiration
            .is_some_and(|expires_at| Utc::now() < expires_at);
        if !still_valid {
            self.store.clear_reset_token(user.id).await?;
            return Err(AuthError::InvalidResetToken);
        }

        let password_hash = hash_password_async(password, &self.security)
            .await
            .map_err(|e| AuthError::Internal(format!("{e:#}")))?;
        self.store
            .update_user_password(user.id, &password_hash)
            .await?;

        info!(user_id = user.id, "Password reset via token");
        Ok(user)
    }

    async fn complete_forced_reset(
        &self,
        user_id: i32,
        password: &str,
        password2: &str,
    ) -> Result<(), AuthError> {
        validate_new_password(password, password2)?;

        let password_hash = hash_password_async(password, &self.security)
            .await
            .map_err(|e| AuthError::Internal(format!("{e:#}")))?;
        self.store
            .update_user_password(user_id, &password_hash)
            .await?;

        info!(user_id, "Forced password reset completed");
        Ok(())
    }
}
