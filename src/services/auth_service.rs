//! Domain service for authentication and user management.
//!
//! Handles login, registration, current-user resolution and both password
//! reset flows (emailed token and forced reset after a breach).

use thiserror::Error;

use crate::db::User;

/// Errors specific to authentication operations.
///
/// The `Display` text of every variant except [`AuthError::Database`] is
/// safe to show to the user verbatim.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    /// Deliberately does not say whether the username or the password was wrong.
    #[error("Invalid username or password.")]
    InvalidCredentials,

    #[error("The username is already taken")]
    UsernameTaken,

    #[error("This email is already registered")]
    EmailTaken,

    #[error("The password reset link is invalid or has expired.")]
    InvalidResetToken,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(format!("{err:#}"))
    }
}

impl AuthError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Message suitable for rendering back to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Internal(_) => {
                "An internal error occurred. Please try again.".to_string()
            }
            other => other.to_string(),
        }
    }

    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Internal(_))
    }
}

/// Submitted registration form. Fields are raw; the service trims them.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password2: Option<String>,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Verifies credentials and returns the user.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] when a field is missing and
    /// [`AuthError::InvalidCredentials`] for an unknown user or wrong password.
    async fn login(&self, username: &str, password: &str) -> Result<User, AuthError>;

    /// Validates and creates a new account. Rules are checked in order and
    /// the first failure is returned.
    async fn register(&self, registration: &Registration) -> Result<User, AuthError>;

    /// Looks up the user a session points at.
    async fn current_user(&self, user_id: i32) -> Result<Option<User>, AuthError>;

    /// Issues a reset token for the account registered under `email`.
    /// Returns `None` when there is no such account.
    async fn request_password_reset(&self, email: &str) -> Result<Option<String>, AuthError>;

    /// Sets a new password using a previously issued reset token.
    async fn reset_password_with_token(
        &self,
        token: &str,
        password: &str,
        password2: &str,
    ) -> Result<User, AuthError>;

    /// Sets a new password for a user flagged for a forced reset.
    async fn complete_forced_reset(
        &self,
        user_id: i32,
        password: &str,
        password2: &str,
    ) -> Result<(), AuthError>;
}

/// Password rules shared by registration and both reset flows.
pub fn validate_new_password(password: &str, password2: &str) -> Result<(), AuthError> {
    if password.is_empty() {
        return Err(AuthError::validation("You have to enter a password"));
    }
    if password != password2 {
        return Err(AuthError::validation("The two passwords do not match"));
    }
    Ok(())
}

/// Registration field rules, in the order they are reported.
/// Returns the trimmed username and email.
pub fn validate_registration(registration: &Registration) -> Result<(String, String), AuthError> {
    let username = registration.username.as_deref().unwrap_or_default().trim();
    let email = registration.email.as_deref().unwrap_or_default().trim();
    let password = registration.password.as_deref().unwrap_or_default();
    let password2 = registration.password2.as_deref().unwrap_or_default();

    if username.is_empty() {
        return Err(AuthError::validation("You have to enter a username"));
    }
    if email.is_empty() || !email.contains('@') {
        return Err(AuthError::validation(
            "You have to enter a valid email address",
        ));
    }
    validate_new_password(password, password2)?;

    Ok((username.to_string(), email.to_string()))
}
