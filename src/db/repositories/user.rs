use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    SqlErr,
};
use thiserror::Error;

use crate::entities::users;

/// User data returned from repository (without sensitive password hash)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub force_password_reset: bool,
    pub reset_token: Option<String>,
    pub reset_token_expiration: Option<DateTime<Utc>>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        // An unparseable expiration is treated as already expired.
        let reset_token_expiration = model
            .reset_token_expiration
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            force_password_reset: model.force_password_reset,
            reset_token: model.reset_token,
            reset_token_expiration,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Error)]
pub enum CreateUserError {
    #[error("username already taken")]
    UsernameTaken,

    #[error("email already registered")]
    EmailTaken,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl From<DbErr> for CreateUserError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(msg)) if msg.contains("email") => {
                Self::EmailTaken
            }
            Some(SqlErr::UniqueConstraintViolation(_)) => Self::UsernameTaken,
            _ => Self::Storage(anyhow::Error::new(err).context("Failed to insert user")),
        }
    }
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Get user by username (exact, case-sensitive match)
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        Ok(user.map(User::from))
    }

    /// Get user by username together with the stored password hash
    pub async fn get_by_username_with_password(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        Ok(user.map(|u| {
            let password_hash = u.password_hash.clone();
            (User::from(u), password_hash)
        }))
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        Ok(user.map(User::from))
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(User::from))
    }

    pub async fn get_by_reset_token(&self, token: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::ResetToken.eq(token))
            .one(&self.conn)
            .await
            .context("Failed to query user by reset token")?;

        Ok(user.map(User::from))
    }

    /// Insert a new user. Duplicate usernames/emails surface as conflicts
    /// through the table's unique constraints.
    pub async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<i32, CreateUserError> {
        let now = Utc::now().to_rfc3339();

        let active = users::ActiveModel {
            username: Set(username.to_string()),
            email: Set(email.to_string()),
            password_hash: Set(password_hash.to_string()),
            force_password_reset: Set(false),
            reset_token: Set(None),
            reset_token_expiration: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = users::Entity::insert(active).exec(&self.conn).await?;
        Ok(result.last_insert_id)
    }

    /// Store a new password hash. Also lifts a forced reset and drops any
    /// outstanding reset token.
    pub async fn update_password(&self, id: i32, new_hash: &str) -> Result<()> {
        let user = self.find_model(id).await?;

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(new_hash.to_string());
        active.force_password_reset = Set(false);
        active.reset_token = Set(None);
        active.reset_token_expiration = Set(None);
        active.updated_at = Set(Utc::now().to_rfc3339());
        active
            .update(&self.conn)
            .await
            .context("Failed to update password")?;

        Ok(())
    }

    pub async fn set_reset_token(
        &self,
        id: i32,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let user = self.find_model(id).await?;

        let mut active: users::ActiveModel = user.into();
        active.reset_token = Set(Some(token.to_string()));
        active.reset_token_expiration = Set(Some(expires_at.to_rfc3339()));
        active.updated_at = Set(Utc::now().to_rfc3339());
        active
            .update(&self.conn)
            .await
            .context("Failed to store reset token")?;

        Ok(())
    }

    pub async fn clear_reset_token(&self, id: i32) -> Result<()> {
        let user = self.find_model(id).await?;
        if user.reset_token.is_none() && user.reset_token_expiration.is_none() {
            return Ok(());
        }

        let mut active: users::ActiveModel = user.into();
        active.reset_token = Set(None);
        active.reset_token_expiration = Set(None);
        active.updated_at = Set(Utc::now().to_rfc3339());
        active
            .update(&self.conn)
            .await
            .context("Failed to clear reset token")?;

        Ok(())
    }

    /// Flag or unflag a user for a forced password reset.
    /// Returns false when no such user exists.
    pub async fn set_force_password_reset(&self, username: &str, flag: bool) -> Result<bool> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user for forced reset")?;

        let Some(user) = user else {
            return Ok(false);
        };

        let mut active: users::ActiveModel = user.into();
        active.force_password_reset = Set(flag);
        active.updated_at = Set(Utc::now().to_rfc3339());
        active
            .update(&self.conn)
            .await
            .context("Failed to update forced reset flag")?;

        Ok(true)
    }

    async fn find_model(&self, id: i32) -> Result<users::Model> {
        users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?
            .ok_or_else(|| anyhow::anyhow!("User not found: {id}"))
    }
}

/// Generate a random reset token (64 character hex string)
#[must_use]
pub fn generate_reset_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}
