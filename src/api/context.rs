//! Per-request context: the session plus the lazily resolved current user.

use axum::{extract::FromRequestParts, http::StatusCode, http::request::Parts};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tower_sessions::Session;
use tracing::{error, warn};

use super::flash::{self, Flash};
use super::{ApiError, AppState};
use crate::db::User;

pub const USER_ID_KEY: &str = "user_id";
pub const FORCE_RESET_KEY: &str = "force_reset_user_id";

pub struct RequestContext {
    pub session: Session,
    state: Arc<AppState>,
    current_user: OnceCell<Option<User>>,
}

impl FromRequestParts<Arc<AppState>> for RequestContext {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await?;
        Ok(Self {
            session,
            state: Arc::clone(state),
            current_user: OnceCell::new(),
        })
    }
}

impl RequestContext {
    /// The logged-in user, looked up at most once per request.
    pub async fn current_user(&self) -> Option<&User> {
        self.current_user
            .get_or_init(|| self.resolve_user())
            .await
            .as_ref()
    }

    async fn resolve_user(&self) -> Option<User> {
        let user_id = match self.session.get::<i32>(USER_ID_KEY).await {
            Ok(Some(id)) => id,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read session: {e}");
                return None;
            }
        };

        match self.state.auth_service().current_user(user_id).await {
            Ok(Some(user)) => {
                tracing::Span::current().record("user_id", user.id);
                Some(user)
            }
            Ok(None) => {
                // The account behind this session no longer exists.
                if let Err(e) = self.session.remove::<i32>(USER_ID_KEY).await {
                    warn!("Failed to drop stale session user: {e}");
                }
                None
            }
            Err(e) => {
                error!("Database error fetching current user (ID: {user_id}): {e}");
                None
            }
        }
    }

    pub async fn log_in(&self, user: &User) -> Result<(), ApiError> {
        self.session.cycle_id().await?;
        self.session.insert(USER_ID_KEY, user.id).await?;
        Ok(())
    }

    pub async fn log_out(&self) -> Result<(), ApiError> {
        self.session.clear().await;
        self.session.cycle_id().await?;
        Ok(())
    }

    /// Drop any login and park the user on the forced reset page.
    pub async fn begin_forced_reset(&self, user: &User) -> Result<(), ApiError> {
        self.log_out().await?;
        self.session.insert(FORCE_RESET_KEY, user.id).await?;
        Ok(())
    }

    pub async fn forced_reset_user_id(&self) -> Option<i32> {
        self.session
            .get::<i32>(FORCE_RESET_KEY)
            .await
            .ok()
            .flatten()
    }

    pub async fn end_forced_reset(&self) -> Result<(), ApiError> {
        self.session.remove::<i32>(FORCE_RESET_KEY).await?;
        Ok(())
    }

    pub async fn notice(&self, message: impl Into<String>) -> Result<(), ApiError> {
        flash::push(&self.session, Flash::notice(message)).await?;
        Ok(())
    }

    pub async fn error(&self, message: impl Into<String>) -> Result<(), ApiError> {
        flash::push(&self.session, Flash::error(message)).await?;
        Ok(())
    }

    /// Queued flashes followed by messages for this render only.
    pub async fn flashes(&self, now: impl IntoIterator<Item = Flash>) -> Vec<Flash> {
        let mut flashes = flash::take(&self.session).await;
        flashes.extend(now);
        flashes
    }
}
