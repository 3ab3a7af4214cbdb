use axum::{
    Form,
    extract::{Query, Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use super::context::{FORCE_RESET_KEY, RequestContext};
use super::flash::Flash;
use super::views::{self, Layout};
use super::{ApiError, AppState};
use crate::services::{AuthError, Registration};

// ============================================================================
// Forms
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password2: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetQuery {
    pub token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetForm {
    pub token: Option<String>,
    pub password: Option<String>,
    pub password2: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RequestResetForm {
    pub email: Option<String>,
}

const RESET_REQUESTED: &str =
    "If an account with that email exists, a password reset link has been sent.";
const PASSWORD_UPDATED: &str = "Your password has been updated. Please log in.";

fn log_auth_failure(action: &str, err: &AuthError) {
    if err.is_internal() {
        tracing::error!("{action} failed: {err}");
    }
}

// ============================================================================
// Middleware
// ============================================================================

fn reachable_during_forced_reset(path: &str) -> bool {
    matches!(path, "/reset_password" | "/api/logout" | "/health" | "/metrics")
        || path.starts_with("/static/")
}

/// Keeps a user with a pending forced reset on the reset page.
pub async fn force_reset_guard(session: Session, request: Request, next: Next) -> Response {
    if reachable_during_forced_reset(request.uri().path()) {
        return next.run(request).await;
    }

    match session.get::<i32>(FORCE_RESET_KEY).await {
        Ok(Some(_)) => Redirect::to("/reset_password").into_response(),
        _ => next.run(request).await,
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn login(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    let username = form.username.unwrap_or_default();
    let password = form.password.unwrap_or_default();

    match state.auth_service().login(&username, &password).await {
        Ok(user) if user.force_password_reset => {
            tracing::info!(user_id = user.id, "Login requires a password reset");
            ctx.begin_forced_reset(&user).await?;
            Ok(Redirect::to("/reset_password").into_response())
        }
        Ok(user) => {
            ctx.log_in(&user).await?;
            tracing::info!(user_id = user.id, "User logged in");
            ctx.notice("You were successfully logged in.").await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(e) => {
            log_auth_failure("Login", &e);
            let flashes = ctx.flashes([Flash::error(e.user_message())]).await;
            let layout = Layout {
                title: "Log in",
                user: ctx.current_user().await,
                flashes: &flashes,
            };
            Ok(views::login(&layout, &username).into_response())
        }
    }
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Form(form): Form<RegisterForm>,
) -> Result<Response, ApiError> {
    if ctx.current_user().await.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let registration = Registration {
        username: form.username,
        email: form.email,
        password: form.password,
        password2: form.password2,
    };

    match state.auth_service().register(&registration).await {
        Ok(user) => {
            ctx.log_in(&user).await?;
            ctx.notice("You were successfully registered and are now logged in.")
                .await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(e) => {
            log_auth_failure("Registration", &e);
            let flashes = ctx.flashes([Flash::error(e.user_message())]).await;
            let layout = Layout {
                title: "Register",
                user: None,
                flashes: &flashes,
            };
            Ok(views::register(
                &layout,
                registration.username.as_deref().unwrap_or_default(),
                registration.email.as_deref().unwrap_or_default(),
            )
            .into_response())
        }
    }
}

pub async fn logout(ctx: RequestContext) -> Result<Redirect, ApiError> {
    ctx.log_out().await?;
    ctx.notice("You were logged out.").await?;
    Ok(Redirect::to("/"))
}

pub async fn reset_password_page(
    ctx: RequestContext,
    Query(query): Query<ResetQuery>,
) -> Response {
    let forced = ctx.forced_reset_user_id().await.is_some();
    let flashes = ctx.flashes([]).await;
    let layout = Layout {
        title: "Reset password",
        user: if forced { None } else { ctx.current_user().await },
        flashes: &flashes,
    };

    if forced {
        return views::reset_password(&layout, None).into_response();
    }

    match query.token.as_deref().map(str::trim) {
        Some(token) if !token.is_empty() => {
            views::reset_password(&layout, Some(token)).into_response()
        }
        _ => views::request_reset(&layout).into_response(),
    }
}

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Form(form): Form<ResetForm>,
) -> Result<Redirect, ApiError> {
    let password = form.password.unwrap_or_default();
    let password2 = form.password2.unwrap_or_default();
    let auth = state.auth_service();

    if let Some(user_id) = ctx.forced_reset_user_id().await {
        return match auth
            .complete_forced_reset(user_id, &password, &password2)
            .await
        {
            Ok(()) => {
                ctx.end_forced_reset().await?;
                ctx.notice(PASSWORD_UPDATED).await?;
                Ok(Redirect::to("/login"))
            }
            Err(e) => {
                log_auth_failure("Forced password reset", &e);
                ctx.error(e.user_message()).await?;
                Ok(Redirect::to("/reset_password"))
            }
        };
    }

    let token = form.token.unwrap_or_default();
    match auth
        .reset_password_with_token(&token, &password, &password2)
        .await
    {
        Ok(_) => {
            ctx.notice(PASSWORD_UPDATED).await?;
            Ok(Redirect::to("/login"))
        }
        Err(e) => {
            log_auth_failure("Password reset", &e);
            ctx.error(e.user_message()).await?;
            if token.trim().is_empty() {
                return Ok(Redirect::to("/reset_password"));
            }
            let encoded: String = url::form_urlencoded::byte_serialize(token.as_bytes()).collect();
            Ok(Redirect::to(&format!("/reset_password?token={encoded}")))
        }
    }
}

pub async fn request_reset_password(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Form(form): Form<RequestResetForm>,
) -> Result<Redirect, ApiError> {
    let email = form.email.unwrap_or_default();

    match state.auth_service().request_password_reset(&email).await {
        Ok(token) => {
            // No mail transport; the link is only visible in debug logs.
            if let Some(token) = token {
                tracing::debug!("Password reset link: /reset_password?token={token}");
            }
            ctx.notice(RESET_REQUESTED).await?;
            Ok(Redirect::to("/login"))
        }
        Err(e) => {
            log_auth_failure("Password reset request", &e);
            ctx.error(e.user_message()).await?;
            Ok(Redirect::to("/reset_password"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_open_during_forced_reset() {
        assert!(reachable_during_forced_reset("/reset_password"));
        assert!(reachable_during_forced_reset("/api/logout"));
        assert!(reachable_during_forced_reset("/static/style.css"));
        assert!(reachable_during_forced_reset("/health"));
        assert!(reachable_during_forced_reset("/metrics"));

        assert!(!reachable_during_forced_reset("/"));
        assert!(!reachable_during_forced_reset("/api/search"));
        assert!(!reachable_during_forced_reset("/login"));
        assert!(!reachable_during_forced_reset("/static"));
    }
}
