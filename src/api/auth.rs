use axum::{
    Extension, Form,
    extract::{Query, Request, State},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::{Expiry, Session};

use super::flash::{self, Flash};
use super::observability::note_user;
use super::forms::{
    EditUserForm, EmailForm, FormErrors, LoginForm, RegistrationForm, ResetPasswordForm,
};
use super::{ApiError, AppState};
use crate::db::{ResetToken, User};
use crate::services::{ActivationOutcome, AuthError, ResendOutcome};
use crate::views::{self, PageContext};

const USER_KEY: &str = "user_id";

/// The logged-in user, placed in request extensions by [`require_login`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// A reset token that passed [`reset_token_required`].
#[derive(Debug, Clone)]
pub struct ValidResetToken(pub ResetToken);

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

impl NextQuery {
    /// `next` when it points back into this site.
    #[must_use]
    pub fn local(&self) -> Option<&str> {
        safe_next(self.next.as_deref())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ActivateQuery {
    pub userid: Option<String>,
    pub activate_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetQuery {
    pub userid: Option<String>,
    pub token: Option<String>,
}

// ============================================================================
// Session helpers
// ============================================================================

/// Only same-site absolute paths; anything else could send the user away.
fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| {
        n.starts_with('/')
            && !n.starts_with("//")
            && !n.contains('\\')
            && !n.chars().any(char::is_control)
    })
}

fn parse_user_id(value: Option<&str>) -> Option<i32> {
    value.and_then(|v| v.trim().parse().ok())
}

/// Looks up the user stored in the session, dropping stale ids.
pub async fn session_user(state: &AppState, session: &Session) -> Result<Option<User>, ApiError> {
    let Some(user_id) = session.get::<i32>(USER_KEY).await? else {
        return Ok(None);
    };

    let user = state.auth_service.get_user(user_id).await?;
    if user.is_none() {
        session.remove::<i32>(USER_KEY).await?;
    }

    Ok(user)
}

/// Layout context with the pending flashes consumed.
pub async fn page_context(session: &Session, user: Option<User>) -> Result<PageContext, ApiError> {
    Ok(PageContext::new(user, flash::take(session).await?))
}

async fn session_context(state: &AppState, session: &Session) -> Result<PageContext, ApiError> {
    let user = session_user(state, session).await?;
    page_context(session, user).await
}

async fn start_session(
    state: &AppState,
    session: &Session,
    user_id: i32,
    remember: bool,
) -> Result<(), ApiError> {
    session.cycle_id().await?;
    session.insert(USER_KEY, user_id).await?;

    if remember {
        session.set_expiry(Some(Expiry::OnInactivity(time::Duration::days(
            state.config.server.remember_me_days,
        ))));
    }

    Ok(())
}

// ============================================================================
// Middleware
// ============================================================================

/// Lets the request through only with a logged-in user; otherwise redirects
/// to the login page, remembering where the user wanted to go.
pub async fn require_login(
    State(state): State<Arc<AppState>>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(user) = session_user(&state, &session).await? {
        let user_id = user.id;
        request.extensions_mut().insert(CurrentUser(user));
        let mut response = next.run(request).await;
        note_user(&mut response, user_id);
        return Ok(response);
    }

    let target = request
        .uri()
        .path_and_query()
        .map_or("/", axum::http::uri::PathAndQuery::as_str);
    let login = format!("/login?next={}", urlencoding::encode(target));

    flash::redirect(
        &session,
        Flash::info("Please log in to access this page."),
        &login,
    )
    .await
}

/// Checks `userid` + `token` before the reset views run.
pub async fn reset_token_required(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ResetQuery>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let (Some(user_id), Some(token)) = (
        parse_user_id(query.userid.as_deref()),
        query.token.as_deref(),
    ) {
        match state.auth_service.check_reset_token(user_id, token).await {
            Ok(token) => {
                request.extensions_mut().insert(ValidResetToken(token));
                return Ok(next.run(request).await);
            }
            Err(AuthError::InvalidResetToken) => {}
            Err(e) => return Err(e.into()),
        }
    }

    flash::redirect(
        &session,
        Flash::warning(AuthError::InvalidResetToken.to_string()),
        "/",
    )
    .await
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /activate
pub async fn activate(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ActivateQuery>,
    session: Session,
) -> Result<Response, ApiError> {
    let outcome = state
        .auth_service
        .activate(
            parse_user_id(query.userid.as_deref()),
            query.activate_token.as_deref(),
        )
        .await;

    let flash = match outcome {
        Ok(ActivationOutcome::AlreadyVerified) => {
            Flash::info("Your account is already verified.")
        }
        Ok(ActivationOutcome::Activated) => Flash::info(
            "Thank you for verifying your email. Your account is now activated",
        ),
        Err(AuthError::InvalidActivation) => Flash::warning("Invalid userid/token combination"),
        Err(e) => return Err(e.into()),
    };

    flash::redirect(&session, flash, "/").await
}

/// GET /forgot_password
pub async fn forgot_password_page(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Html<String>, ApiError> {
    let ctx = session_context(&state, &session).await?;
    Ok(Html(views::auth::forgot_password_page(
        &ctx,
        &EmailForm::default(),
        &FormErrors::default(),
    )))
}

/// POST /forgot_password
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    session: Session,
    Form(form): Form<EmailForm>,
) -> Result<Response, ApiError> {
    let errors = match form.validate() {
        Ok(()) => match state.auth_service.request_password_reset(&form.email).await {
            Ok(user) => {
                return flash::redirect(
                    &session,
                    Flash::info(format!(
                        "Password reset instructions have been sent to {}. Please check your inbox",
                        user.email
                    )),
                    "/",
                )
                .await;
            }
            Err(AuthError::UserNotFound) => {
                flash::push(
                    &session,
                    Flash::warning("We couldn't find an account with that email. Please try again"),
                )
                .await?;
                FormErrors::default()
            }
            Err(e) => return Err(e.into()),
        },
        Err(errors) => errors,
    };

    let ctx = session_context(&state, &session).await?;
    Ok(Html(views::auth::forgot_password_page(&ctx, &form, &errors)).into_response())
}

/// GET /login
pub async fn login_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NextQuery>,
    session: Session,
) -> Result<Html<String>, ApiError> {
    let ctx = session_context(&state, &session).await?;
    Ok(Html(views::auth::login_page(
        &ctx,
        &LoginForm::default(),
        &FormErrors::default(),
        query.local(),
    )))
}

/// POST /login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NextQuery>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    let errors = match form.validate() {
        Ok(()) => match state.auth_service.login(&form.email, &form.password).await {
            Ok(user) => {
                start_session(&state, &session, user.id, form.remember()).await?;
                tracing::info!(user_id = user.id, "User logged in");
                let mut response = flash::redirect(
                    &session,
                    Flash::info("Logged in successfully"),
                    query.local().unwrap_or("/"),
                )
                .await?;
                note_user(&mut response, user.id);
                return Ok(response);
            }
            Err(AuthError::InvalidCredentials) => {
                flash::push(&session, Flash::danger(AuthError::InvalidCredentials.to_string()))
                    .await?;
                FormErrors::default()
            }
            Err(e) => return Err(e.into()),
        },
        Err(errors) => errors,
    };

    let ctx = session_context(&state, &session).await?;
    Ok(Html(views::auth::login_page(&ctx, &form, &errors, query.local())).into_response())
}

/// GET /logout
pub async fn logout(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    session: Session,
) -> Result<Response, ApiError> {
    session.remove::<i32>(USER_KEY).await?;
    session.set_expiry(None);
    session.cycle_id().await?;
    tracing::info!(user_id = user.id, "User logged out");

    flash::redirect(&session, Flash::info("Logged out successfully"), "/").await
}

/// GET /register
pub async fn register_page(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Html<String>, ApiError> {
    let ctx = session_context(&state, &session).await?;
    Ok(Html(views::auth::register_page(
        &ctx,
        &RegistrationForm::default(),
        &FormErrors::default(),
    )))
}

/// POST /register
pub async fn register(
    State(state): State<Arc<AppState>>,
    session: Session,
    Form(form): Form<RegistrationForm>,
) -> Result<Response, ApiError> {
    let errors = match form.validate(state.config.security.min_password_length) {
        Ok(new_user) => match state.auth_service.register(new_user).await {
            Ok(user) => {
                start_session(&state, &session, user.id, false).await?;
                let mut response = flash::redirect(
                    &session,
                    Flash::info(format!(
                        "Thanks for signing up {}. Welcome!",
                        user.username
                    )),
                    "/",
                )
                .await?;
                note_user(&mut response, user.id);
                return Ok(response);
            }
            Err(e @ (AuthError::UsernameTaken | AuthError::EmailTaken)) => {
                flash::push(&session, Flash::warning(e.to_string())).await?;
                FormErrors::default()
            }
            Err(AuthError::Validation(msg)) => {
                let mut errors = FormErrors::default();
                errors.add("password", msg);
                errors
            }
            Err(e) => return Err(e.into()),
        },
        Err(errors) => errors,
    };

    let ctx = session_context(&state, &session).await?;
    Ok(Html(views::auth::register_page(&ctx, &form, &errors)).into_response())
}

/// GET /resend_activation_email
pub async fn resend_activation_email(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    session: Session,
) -> Result<Response, ApiError> {
    let flash = match state.auth_service.resend_activation(user.id).await? {
        ResendOutcome::AlreadyVerified => {
            Flash::warning("This account has already been activated.")
        }
        ResendOutcome::Sent => Flash::info("Activation email sent! Please check your inbox"),
    };

    flash::redirect(&session, flash, "/").await
}

/// GET /reset_password
pub async fn reset_password_page(
    State(state): State<Arc<AppState>>,
    Extension(ValidResetToken(token)): Extension<ValidResetToken>,
    session: Session,
) -> Result<Html<String>, ApiError> {
    let ctx = session_context(&state, &session).await?;
    Ok(Html(views::auth::reset_password_page(
        &ctx,
        token.user_id,
        &token.value,
        &FormErrors::default(),
    )))
}

/// POST /reset_password
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Extension(ValidResetToken(token)): Extension<ValidResetToken>,
    session: Session,
    Form(form): Form<ResetPasswordForm>,
) -> Result<Response, ApiError> {
    let errors = match form.validate(state.config.security.min_password_length) {
        Ok(()) => match state
            .auth_service
            .reset_password(&token, &form.password)
            .await
        {
            Ok(()) => {
                return flash::redirect(
                    &session,
                    Flash::info("Password updated! Please log in to your account"),
                    "/",
                )
                .await;
            }
            Err(e @ AuthError::InvalidResetToken) => {
                return flash::redirect(&session, Flash::warning(e.to_string()), "/").await;
            }
            Err(AuthError::Validation(msg)) => {
                let mut errors = FormErrors::default();
                errors.add("password", msg);
                errors
            }
            Err(e) => return Err(e.into()),
        },
        Err(errors) => errors,
    };

    let ctx = session_context(&state, &session).await?;
    Ok(Html(views::auth::reset_password_page(
        &ctx,
        token.user_id,
        &token.value,
        &errors,
    ))
    .into_response())
}

/// GET /account
pub async fn account_page(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<NextQuery>,
    session: Session,
) -> Result<Html<String>, ApiError> {
    let data = EditUserForm::from_user(&user);
    let ctx = page_context(&session, Some(user)).await?;
    Ok(Html(views::auth::account_page(
        &ctx,
        &data,
        &FormErrors::default(),
        query.local(),
    )))
}

/// POST /account
pub async fn account(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<NextQuery>,
    session: Session,
    Form(form): Form<EditUserForm>,
) -> Result<Response, ApiError> {
    let errors = match form.validate() {
        Ok(update) => match state.auth_service.update_account(user.id, update).await {
            Ok(_) => {
                return flash::redirect(
                    &session,
                    Flash::info("Saved successfully"),
                    query.local().unwrap_or("/"),
                )
                .await;
            }
            Err(AuthError::UsernameTaken) => {
                flash::push(&session, Flash::warning("Username is not allowed use another"))
                    .await?;
                FormErrors::default()
            }
            Err(AuthError::EmailTaken) => {
                flash::push(&session, Flash::warning("Email is used use another email")).await?;
                FormErrors::default()
            }
            Err(e) => return Err(e.into()),
        },
        Err(errors) => errors,
    };

    let ctx = page_context(&session, Some(user)).await?;
    Ok(Html(views::auth::account_page(&ctx, &form, &errors, query.local())).into_response())
}
