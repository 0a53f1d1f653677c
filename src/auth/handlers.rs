use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, State},
    middleware,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use tracing::{info, instrument, warn};

use super::dto::CredentialsForm;
use super::services::{self, CredentialError};
use crate::{
    error::AppError,
    session::{csrf::csrf_guard, Session},
    state::AppState,
    views::models::{LoginPage, RegisterPage},
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/register", get(register_form))
        .route("/login", get(login_form))
        .route("/logout", get(logout))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/register", axum::routing::post(register))
        .route("/login", axum::routing::post(login))
        .route_layer(middleware::from_fn(csrf_guard))
}

fn render_register(
    state: &AppState,
    session: &Session,
    username: String,
    error: Option<String>,
) -> Result<Html<String>, AppError> {
    state.views.render(&RegisterPage {
        csrf_token: session.ensure_csrf_token(),
        username,
        error,
    })
}

fn render_login(
    state: &AppState,
    session: &Session,
    username: String,
    error: Option<String>,
) -> Result<Html<String>, AppError> {
    state.views.render(&LoginPage {
        csrf_token: session.ensure_csrf_token(),
        username,
        error,
    })
}

#[instrument(skip_all)]
pub async fn register_form(
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>, AppError> {
    render_register(&state, &session, String::new(), None)
}

#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, AppError> {
    match services::register(state.users.as_ref(), &form.username, &form.password).await {
        Ok(_) => Ok(Redirect::to("/login").into_response()),
        Err(CredentialError::Internal(e)) => Err(AppError::Internal(e)),
        Err(e) => Ok(render_register(&state, &session, form.username, Some(e.to_string()))?
            .into_response()),
    }
}

#[instrument(skip_all)]
pub async fn login_form(
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>, AppError> {
    render_login(&state, &session, String::new(), None)
}

#[instrument(skip_all, fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    session: Session,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, AppError> {
    let client = connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".into());
    if !state.login_throttle.check(&client) {
        warn!(%client, "login throttled");
        return Err(AppError::TooManyRequests);
    }

    match services::authenticate(state.users.as_ref(), &form.username, &form.password).await {
        Ok(user) => {
            session.log_in(user.id);
            info!(user_id = user.id, "user logged in");
            Ok(Redirect::to("/").into_response())
        }
        Err(CredentialError::Internal(e)) => Err(AppError::Internal(e)),
        Err(e) => {
            warn!(%client, reason = %e, "login failed");
            Ok(render_login(
                &state,
                &session,
                form.username,
                Some(CredentialError::InvalidCredentials.to_string()),
            )?
            .into_response())
        }
    }
}

#[instrument(skip_all)]
pub async fn logout(session: Session) -> Redirect {
    if let Some(user_id) = session.user_id() {
        info!(user_id, "user logged out");
    }
    session.clear();
    Redirect::to("/login")
}
