use axum::{
    extract::{Path, State},
    middleware,
    response::{Html, Redirect},
    routing::{get, post},
    Form, Router,
};
use tracing::{info, instrument};

use super::dto::CreateTicketForm;
use crate::{
    auth::extractors::CurrentUser,
    authz::{self, Action, Resource},
    error::AppError,
    session::{csrf::csrf_guard, Session},
    state::AppState,
    views::models::{Nav, SupportPage, TicketPage},
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/support", get(support_page))
        .route("/support/:id", get(view_own_ticket))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/support", post(submit_ticket))
        .route_layer(middleware::from_fn(csrf_guard))
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn support_page(
    State(state): State<AppState>,
    session: Session,
    CurrentUser(user): CurrentUser,
) -> Result<Html<String>, AppError> {
    let tickets = state.tickets.list_by_user(user.id).await?;
    state.views.render(&SupportPage {
        nav: Nav::from(&user),
        csrf_token: session.ensure_csrf_token(),
        tickets: tickets.into_iter().map(Into::into).collect(),
    })
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn submit_ticket(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<CreateTicketForm>,
) -> Result<Redirect, AppError> {
    let title = form.title.trim();
    let description = form.description.trim();
    if title.is_empty() || description.is_empty() {
        return Err(AppError::BadRequest("title and description are required".into()));
    }
    authz::ensure(
        Some(user.identity()),
        Resource::Ticket { owner_id: user.id },
        Action::CreateOwn,
        "Ticket",
    )?;

    let ticket = state.tickets.create(user.id, title, description).await?;
    info!(ticket_id = ticket.id, "support ticket submitted");
    Ok(Redirect::to("/support"))
}

#[instrument(skip(state, session, user), fields(user_id = user.id))]
pub async fn view_own_ticket(
    State(state): State<AppState>,
    session: Session,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Html<String>, AppError> {
    let ticket = state.tickets.find(id).await?.ok_or(AppError::NotFound("Ticket"))?;
    authz::ensure(
        Some(user.identity()),
        Resource::Ticket { owner_id: ticket.user_id },
        Action::ViewOwn,
        "Ticket",
    )?;

    let messages = state.tickets.messages(ticket.id).await?;
    state.views.render(&TicketPage {
        nav: Nav::from(&user),
        csrf_token: session.ensure_csrf_token(),
        ticket: ticket.into(),
        messages: messages.into_iter().map(Into::into).collect(),
        statuses: Vec::new(),
    })
}
