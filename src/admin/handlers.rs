use axum::{
    extract::{Path, Query, State},
    middleware,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use tracing::{info, instrument, warn};

use super::dto::{DashboardQuery, EditTodoForm, EditUserForm, ReplyForm};
use crate::{
    auth::{extractors::CurrentUser, repo_types::User, services::is_valid_username},
    authz::{self, Action, Resource},
    db::RepoError,
    error::AppError,
    session::{csrf::csrf_guard, Session},
    state::AppState,
    support::repo_types::{TicketStatus, UnknownStatus},
    views::models::{
        status_options, AdminPage, AdminTodoEditPage, AdminUserEditPage, Nav, TicketPage,
        TicketView, TodoView, UserView,
    },
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/admin", get(dashboard))
        .route("/admin/users/edit/:id", get(edit_user_form))
        .route("/admin/todos/edit/:id", get(edit_todo_form))
        .route("/admin/support/:id", get(view_ticket))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users/edit/:id", post(update_user))
        .route("/admin/users/delete/:id", get(delete_user))
        .route("/admin/todos/edit/:id", post(update_todo))
        .route("/admin/todos/delete/:id", get(delete_todo))
        .route("/admin/support/:id/reply", post(reply_ticket))
        .route("/admin/support/:id/delete", get(delete_ticket))
        .route_layer(middleware::from_fn(csrf_guard))
}

fn require_admin(user: &User, resource: Resource, action: Action, what: &'static str) -> Result<(), AppError> {
    authz::ensure(Some(user.identity()), resource, action, what).inspect_err(|_| {
        warn!(user_id = user.id, ?action, "non-admin hit admin route");
    })
}

fn matches(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(needle)
}

#[instrument(skip(state, session, user), fields(user_id = user.id))]
pub async fn dashboard(
    State(state): State<AppState>,
    session: Session,
    CurrentUser(user): CurrentUser,
    Query(query): Query<DashboardQuery>,
) -> Result<Html<String>, AppError> {
    require_admin(&user, Resource::Site, Action::AdminView, "Page")?;

    let q = query.q.trim().to_lowercase();
    let users = state.users.list().await?;
    let todos = state.todos.list_all().await?;
    let tickets = state.tickets.list_all().await?;

    state.views.render(&AdminPage {
        nav: Nav::from(&user),
        csrf_token: session.ensure_csrf_token(),
        users: users
            .into_iter()
            .filter(|u| matches(&u.username, &q))
            .map(UserView::from)
            .collect(),
        todos: todos
            .into_iter()
            .filter(|t| matches(&t.title, &q))
            .map(TodoView::from)
            .collect(),
        tickets: tickets
            .into_iter()
            .filter(|t| matches(&t.title, &q) || matches(&t.username, &q))
            .map(TicketView::from)
            .collect(),
        q: query.q,
    })
}

#[instrument(skip(state, session, user), fields(user_id = user.id))]
pub async fn edit_user_form(
    State(state): State<AppState>,
    session: Session,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Html<String>, AppError> {
    require_admin(&user, Resource::User { id }, Action::AdminEdit, "User")?;
    let target = state.users.find_by_id(id).await?.ok_or(AppError::NotFound("User"))?;

    state.views.render(&AdminUserEditPage {
        nav: Nav::from(&user),
        csrf_token: session.ensure_csrf_token(),
        user: target.into(),
        error: None,
    })
}

#[instrument(skip(state, session, user, form), fields(user_id = user.id))]
pub async fn update_user(
    State(state): State<AppState>,
    session: Session,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Form(form): Form<EditUserForm>,
) -> Result<Response, AppError> {
    require_admin(&user, Resource::User { id }, Action::AdminEdit, "User")?;
    let target = state.users.find_by_id(id).await?.ok_or(AppError::NotFound("User"))?;

    let username = form.username.trim();
    let error = if !is_valid_username(username) {
        Some("Username must be 3-32 characters: letters, digits, '_', '.', '-'")
    } else {
        match state.users.update(id, username, form.is_admin).await {
            Ok(Some(updated)) => {
                info!(target_id = updated.id, is_admin = updated.is_admin, "user updated");
                return Ok(Redirect::to("/admin").into_response());
            }
            Ok(None) => return Err(AppError::NotFound("User")),
            Err(RepoError::Conflict) => Some("Username already exists"),
            Err(RepoError::Other(e)) => return Err(e.into()),
        }
    };

    let page = AdminUserEditPage {
        nav: Nav::from(&user),
        csrf_token: session.ensure_csrf_token(),
        user: UserView {
            username: username.to_owned(),
            ..UserView::from(target)
        },
        error: error.map(str::to_owned),
    };
    Ok(state.views.render(&page)?.into_response())
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Redirect, AppError> {
    require_admin(&user, Resource::User { id }, Action::AdminDelete, "User")?;
    if id == user.id {
        return Err(AppError::BadRequest("admins cannot delete their own account".into()));
    }
    if !state.users.delete_cascade(id).await? {
        return Err(AppError::NotFound("User"));
    }
    info!(target_id = id, "user deleted with all owned records");
    Ok(Redirect::to("/admin"))
}

#[instrument(skip(state, session, user), fields(user_id = user.id))]
pub async fn edit_todo_form(
    State(state): State<AppState>,
    session: Session,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Html<String>, AppError> {
    require_admin(&user, Resource::Site, Action::AdminEdit, "Todo")?;
    let todo = state.todos.find(id).await?.ok_or(AppError::NotFound("Todo"))?;

    state.views.render(&AdminTodoEditPage {
        nav: Nav::from(&user),
        csrf_token: session.ensure_csrf_token(),
        todo: todo.into(),
    })
}

#[instrument(skip(state, user, form), fields(user_id = user.id))]
pub async fn update_todo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Form(form): Form<EditTodoForm>,
) -> Result<Redirect, AppError> {
    require_admin(&user, Resource::Site, Action::AdminEdit, "Todo")?;
    let title = form.title.trim();
    if title.is_empty() {
        return Err(AppError::BadRequest("title is required".into()));
    }

    state
        .todos
        .update(id, title, form.description.trim(), form.completed)
        .await?
        .ok_or(AppError::NotFound("Todo"))?;
    info!(todo_id = id, "todo updated by admin");
    Ok(Redirect::to("/admin"))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn delete_todo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Redirect, AppError> {
    require_admin(&user, Resource::Site, Action::AdminDelete, "Todo")?;
    if !state.todos.delete(id).await? {
        return Err(AppError::NotFound("Todo"));
    }
    info!(todo_id = id, "todo deleted by admin");
    Ok(Redirect::to("/admin"))
}

#[instrument(skip(state, session, user), fields(user_id = user.id))]
pub async fn view_ticket(
    State(state): State<AppState>,
    session: Session,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Html<String>, AppError> {
    require_admin(&user, Resource::Site, Action::AdminView, "Ticket")?;
    let ticket = state.tickets.find(id).await?.ok_or(AppError::NotFound("Ticket"))?;
    let messages = state.tickets.messages(id).await?;
    let owner = state.users.find_by_id(ticket.user_id).await?;

    let status = ticket.status;
    let mut view = TicketView::from(ticket);
    view.username = owner.map(|u| u.username);

    state.views.render(&TicketPage {
        nav: Nav::from(&user),
        csrf_token: session.ensure_csrf_token(),
        ticket: view,
        messages: messages.into_iter().map(Into::into).collect(),
        statuses: status_options(status),
    })
}

#[instrument(skip(state, user, form), fields(user_id = user.id))]
pub async fn reply_ticket(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Form(form): Form<ReplyForm>,
) -> Result<Redirect, AppError> {
    require_admin(&user, Resource::Site, Action::AdminReply, "Ticket")?;
    let status: TicketStatus = form
        .status
        .parse()
        .map_err(|e: UnknownStatus| AppError::BadRequest(e.to_string()))?;
    let message = form.message.trim();
    if message.is_empty() {
        return Err(AppError::BadRequest("message is required".into()));
    }

    if !state.tickets.reply(id, user.id, message, status).await? {
        return Err(AppError::NotFound("Ticket"));
    }
    info!(ticket_id = id, %status, "admin replied to ticket");
    Ok(Redirect::to(&format!("/admin/support/{id}")))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn delete_ticket(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Redirect, AppError> {
    require_admin(&user, Resource::Site, Action::AdminDelete, "Ticket")?;
    if !state.tickets.delete(id).await? {
        return Err(AppError::NotFound("Ticket"));
    }
    info!(ticket_id = id, "ticket deleted by admin");
    Ok(Redirect::to("/admin"))
}
