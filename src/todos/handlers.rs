use axum::{
    extract::{Path, State},
    middleware,
    response::{Html, Redirect},
    routing::{get, post},
    Form, Router,
};
use tracing::{info, instrument};

use super::dto::CreateTodoForm;
use crate::{
    auth::extractors::CurrentUser,
    authz::{self, Action, Resource},
    error::AppError,
    session::{csrf::csrf_guard, Session},
    state::AppState,
    views::models::{Nav, TodosPage},
};

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/", get(list_todos))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/todos", post(create_todo))
        .route("/complete/:id", get(complete_todo))
        .route("/delete/:id", get(delete_todo))
        .route_layer(middleware::from_fn(csrf_guard))
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn list_todos(
    State(state): State<AppState>,
    session: Session,
    CurrentUser(user): CurrentUser,
) -> Result<Html<String>, AppError> {
    let todos = state.todos.list_by_owner(user.id).await?;
    state.views.render(&TodosPage {
        nav: Nav::from(&user),
        csrf_token: session.ensure_csrf_token(),
        todos: todos.into_iter().map(Into::into).collect(),
    })
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn create_todo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<CreateTodoForm>,
) -> Result<Redirect, AppError> {
    let title = form.title.trim();
    if title.is_empty() {
        return Err(AppError::BadRequest("title is required".into()));
    }
    authz::ensure(
        Some(user.identity()),
        Resource::Todo { owner_id: user.id },
        Action::CreateOwn,
        "Todo",
    )?;

    let todo = state
        .todos
        .create(user.id, title, form.description.trim())
        .await?;
    info!(todo_id = todo.id, "todo created");
    Ok(Redirect::to("/"))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn complete_todo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Redirect, AppError> {
    let todo = state.todos.find(id).await?.ok_or(AppError::NotFound("Todo"))?;
    authz::ensure(
        Some(user.identity()),
        Resource::Todo { owner_id: todo.owner_id },
        Action::EditOwn,
        "Todo",
    )?;

    state.todos.set_completed(todo.id, true).await?;
    Ok(Redirect::to("/"))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn delete_todo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Redirect, AppError> {
    let todo = state.todos.find(id).await?.ok_or(AppError::NotFound("Todo"))?;
    authz::ensure(
        Some(user.identity()),
        Resource::Todo { owner_id: todo.owner_id },
        Action::DeleteOwn,
        "Todo",
    )?;

    state.todos.delete(todo.id).await?;
    info!(todo_id = todo.id, "todo deleted");
    Ok(Redirect::to("/"))
}
