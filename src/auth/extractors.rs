use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::debug;

use super::repo_types::User;
use crate::{error::AppError, session::Session, state::AppState};

/// The logged-in user behind the request's session. Rejects anonymous
/// requests with a redirect to the login page.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await?;
        let user_id = session.user_id().ok_or(AppError::Unauthenticated)?;

        match state.users.find_by_id(user_id).await? {
            Some(user) => Ok(CurrentUser(user)),
            None => {
                // account was deleted while the session was live
                debug!(user_id, "session refers to missing user");
                session.clear();
                Err(AppError::Unauthenticated)
            }
        }
    }
}
