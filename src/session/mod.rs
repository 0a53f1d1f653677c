//! Server-side sessions carried by a signed cookie.
//!
//! [`session_layer`] resolves the cookie to a [`Session`] before the handler
//! runs and writes it back afterwards, refreshing the expiry on every request
//! (sliding window).

pub mod cookie;
pub mod csrf;
pub mod store;

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use parking_lot::Mutex;
use time::{Duration, OffsetDateTime};
use tracing::{debug, error};
use uuid::Uuid;

use crate::error::{internal_response, AppError};
use crate::state::AppState;
pub use store::{SessionData, SessionStore};

#[derive(Debug, Default)]
struct Inner {
    /// Id of the session the request arrived with, if it was live.
    id: Option<Uuid>,
    data: SessionData,
    changed: bool,
    rotate: bool,
    destroyed: bool,
}

/// Per-request handle on the current session. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct Session {
    inner: Arc<Mutex<Inner>>,
}

impl Session {
    fn resume(id: Uuid, data: SessionData) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                id: Some(id),
                data,
                ..Inner::default()
            })),
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        self.inner.lock().data.user_id
    }

    /// Marks the session as logged in and issues a fresh session id.
    pub fn log_in(&self, user_id: i64) {
        let mut inner = self.inner.lock();
        inner.data.user_id = Some(user_id);
        inner.changed = true;
        inner.rotate = true;
    }

    pub fn csrf_token(&self) -> Option<String> {
        self.inner.lock().data.csrf_token.clone()
    }

    /// Returns the session's anti-forgery token, minting one if absent.
    pub fn ensure_csrf_token(&self) -> String {
        let mut inner = self.inner.lock();
        if let Some(token) = &inner.data.csrf_token {
            return token.clone();
        }
        let token = csrf::mint_token();
        inner.data.csrf_token = Some(token.clone());
        inner.changed = true;
        token
    }

    /// Forgets everything; the cookie is expired on the way out.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.data = SessionData::default();
        inner.destroyed = true;
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Session {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("session layer not installed")))
    }
}

/// Takes only the headers so the future stays `Send` (`Body` is not `Sync`).
async fn resolve(state: &AppState, headers: &HeaderMap) -> anyhow::Result<Session> {
    let cfg = &state.config.session;
    let Some(raw) = cookie::read(headers, &cfg.cookie_name) else {
        return Ok(Session::default());
    };
    let Some(id) = cookie::verify(cfg.secret.as_bytes(), raw).and_then(|v| Uuid::parse_str(v).ok())
    else {
        debug!("ignoring session cookie with bad signature");
        return Ok(Session::default());
    };
    Ok(match state.sessions.load(id).await? {
        Some(data) => Session::resume(id, data),
        None => Session::default(),
    })
}

pub async fn session_layer(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let session = match resolve(&state, req.headers()).await {
        Ok(s) => s,
        Err(e) => {
            error!(error = ?e, "session load failed");
            return internal_response();
        }
    };
    req.extensions_mut().insert(session.clone());

    let mut res = next.run(req).await;

    match persist(&state, &session).await {
        Ok(Some(value)) => {
            res.headers_mut().append(header::SET_COOKIE, value);
            res
        }
        Ok(None) => res,
        Err(e) => {
            error!(error = ?e, "session save failed");
            internal_response()
        }
    }
}

/// Writes the session back and returns the `Set-Cookie` value to send, if any.
async fn persist(
    state: &AppState,
    session: &Session,
) -> anyhow::Result<Option<axum::http::HeaderValue>> {
    let cfg = &state.config.session;
    let (old_id, data, changed, rotate, destroyed) = {
        let inner = session.inner.lock();
        (inner.id, inner.data.clone(), inner.changed, inner.rotate, inner.destroyed)
    };

    if destroyed {
        if let Some(id) = old_id {
            state.sessions.delete(id).await?;
        }
        return Ok(cookie::expire_cookie(cfg));
    }
    if old_id.is_none() && (!changed || data.is_empty()) {
        return Ok(None);
    }

    let id = match old_id {
        Some(id) if !rotate => id,
        Some(id) => {
            state.sessions.delete(id).await?;
            Uuid::new_v4()
        }
        None => Uuid::new_v4(),
    };
    let expires_at = OffsetDateTime::now_utc() + Duration::seconds(cfg.ttl_seconds);
    state.sessions.save(id, &data, expires_at).await?;

    let signed = cookie::sign(cfg.secret.as_bytes(), &id.to_string())?;
    Ok(cookie::set_cookie(cfg, &signed))
}
