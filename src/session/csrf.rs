//! Anti-forgery tokens.
//!
//! A token is minted once per session (see [`Session::ensure_csrf_token`]) and
//! must come back with every state-changing request: as the `csrf_token` form
//! field on POST, or as the `csrf_token` query parameter on the few GET links
//! that mutate. [`csrf_guard`] is installed as a route layer on those routes,
//! so it runs before identity resolution and the authorization gate.

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::Method,
    middleware::Next,
    response::Response,
};
use rand::RngCore;
use serde::Deserialize;
use subtle::ConstantTimeEq;
use tracing::warn;

use super::Session;
use crate::error::AppError;

const TOKEN_BYTES: usize = 16;
/// Same ceiling axum's `Form` extractor applies by default.
const MAX_FORM_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Default, Deserialize)]
struct TokenField {
    #[serde(default)]
    csrf_token: Option<String>,
}

pub fn mint_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Constant-time comparison; a missing side never matches.
pub fn tokens_match(expected: Option<&str>, submitted: Option<&str>) -> bool {
    match (expected, submitted) {
        (Some(e), Some(s)) if !e.is_empty() => e.as_bytes().ct_eq(s.as_bytes()).into(),
        _ => false,
    }
}

fn submitted_token(raw: &[u8]) -> Option<String> {
    serde_urlencoded::from_bytes::<TokenField>(raw)
        .ok()
        .and_then(|f| f.csrf_token)
}

pub async fn csrf_guard(session: Session, req: Request, next: Next) -> Result<Response, AppError> {
    let expected = session.csrf_token();

    let (req, submitted) = if req.method() == Method::GET || req.method() == Method::HEAD {
        let submitted = req.uri().query().and_then(|q| submitted_token(q.as_bytes()));
        (req, submitted)
    } else {
        let (parts, body) = req.into_parts();
        // an unreadable or oversized body cannot prove it carries the token
        let bytes = to_bytes(body, MAX_FORM_BYTES).await.map_err(|e| {
            warn!(
                method = %parts.method,
                path = %parts.uri.path(),
                error = %e,
                "rejecting request whose body could not be buffered"
            );
            AppError::CsrfMismatch
        })?;
        let submitted = submitted_token(&bytes);
        (Request::from_parts(parts, Body::from(bytes)), submitted)
    };

    if !tokens_match(expected.as_deref(), submitted.as_deref()) {
        warn!(
            method = %req.method(),
            path = %req.uri().path(),
            has_token = submitted.is_some(),
            "rejecting request with bad csrf token"
        );
        return Err(AppError::CsrfMismatch);
    }
    Ok(next.run(req).await)
}
