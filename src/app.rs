use std::any::Any;
use std::net::SocketAddr;

use axum::{
    http::{header, HeaderName, HeaderValue},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};

use crate::error::internal_response;
use crate::session::session_layer;
use crate::state::AppState;
use crate::views::STYLESHEET;
use crate::{admin, auth, support, todos};

const SECURITY_HEADERS: [(HeaderName, &str); 7] = [
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_FRAME_OPTIONS, "DENY"),
    (header::X_XSS_PROTECTION, "1; mode=block"),
    (
        header::STRICT_TRANSPORT_SECURITY,
        "max-age=63072000; includeSubDomains; preload",
    ),
    (header::REFERRER_POLICY, "no-referrer-when-downgrade"),
    (
        HeaderName::from_static("permissions-policy"),
        "geolocation=(), microphone=()",
    ),
    (header::CONTENT_SECURITY_POLICY, "default-src 'self'"),
];

pub fn build_app(state: AppState) -> Router {
    let mut app = Router::new()
        .merge(auth::router())
        .merge(todos::router())
        .merge(support::router())
        .merge(admin::router())
        .route("/health", get(|| async { "ok" }))
        .route("/static/style.css", get(stylesheet))
        .layer(middleware::from_fn_with_state(state.clone(), session_layer))
        .with_state(state);

    for (name, value) in SECURITY_HEADERS {
        app = app.layer(SetResponseHeaderLayer::overriding(
            name,
            HeaderValue::from_static(value),
        ));
    }

    app.layer(CatchPanicLayer::custom(handle_panic)).layer(
        TraceLayer::new_for_http()
            .make_span_with(|req: &axum::http::Request<_>| {
                let method = req.method().clone();
                let uri = req.uri().clone();
                tracing::info_span!("http_request", %method, uri = %uri.path(), status = tracing::field::Empty)
            })
            .on_response(
                |res: &axum::http::Response<_>,
                 latency: std::time::Duration,
                 span: &tracing::Span| {
                    let status = res.status();
                    span.record("status", tracing::field::display(status));
                    if status.is_server_error() {
                        tracing::error!(%status, ?latency, "response");
                    } else {
                        tracing::info!(%status, ?latency, "response");
                    }
                },
            ),
    )
}

async fn stylesheet() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], STYLESHEET)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let msg = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = msg, "handler panicked");
    internal_response()
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
