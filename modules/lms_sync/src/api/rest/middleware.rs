use std::{
    any::Any,
    backtrace::Backtrace,
    cell::RefCell,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Once},
};

use axum::{
    body::{self, Body},
    extract::{Request, State},
    http::{header, HeaderName, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::FutureExt;
use tower_http::request_id::{MakeRequestId, RequestId};
use tracing::{error, field::Empty};

use crate::api::rest::error::ApiError;
use crate::domain::{secret::verify_secret, settings::SettingsHolder};

pub const BODY_LIMIT_BYTES: usize = 16 * 1024 * 1024;

const SECRET_PARAM: &str = "secret";

pub fn request_id_header() -> HeaderName {
    HeaderName::from_static("x-request-id")
}

#[derive(Clone, Default)]
pub struct MakeReqId;

impl MakeRequestId for MakeReqId {
    fn make_request_id<B>(&mut self, _req: &Request<B>) -> Option<RequestId> {
        let id = nanoid::nanoid!();
        Some(RequestId::new(id.parse().ok()?))
    }
}

/// Trace layer opening one `http_request` span per request.
#[allow(clippy::type_complexity)]
pub fn create_trace_layer() -> tower_http::trace::TraceLayer<
    tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>,
    impl Fn(&Request<Body>) -> tracing::Span + Clone,
> {
    use tower_http::trace::TraceLayer;

    TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
        let rid = req
            .headers()
            .get(request_id_header())
            .and_then(|v| v.to_str().ok())
            .unwrap_or("n/a");
        tracing::info_span!(
            "http_request",
            method = %req.method(),
            uri = %req.uri().path(),
            version = ?req.version(),
            module = "lms_sync",
            request_id = %rid,
            status = Empty,
            latency_ms = Empty
        )
    })
}

/// Rejects requests whose `secret` value does not match the configured one.
///
/// The value is looked up like an HTML form field: a urlencoded request body
/// wins over the query string.
pub async fn require_secret(
    State(settings): State<Arc<SettingsHolder>>,
    req: Request,
    next: Next,
) -> Response {
    let (req, got) = match extract_secret(req).await {
        Ok(found) => found,
        Err(e) => return e.into_response(),
    };

    let snapshot = settings.snapshot();
    if let Err(e) = verify_secret(&snapshot.secret, &got) {
        error!(error = %e, "Invalid Secret");
        return ApiError::from(e).into_response();
    }
    next.run(req).await
}

/// Returns the request (body restored when it was read) and the secret value,
/// empty when absent.
async fn extract_secret(req: Request) -> Result<(Request, String), ApiError> {
    let from_query = req
        .uri()
        .query()
        .and_then(|q| find_form_value(q.as_bytes(), SECRET_PARAM));

    if !is_form_body(&req) {
        return Ok((req, from_query.unwrap_or_default()));
    }

    let (parts, body) = req.into_parts();
    let bytes = body::to_bytes(body, BODY_LIMIT_BYTES)
        .await
        .map_err(|_| ApiError::bad_request("invalid request body"))?;
    let from_body = find_form_value(&bytes, SECRET_PARAM);
    let req = Request::from_parts(parts, Body::from(bytes));

    Ok((req, from_body.or(from_query).unwrap_or_default()))
}

fn is_form_body(req: &Request) -> bool {
    let method = req.method();
    if method != Method::POST && method != Method::PUT && method != Method::PATCH {
        return false;
    }
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| {
            mime.trim()
                .eq_ignore_ascii_case("application/x-www-form-urlencoded")
        })
}

fn find_form_value(encoded: &[u8], name: &str) -> Option<String> {
    url::form_urlencoded::parse(encoded)
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

thread_local! {
    static LAST_PANIC_BACKTRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static PANIC_HOOK: Once = Once::new();

/// Chains a panic hook that keeps the backtrace of the latest panic on the
/// panicking thread so [`recover_panics`] can log it.
pub fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let trace = Backtrace::force_capture().to_string();
            LAST_PANIC_BACKTRACE.with(|slot| *slot.borrow_mut() = Some(trace));
            previous(info);
        }));
    });
}

/// Turns a panic inside a handler into an empty 500 response.
pub async fn recover_panics(req: Request, next: Next) -> Response {
    let url = req.uri().to_string();
    match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(resp) => resp,
        Err(payload) => {
            let stack = LAST_PANIC_BACKTRACE
                .with(|slot| slot.borrow_mut().take())
                .unwrap_or_default();
            error!(
                url = %url,
                error = %panic_message(payload.as_ref()),
                stack = %stack,
                "Recovered from a panic"
            );
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
