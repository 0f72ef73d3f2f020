use axum::{
    extract::{MatchedPath, Request, State},
    http::{HeaderName, HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::api::AppState;
use crate::api::flash::FlashCategory;

/// GET /metrics
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Response {
    state.prometheus_handle.as_ref().map_or_else(
        || (StatusCode::NOT_FOUND, "Metrics are disabled").into_response(),
        |handle| handle.render().into_response(),
    )
}

/// What a handler learned about the request, carried back to the request log
/// in the response extensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestNote {
    pub user_id: Option<i32>,
    pub flash: Option<FlashCategory>,
}

fn note_mut(response: &mut Response) -> &mut RequestNote {
    response
        .extensions_mut()
        .get_or_insert_default::<RequestNote>()
}

/// Marks the response as served to `user_id`.
pub fn note_user(response: &mut Response, user_id: i32) {
    note_mut(response).user_id.get_or_insert(user_id);
}

/// Marks the response as carrying a flash of `category` to the next page.
pub fn note_flash(response: &mut Response, category: FlashCategory) {
    note_mut(response).flash = Some(category);
}

/// Coarse result of a request, used as a metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Page,
    Redirect,
    LoginRequired,
    ClientError,
    Error,
}

impl Outcome {
    fn classify(status: StatusCode, location: Option<&str>) -> Self {
        if status.is_server_error() {
            Self::Error
        } else if status.is_client_error() {
            Self::ClientError
        } else if status.is_redirection() {
            if location.is_some_and(|l| l.starts_with("/login?next=")) {
                Self::LoginRequired
            } else {
                Self::Redirect
            }
        } else {
            Self::Page
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Redirect => "redirect",
            Self::LoginRequired => "login_required",
            Self::ClientError => "client_error",
            Self::Error => "error",
        }
    }
}

/// One span and one `http_request_finished` event per request, plus the
/// request counters. Handlers fill the user and flash fields through
/// [`RequestNote`].
pub async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string());

    let span = info_span!(
        "request",
        request_id = %Uuid::new_v4(),
        method = %method,
        path = %path,
        user_id = tracing::field::Empty,
    );

    async move {
        let response = next.run(req).await;

        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok());
        let outcome = Outcome::classify(status, location);
        let note = response
            .extensions()
            .get::<RequestNote>()
            .copied()
            .unwrap_or_default();

        if let Some(user_id) = note.user_id {
            tracing::Span::current().record("user_id", user_id);
        }

        // Unmatched paths share one label
        let route_label = route.unwrap_or_else(|| "unmatched".to_string());
        let labels = [
            ("method", method),
            ("route", route_label),
            ("status", status.as_u16().to_string()),
            ("outcome", outcome.as_str().to_string()),
        ];
        metrics::counter!("http_requests_total", &labels).increment(1);
        metrics::histogram!("http_request_duration_seconds", &labels)
            .record(start.elapsed().as_secs_f64());

        info!(
            event = "http_request_finished",
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            status_code = status.as_u16(),
            outcome = outcome.as_str(),
            redirect_to = location,
            flash = note.flash.map(FlashCategory::as_str),
            "Request finished"
        );

        response
    }
    .instrument(span)
    .await
}

const SECURITY_HEADERS: [(HeaderName, &str); 4] = [
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_FRAME_OPTIONS, "DENY"),
    (header::REFERRER_POLICY, "same-origin"),
    (
        header::CONTENT_SECURITY_POLICY,
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; \
         connect-src 'self'; form-action 'self'; frame-ancestors 'none'; base-uri 'self'",
    ),
];

/// Pages never load third-party content, scripts come from `/static` only.
pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    for (name, value) in SECURITY_HEADERS {
        headers.insert(name, HeaderValue::from_static(value));
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_classifies_login_redirects() {
        assert_eq!(
            Outcome::classify(StatusCode::SEE_OTHER, Some("/login?next=%2Fvypisy")),
            Outcome::LoginRequired
        );
        assert_eq!(
            Outcome::classify(StatusCode::SEE_OTHER, Some("/")),
            Outcome::Redirect
        );
        assert_eq!(Outcome::classify(StatusCode::OK, None), Outcome::Page);
        assert_eq!(
            Outcome::classify(StatusCode::BAD_REQUEST, None),
            Outcome::ClientError
        );
        assert_eq!(
            Outcome::classify(StatusCode::SERVICE_UNAVAILABLE, None),
            Outcome::Error
        );
    }

    #[test]
    fn test_request_note_keeps_first_user() {
        let mut response = StatusCode::OK.into_response();
        assert!(response.extensions().get::<RequestNote>().is_none());

        note_user(&mut response, 7);
        note_flash(&mut response, FlashCategory::Info);
        note_user(&mut response, 9);

        assert_eq!(
            response.extensions().get::<RequestNote>().copied(),
            Some(RequestNote {
                user_id: Some(7),
                flash: Some(FlashCategory::Info),
            })
        );
    }
}
