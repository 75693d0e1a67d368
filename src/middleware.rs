use crate::auth::CurrentUser;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::Header;
use rocket::request::Request;
use rocket::{Data, Response};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Per-request bookkeeping kept in Rocket's local cache.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub id: String,
    started: Instant,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            started: Instant::now(),
        }
    }

    /// `None` until the logger fairing has seen the request.
    pub fn of<'a>(request: &'a Request<'_>) -> Option<&'a RequestContext> {
        request.local_cache(|| None::<RequestContext>).as_ref()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Booking-level facts about a routed request: who called which handler, on which appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestSummary {
    pub request_id: String,
    pub route: String,
    pub user_id: Option<i64>,
    pub appointment_id: Option<i64>,
}

impl RequestSummary {
    pub fn of(request: &Request<'_>) -> Self {
        let route = request.route();

        // Only routes addressing a single appointment carry `<id>`.
        let appointment_id = route
            .filter(|r| r.uri.as_str().ends_with("/<id>"))
            .and_then(|_| request.param::<i64>(0))
            .and_then(Result::ok);

        Self {
            request_id: RequestContext::of(request).map_or_else(|| "unknown".to_string(), |ctx| ctx.id.clone()),
            route: route
                .map(|r| r.name.as_deref().unwrap_or(r.uri.as_str()).to_string())
                .unwrap_or_else(|| "unmatched".to_string()),
            // Filled in by the `CurrentUser` guard on authenticated routes.
            user_id: request.local_cache(|| None::<CurrentUser>).as_ref().map(|u| u.id),
            appointment_id,
        }
    }
}

/// Tags every request with an id and writes one access-log line per response.
pub struct RequestLogger;

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info {
            name: "Request Logger",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        let context = RequestContext::new();
        debug!(request_id = %context.id, method = %request.method(), uri = %request.uri(), "incoming request");
        request.local_cache(|| Some(context));
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let summary = RequestSummary::of(request);
        let elapsed_ms = RequestContext::of(request).map(|ctx| ctx.started.elapsed().as_millis() as u64);
        let status = response.status();

        response.set_header(Header::new("X-Request-Id", summary.request_id.clone()));
        response.set_header(Header::new("X-Content-Type-Options", "nosniff"));
        response.set_header(Header::new("X-Frame-Options", "DENY"));
        response.set_header(Header::new("Cache-Control", "no-store"));

        if status.class().is_server_error() || status.class().is_client_error() {
            warn!(
                request_id = %summary.request_id,
                method = %request.method(),
                route = %summary.route,
                user_id = summary.user_id,
                appointment_id = summary.appointment_id,
                status = status.code,
                elapsed_ms,
                "request rejected"
            );
        } else {
            info!(
                request_id = %summary.request_id,
                method = %request.method(),
                route = %summary.route,
                user_id = summary.user_id,
                appointment_id = summary.appointment_id,
                status = status.code,
                elapsed_ms,
                "request served"
            );
        }
    }
}
