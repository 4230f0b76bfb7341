use std::convert::Infallible;

use actix_web::{HttpResponse, http::header, web};
use futures::{Stream, StreamExt};
use serde::Serialize;
use serde_json::json;
use tracing::error;

use crate::{
    auth::auth::AuthUser,
    error::ApiError,
    feed::{subscribe_employees, subscribe_requests},
    state::AppState,
    store::{RequestQuery, StoreError},
};

/// Formats one snapshot as a server-sent event.
fn frame<T: Serialize>(item: Result<Vec<T>, StoreError>) -> web::Bytes {
    let (event, data) = match item.map(|docs| serde_json::to_string(&docs)) {
        Ok(Ok(json)) => ("snapshot", json),
        Ok(Err(e)) => {
            error!(error = %e, "Snapshot serialization failed");
            ("error", json!({"error": "Internal Server Error", "code": "INTERNAL_SERVER_ERROR"}).to_string())
        }
        Err(e) => {
            error!(error = %e, "Snapshot read failed");
            (
                "error",
                json!({"error": ApiError::Unavailable.to_string(), "code": "STORE_UNAVAILABLE"}).to_string(),
            )
        }
    };
    web::Bytes::from(format!("event: {event}\ndata: {data}\n\n"))
}

fn event_stream<T, S>(snapshots: S) -> HttpResponse
where
    T: Serialize + 'static,
    S: Stream<Item = Result<Vec<T>, StoreError>> + 'static,
{
    let body = snapshots.map(|item| Ok::<_, Infallible>(frame(item)));

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(body)
}

/// Live feed of the signed-in user's requests, newest first
#[utoipa::path(
    get,
    path = "/api/leave/stream",
    responses(
        (status = 200, description = "text/event-stream of request snapshots"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn my_leave_stream(auth: AuthUser, state: web::Data<AppState>) -> HttpResponse {
    let query = RequestQuery::for_email(&auth.profile.email);
    event_stream(subscribe_requests(state.store().clone(), query))
}

/// Live feed of every request, newest first
#[utoipa::path(
    get,
    path = "/api/admin/leave/stream",
    responses(
        (status = 200, description = "text/event-stream of request snapshots"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn all_leave_stream(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;
    Ok(event_stream(subscribe_requests(
        state.store().clone(),
        RequestQuery::all(),
    )))
}

/// Live feed of the employee directory
#[utoipa::path(
    get,
    path = "/api/admin/employees/stream",
    responses(
        (status = 200, description = "text/event-stream of employee snapshots"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn employee_stream(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;
    Ok(event_stream(subscribe_employees(state.store().clone())))
}
