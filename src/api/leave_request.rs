use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::auth::AuthUser,
    error::ApiError,
    ledger::{LeaveApplication, compute_day_count},
    model::leave_request::{Decision, LeaveRequest, RequestStatus},
    state::AppState,
    store::{Page, RequestQuery},
};

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeave {
    #[schema(example = "2024-01-01", format = "date")]
    pub start_date: Option<String>,
    #[schema(example = "2024-01-05", format = "date")]
    pub end_date: Option<String>,
    #[schema(example = "family trip")]
    pub manager_remarks: Option<String>,
}

impl From<CreateLeave> for LeaveApplication {
    fn from(payload: CreateLeave) -> Self {
        LeaveApplication {
            start_date: payload.start_date,
            end_date: payload.end_date,
            remarks: payload.manager_remarks,
        }
    }
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct DayCountQuery {
    /// First day of leave
    #[schema(example = "2024-01-01")]
    pub start: Option<String>,
    /// Last day of leave
    #[schema(example = "2024-01-05")]
    pub end: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DayCountResponse {
    #[schema(example = 5)]
    pub days_requested: i64,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    #[schema(example = "Pending")]
    /// Filter by request status
    pub status: Option<RequestStatus>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    #[schema(example = 20)]
    /// Pagination per page number
    pub per_page: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRequest>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 20)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: u64,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveDecisionResponse {
    #[schema(example = "Request Approved successfully")]
    pub message: String,
    pub request: LeaveRequest,
}

async fn paginate(
    state: &AppState,
    mut query: RequestQuery,
    filter: &LeaveFilter,
) -> Result<LeaveListResponse, ApiError> {
    query.status = filter.status;
    let per_page = filter.per_page.unwrap_or(20).clamp(1, 100);
    let page = filter.page.unwrap_or(1).max(1);

    let (data, total) = state
        .store()
        .page_requests(&query, Page::numbered(page, per_page))
        .await?;
    debug!(total, page, per_page, "Listing leave requests");

    Ok(LeaveListResponse {
        data,
        page,
        per_page,
        total,
    })
}

/* =========================
Day count preview
========================= */
/// Inclusive day count for a date pair, `0` when either date is unusable
#[utoipa::path(
    get,
    path = "/api/leave/days",
    params(DayCountQuery),
    responses(
        (status = 200, description = "Day count", body = DayCountResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn day_count(_auth: AuthUser, query: web::Query<DayCountQuery>) -> HttpResponse {
    HttpResponse::Ok().json(DayCountResponse {
        days_requested: compute_day_count(query.start.as_deref(), query.end.as_deref()),
    })
}

/* =========================
Submit leave request
========================= */
/// Submit a leave request for the signed-in user
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted as Pending", body = LeaveRequest),
        (status = 400, description = "Invalid date range"),
        (status = 401, description = "Unauthorized"),
        (status = 422, description = "Insufficient balance"),
        (status = 503, description = "Store unavailable")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<CreateLeave>,
) -> Result<HttpResponse, ApiError> {
    let request = state
        .ledger
        .submit_request(&auth.profile, payload.into_inner().into())
        .await?;

    Ok(HttpResponse::Created().json(request))
}

/// Requests submitted by the signed-in user, newest first
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn my_leaves(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<LeaveFilter>,
) -> Result<HttpResponse, ApiError> {
    let response = paginate(&state, RequestQuery::for_email(&auth.profile.email), &query).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// A single request, visible to its owner and to administrators
#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = String, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let leave_id = path.into_inner();

    let request = state
        .store()
        .get_request(&leave_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Leave request not found".into()))?;

    if request.employee_id != auth.uid() {
        auth.require_admin()?;
    }

    Ok(HttpResponse::Ok().json(request))
}

/* =========================
Admin self-service
========================= */
/// Apply leave as an administrator; recorded as Approved and debited at once
#[utoipa::path(
    post,
    path = "/api/admin/leave",
    request_body = CreateLeave,
    responses(
        (status = 201, description = "Leave applied and auto-approved", body = LeaveRequest),
        (status = 400, description = "Invalid date range"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 503, description = "Store unavailable")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn apply_admin_leave(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<CreateLeave>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let request = state
        .ledger
        .submit_and_approve(&auth.profile, payload.into_inner().into())
        .await?;

    Ok(HttpResponse::Created().json(request))
}

/// Every request in the system, newest first
#[utoipa::path(
    get,
    path = "/api/admin/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn leave_list(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<LeaveFilter>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let response = paginate(&state, RequestQuery::all(), &query).await?;
    Ok(HttpResponse::Ok().json(response))
}

async fn decide(
    auth: AuthUser,
    state: web::Data<AppState>,
    leave_id: String,
    decision: Decision,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let request = state.ledger.decide_request(&leave_id, decision).await?;

    Ok(HttpResponse::Ok().json(LeaveDecisionResponse {
        message: format!("Request {} successfully", request.status),
        request,
    }))
}

/* =========================
Approve leave (Admin)
========================= */
/// Approve a pending request and debit the owner's balance
#[utoipa::path(
    put,
    path = "/api/admin/leave/{leave_id}/approve",
    params(
        ("leave_id" = String, Path, description = "ID of the leave request to approve")
    ),
    responses(
        (status = 200, description = "Leave approved", body = LeaveDecisionResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request or employee not found"),
        (status = 409, description = "Leave request already decided")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn approve_leave(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    decide(auth, state, path.into_inner(), Decision::Approved).await
}

/* =========================
Reject leave (Admin)
========================= */
/// Reject a pending request; balances are untouched
#[utoipa::path(
    put,
    path = "/api/admin/leave/{leave_id}/reject",
    params(
        ("leave_id" = String, Path, description = "ID of the leave request to reject")
    ),
    responses(
        (status = 200, description = "Leave rejected", body = LeaveDecisionResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Leave request already decided")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn reject_leave(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    decide(auth, state, path.into_inner(), Decision::Rejected).await
}
