use actix_web::{HttpResponse, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    auth::auth::AuthUser,
    error::ApiError,
    model::{employee::Employee, leave_request::RequestStatus},
    state::AppState,
    store::RequestQuery,
};

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub profile: Employee,
    /// Remaining leave days
    #[schema(example = 15)]
    pub leave_amount: i64,
    /// Requests still awaiting a decision
    #[schema(example = 1)]
    pub pending_requests: usize,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub total: usize,
}

#[derive(Debug, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetricsResponse {
    #[schema(example = 3)]
    pub pending: usize,
    #[schema(example = 10)]
    pub approved: usize,
    #[schema(example = 2)]
    pub rejected: usize,
    #[schema(example = 12)]
    pub employees: usize,
    /// Sum of day counts over approved requests
    #[schema(example = 41)]
    pub approved_days: i64,
}

/// Profile and balance of the signed-in user
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Current profile", body = MeResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn me(auth: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let mut query = RequestQuery::for_email(&auth.profile.email);
    query.status = Some(RequestStatus::Pending);
    let pending_requests = state.store().list_requests(&query).await?.len();

    Ok(HttpResponse::Ok().json(MeResponse {
        leave_amount: auth.profile.leave_amount,
        profile: auth.profile,
        pending_requests,
    }))
}

/// Employee directory
#[utoipa::path(
    get,
    path = "/api/admin/employees",
    responses(
        (status = 200, description = "All employee profiles", body = EmployeeListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Admin",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_employees(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let data = state.store().list_employees().await?;
    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        total: data.len(),
        data,
    }))
}

/// Dashboard counters for administrators
#[utoipa::path(
    get,
    path = "/api/admin/metrics",
    responses(
        (status = 200, description = "Request and employee counters", body = MetricsResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Admin",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn metrics(auth: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let requests = state.store().list_requests(&RequestQuery::all()).await?;
    let mut metrics = MetricsResponse {
        employees: state.store().list_employees().await?.len(),
        ..Default::default()
    };
    for request in &requests {
        match request.status {
            RequestStatus::Pending => metrics.pending += 1,
            RequestStatus::Approved => {
                metrics.approved += 1;
                metrics.approved_days += request.days_requested;
            }
            RequestStatus::Rejected => metrics.rejected += 1,
        }
    }

    Ok(HttpResponse::Ok().json(metrics))
}
