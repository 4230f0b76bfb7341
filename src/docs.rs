use crate::api::employee::{EmployeeListResponse, MeResponse, MetricsResponse};
use crate::api::leave_request::{
    CreateLeave, DayCountQuery, DayCountResponse, LeaveDecisionResponse, LeaveFilter,
    LeaveListResponse,
};
use crate::model::employee::{Employee, UserType};
use crate::model::leave_request::{Decision, LeaveRequest, RequestStatus};
use crate::models::{AuthResponse, LoginReqDto, SignUpReq};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Leave Management API",
        version = "1.0.0",
        description = r#"
## Leave Management System

Employees sign up, submit leave requests for a date range and follow their
status; administrators approve or reject them. Remaining leave is tracked
per employee.

### 🔹 Key Features
- **Leave Requests**
  - Submit a date range, see the day count, follow status live
- **Approvals**
  - Approve or reject pending requests; approval debits the balance
- **Administrator self-service**
  - Administrators' own leave is approved and debited immediately
- **Directory & Metrics**
  - Employee list with balances and request counters

### 🔐 Security
Endpoints under `/api` require **JWT Bearer authentication**.
Approval, directory and metrics endpoints are limited to **admin** users.

### 📡 Live feeds
`/stream` endpoints answer with `text/event-stream`: one `snapshot` event
with the full ordered list, then another after every change.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::signup,
        crate::auth::handlers::login,
        crate::auth::handlers::logout,

        crate::api::leave_request::day_count,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::my_leaves,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::apply_admin_leave,
        crate::api::leave_request::leave_list,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,

        crate::api::stream::my_leave_stream,
        crate::api::stream::all_leave_stream,
        crate::api::stream::employee_stream,

        crate::api::employee::me,
        crate::api::employee::list_employees,
        crate::api::employee::metrics
    ),
    components(
        schemas(
            SignUpReq,
            LoginReqDto,
            AuthResponse,
            Employee,
            UserType,
            LeaveRequest,
            RequestStatus,
            Decision,
            CreateLeave,
            DayCountQuery,
            DayCountResponse,
            LeaveFilter,
            LeaveListResponse,
            LeaveDecisionResponse,
            MeResponse,
            EmployeeListResponse,
            MetricsResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Sign up, sign in and sign out"),
        (name = "Leave", description = "Employee leave APIs"),
        (name = "Employee", description = "Profile APIs"),
        (name = "Admin", description = "Approval, directory and metrics APIs"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_ledger_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/leave",
            "/api/admin/leave/{leave_id}/approve",
            "/api/admin/leave/{leave_id}/reject",
            "/auth/signup",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        assert!(
            doc.components
                .as_ref()
                .is_some_and(|c| c.security_schemes.contains_key("bearer_auth"))
        );
    }
}
