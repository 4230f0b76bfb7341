use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// One-way request lifecycle: `Pending -> Approved | Rejected`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

/// Outcome an administrator may apply to a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Decision {
    Approved,
    Rejected,
}

impl From<Decision> for RequestStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Approved => RequestStatus::Approved,
            Decision::Rejected => RequestStatus::Rejected,
        }
    }
}

/// Stored leave request. The employee fields are a snapshot taken at
/// submission and `days_requested` is never recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "id": "5d1c2b7e-9a53-4a0e-8d0c-1c4e3b9f1a22",
    "employeeId": "0b9d6f0e-3f1c-4a53-9c55-2d1f3f8d7a10",
    "employeeName": "Jane Doe",
    "employeeEmail": "jane@company.com",
    "startDate": "2024-01-01",
    "endDate": "2024-01-05",
    "daysRequested": 5,
    "managerRemarks": "family trip",
    "status": "Pending",
    "submissionDate": "2024-01-01T09:00:00Z"
}))]
pub struct LeaveRequest {
    pub id: String,
    pub employee_id: String,
    pub employee_name: String,
    pub employee_email: String,
    #[schema(value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub end_date: NaiveDate,
    pub days_requested: i64,
    pub manager_remarks: Option<String>,
    pub status: RequestStatus,
    #[schema(value_type = String, format = "date-time")]
    pub submission_date: DateTime<Utc>,
}

/// A request about to be written; the store assigns `id` on insert.
#[derive(Debug, Clone)]
pub struct NewLeaveRequest {
    pub employee_id: String,
    pub employee_name: String,
    pub employee_email: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days_requested: i64,
    pub manager_remarks: Option<String>,
    pub status: RequestStatus,
    pub submission_date: DateTime<Utc>,
}

impl NewLeaveRequest {
    pub fn into_request(self, id: String) -> LeaveRequest {
        LeaveRequest {
            id,
            employee_id: self.employee_id,
            employee_name: self.employee_name,
            employee_email: self.employee_email,
            start_date: self.start_date,
            end_date: self.end_date,
            days_requested: self.days_requested,
            manager_remarks: self.manager_remarks,
            status: self.status,
            submission_date: self.submission_date,
        }
    }
}
