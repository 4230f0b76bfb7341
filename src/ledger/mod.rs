//! Leave balance bookkeeping and the request approval state machine.
//!
//! Requests are created `Pending` (or `Approved` on the administrator's own
//! path) and decided at most once. Balances only move when a request reaches
//! `Approved`, always through a store-level atomic decrement.

mod days;

pub use days::{compute_day_count, parse_date};

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::model::{
    employee::Employee,
    leave_request::{Decision, LeaveRequest, NewLeaveRequest, RequestStatus},
};
use crate::store::{BalancePolicy, LeaveStore, StoreError};

const EMPLOYEE_NAME_FALLBACK: &str = "Unknown";
const ADMIN_NAME_FALLBACK: &str = "Admin";

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("please select valid dates")]
    InvalidDateRange,
    #[error("insufficient balance: requested {requested} days but only {available} left")]
    InsufficientBalance { requested: i64, available: i64 },
    #[error("employee {0} not found")]
    EmployeeNotFound(String),
    #[error("leave request {0} not found")]
    RequestNotFound(String),
    #[error("leave request is already {0}")]
    AlreadyDecided(RequestStatus),
    #[error("leave store unavailable")]
    StoreUnavailable(#[source] StoreError),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EmployeeNotFound(uid) => LedgerError::EmployeeNotFound(uid),
            StoreError::RequestNotFound(id) => LedgerError::RequestNotFound(id),
            StoreError::AlreadyDecided(status) => LedgerError::AlreadyDecided(status),
            StoreError::InsufficientBalance {
                requested,
                available,
            } => LedgerError::InsufficientBalance {
                requested,
                available,
            },
            other => LedgerError::StoreUnavailable(other),
        }
    }
}

/// Dates and remarks as submitted by the caller.
#[derive(Debug, Clone, Default)]
pub struct LeaveApplication {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Clone)]
pub struct LeaveLedger {
    store: Arc<dyn LeaveStore>,
}

impl LeaveLedger {
    pub fn new(store: Arc<dyn LeaveStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn LeaveStore> {
        &self.store
    }

    /// Records a `Pending` request for `employee`. The balance is not touched.
    ///
    /// The snapshot balance on `employee` is checked first; the store then
    /// repeats the check against the committed balance inside the insert.
    pub async fn submit_request(
        &self,
        employee: &Employee,
        application: LeaveApplication,
    ) -> Result<LeaveRequest, LedgerError> {
        let request = build_request(
            employee,
            application,
            RequestStatus::Pending,
            EMPLOYEE_NAME_FALLBACK,
        )?;

        if request.days_requested > employee.leave_amount {
            return Err(LedgerError::InsufficientBalance {
                requested: request.days_requested,
                available: employee.leave_amount,
            });
        }

        let created = self
            .store
            .create_request(request, BalancePolicy::RequireAvailable)
            .await?;

        info!(
            request_id = %created.id,
            employee_id = %created.employee_id,
            days = created.days_requested,
            "Leave request submitted"
        );
        Ok(created)
    }

    /// Records an already `Approved` request for the administrator and debits
    /// their balance in the same store unit. No sufficiency check.
    pub async fn submit_and_approve(
        &self,
        admin: &Employee,
        application: LeaveApplication,
    ) -> Result<LeaveRequest, LedgerError> {
        let request = build_request(
            admin,
            application,
            RequestStatus::Approved,
            ADMIN_NAME_FALLBACK,
        )?;

        let created = self.store.create_request(request, BalancePolicy::Debit).await?;

        info!(
            request_id = %created.id,
            admin_id = %created.employee_id,
            days = created.days_requested,
            "Leave applied and auto-approved"
        );
        Ok(created)
    }

    /// Applies `decision` to a pending request. Approval debits the owner by
    /// the stored `days_requested`; rejection leaves balances alone.
    pub async fn decide_request(
        &self,
        request_id: &str,
        decision: Decision,
    ) -> Result<LeaveRequest, LedgerError> {
        let decided = self.store.decide_request(request_id, decision).await?;

        info!(
            request_id = %decided.id,
            employee_id = %decided.employee_id,
            status = %decided.status,
            days = decided.days_requested,
            "Leave request decided"
        );
        Ok(decided)
    }
}

fn build_request(
    owner: &Employee,
    application: LeaveApplication,
    status: RequestStatus,
    name_fallback: &str,
) -> Result<NewLeaveRequest, LedgerError> {
    let start = application.start_date.as_deref();
    let end = application.end_date.as_deref();

    let days_requested = compute_day_count(start, end);
    if days_requested <= 0 {
        return Err(LedgerError::InvalidDateRange);
    }

    let (Some(start), Some(end)) = (start.and_then(parse_date), end.and_then(parse_date)) else {
        return Err(LedgerError::InvalidDateRange);
    };
    if end < start {
        warn!(
            employee_id = %owner.uid,
            start = %start.date_naive(),
            end = %end.date_naive(),
            "End date precedes start date; counting absolute span"
        );
    }

    let remarks = application
        .remarks
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());

    Ok(NewLeaveRequest {
        employee_id: owner.uid.clone(),
        employee_name: owner.display_name_or(name_fallback).to_string(),
        employee_email: owner.email.clone(),
        start_date: start.date_naive(),
        end_date: end.date_naive(),
        days_requested,
        manager_remarks: remarks,
        status,
        submission_date: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::employee::UserType;
    use crate::store::{LeaveStore, MemoryLeaveStore, RequestQuery};

    async fn setup(balance: i64, user_type: UserType) -> (Arc<MemoryLeaveStore>, LeaveLedger, Employee) {
        let store = Arc::new(MemoryLeaveStore::new());
        let mut employee = Employee::new(
            "u1".into(),
            "Jane".into(),
            "jane@company.com".into(),
            user_type,
        );
        employee.leave_amount = balance;
        store.put_employee(employee.clone()).await;
        let ledger = LeaveLedger::new(store.clone());
        (store, ledger, employee)
    }

    fn application(start: &str, end: &str) -> LeaveApplication {
        LeaveApplication {
            start_date: Some(start.into()),
            end_date: Some(end.into()),
            remarks: None,
        }
    }

    async fn balance(store: &MemoryLeaveStore, uid: &str) -> i64 {
        store.get_employee(uid).await.unwrap().unwrap().leave_amount
    }

    #[tokio::test]
    async fn submission_records_pending_without_debit() {
        let (store, ledger, employee) = setup(15, UserType::Employee).await;

        let request = ledger
            .submit_request(&employee, application("2024-01-01", "2024-01-05"))
            .await
            .unwrap();

        assert_eq!(request.days_requested, 5);
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(balance(&store, "u1").await, 15);
        assert_eq!(store.list_requests(&RequestQuery::all()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_dates_write_nothing() {
        let (store, ledger, employee) = setup(15, UserType::Employee).await;

        let err = ledger
            .submit_request(&employee, application("", "2024-01-05"))
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::InvalidDateRange));
        assert!(store.list_requests(&RequestQuery::all()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn insufficient_balance_writes_nothing() {
        let (store, ledger, employee) = setup(2, UserType::Employee).await;

        let err = ledger
            .submit_request(&employee, application("2024-01-01", "2024-01-05"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LedgerError::InsufficientBalance { requested: 5, available: 2 }
        ));
        assert!(store.list_requests(&RequestQuery::all()).await.unwrap().is_empty());
        assert_eq!(balance(&store, "u1").await, 2);
    }

    #[tokio::test]
    async fn stale_snapshot_is_rechecked_by_store() {
        let (store, ledger, mut employee) = setup(3, UserType::Employee).await;
        // Caller still believes the balance is 15.
        employee.leave_amount = 15;

        let err = ledger
            .submit_request(&employee, application("2024-01-01", "2024-01-05"))
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::InsufficientBalance { available: 3, .. }));
        assert!(store.list_requests(&RequestQuery::all()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn approval_debits_exact_days_and_rejection_does_not() {
        let (store, ledger, employee) = setup(15, UserType::Employee).await;
        let approved = ledger
            .submit_request(&employee, application("2024-01-01", "2024-01-05"))
            .await
            .unwrap();
        let rejected = ledger
            .submit_request(&employee, application("2024-02-01", "2024-02-02"))
            .await
            .unwrap();

        let decided = ledger.decide_request(&approved.id, Decision::Approved).await.unwrap();
        assert_eq!(decided.status, RequestStatus::Approved);
        assert_eq!(balance(&store, "u1").await, 10);

        let decided = ledger.decide_request(&rejected.id, Decision::Rejected).await.unwrap();
        assert_eq!(decided.status, RequestStatus::Rejected);
        assert_eq!(balance(&store, "u1").await, 10);
    }

    #[tokio::test]
    async fn double_approval_debits_once() {
        let (store, ledger, employee) = setup(15, UserType::Employee).await;
        let request = ledger
            .submit_request(&employee, application("2024-01-01", "2024-01-03"))
            .await
            .unwrap();

        let (first, second) = tokio::join!(
            ledger.decide_request(&request.id, Decision::Approved),
            ledger.decide_request(&request.id, Decision::Approved),
        );

        assert_eq!([first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count(), 1);
        assert_eq!(balance(&store, "u1").await, 12);
    }

    #[tokio::test]
    async fn concurrent_approvals_are_not_lost() {
        let (store, ledger, employee) = setup(15, UserType::Employee).await;
        let two = ledger
            .submit_request(&employee, application("2024-01-01", "2024-01-02"))
            .await
            .unwrap();
        let three = ledger
            .submit_request(&employee, application("2024-02-01", "2024-02-03"))
            .await
            .unwrap();

        let (a, b) = tokio::join!(
            ledger.decide_request(&two.id, Decision::Approved),
            ledger.decide_request(&three.id, Decision::Approved),
        );
        a.unwrap();
        b.unwrap();

        assert_eq!(balance(&store, "u1").await, 10);
    }

    #[tokio::test]
    async fn admin_self_service_is_approved_and_debited() {
        let (store, ledger, admin) = setup(1, UserType::Admin).await;

        let request = ledger
            .submit_and_approve(&admin, application("2024-01-01", "2024-01-03"))
            .await
            .unwrap();

        assert_eq!(request.status, RequestStatus::Approved);
        assert_eq!(balance(&store, "u1").await, -2);
    }

    #[tokio::test]
    async fn deciding_unknown_request_fails() {
        let (_store, ledger, _) = setup(15, UserType::Employee).await;
        let err = ledger.decide_request("nope", Decision::Rejected).await.unwrap_err();
        assert!(matches!(err, LedgerError::RequestNotFound(id) if id == "nope"));
    }

    #[tokio::test]
    async fn reversed_dates_are_tolerated() {
        let (_store, ledger, employee) = setup(15, UserType::Employee).await;
        let request = ledger
            .submit_request(&employee, application("2024-01-05", "2024-01-01"))
            .await
            .unwrap();
        assert_eq!(request.days_requested, 5);
        assert_eq!(request.start_date.to_string(), "2024-01-05");
    }

    #[tokio::test]
    async fn blank_remarks_are_dropped() {
        let (_store, ledger, employee) = setup(15, UserType::Employee).await;
        let mut app = application("2024-01-01", "2024-01-01");
        app.remarks = Some("   ".into());
        let request = ledger.submit_request(&employee, app).await.unwrap();
        assert_eq!(request.manager_remarks, None);
    }
}
