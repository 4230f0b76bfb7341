//! Persistence collaborator for the leave ledger.
//!
//! [`LeaveStore`] is the only way the rest of the crate touches the
//! `users` and `requests` collections. Every successful write is announced
//! on the change channel returned by [`LeaveStore::changes`].

pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::model::{
    account::Account,
    employee::Employee,
    leave_request::{Decision, LeaveRequest, NewLeaveRequest, RequestStatus},
};

pub use memory::MemoryLeaveStore;
pub use mysql::MySqlLeaveStore;

/// Capacity of the change channel. Slow subscribers lag and resync from a snapshot.
pub const CHANGE_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("employee {0} not found")]
    EmployeeNotFound(String),
    #[error("leave request {0} not found")]
    RequestNotFound(String),
    #[error("leave request already {0}")]
    AlreadyDecided(RequestStatus),
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: i64, available: i64 },
    #[error("email {0} is already registered")]
    DuplicateEmail(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Users,
    Requests,
}

/// Emitted after a write commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub collection: Collection,
    pub id: String,
}

/// What a request insert does to the owner's balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalancePolicy {
    /// Re-read the balance inside the write and refuse the insert when the
    /// requested days exceed the balance minus days already pending.
    /// The balance itself is not touched.
    RequireAvailable,
    /// Insert and debit the owner's balance in the same unit.
    Debit,
}

/// Filter for request listings. Results are always newest first.
#[derive(Debug, Clone, Default)]
pub struct RequestQuery {
    pub employee_email: Option<String>,
    pub status: Option<RequestStatus>,
}

impl RequestQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_email(email: impl Into<String>) -> Self {
        Self {
            employee_email: Some(email.into()),
            status: None,
        }
    }

    pub fn matches(&self, request: &LeaveRequest) -> bool {
        self.employee_email
            .as_deref()
            .is_none_or(|email| request.employee_email == email)
            && self.status.is_none_or(|status| request.status == status)
    }
}

/// A window over an ordered listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: u64,
    pub limit: u64,
}

impl Page {
    /// One-based page number; overflowing offsets saturate past the end.
    pub fn numbered(page: u64, per_page: u64) -> Self {
        Self {
            offset: page.saturating_sub(1).saturating_mul(per_page),
            limit: per_page,
        }
    }
}

#[async_trait]
pub trait LeaveStore: Send + Sync {
    /// Creates the credentials and the profile together.
    async fn create_account(&self, account: &Account, employee: &Employee) -> Result<(), StoreError>;

    async fn find_account(&self, email: &str) -> Result<Option<Account>, StoreError>;

    async fn get_employee(&self, uid: &str) -> Result<Option<Employee>, StoreError>;

    /// All profiles, oldest first.
    async fn list_employees(&self) -> Result<Vec<Employee>, StoreError>;

    /// Atomically adds `delta` to the stored balance and returns the new value.
    async fn increment_leave_amount(&self, uid: &str, delta: i64) -> Result<i64, StoreError>;

    async fn create_request(
        &self,
        request: NewLeaveRequest,
        policy: BalancePolicy,
    ) -> Result<LeaveRequest, StoreError>;

    async fn get_request(&self, id: &str) -> Result<Option<LeaveRequest>, StoreError>;

    async fn list_requests(&self, query: &RequestQuery) -> Result<Vec<LeaveRequest>, StoreError>;

    /// One window of [`list_requests`](LeaveStore::list_requests) plus the
    /// total number of matches.
    async fn page_requests(
        &self,
        query: &RequestQuery,
        page: Page,
    ) -> Result<(Vec<LeaveRequest>, u64), StoreError>;

    /// Moves a `Pending` request to the decided status. On approval the
    /// owner's balance is debited by the stored day count in the same unit.
    async fn decide_request(&self, id: &str, decision: Decision) -> Result<LeaveRequest, StoreError>;

    fn changes(&self) -> broadcast::Receiver<ChangeEvent>;
}

/// Newest submission first; ties keep a stable order by id.
pub(crate) fn sort_newest_first(requests: &mut [LeaveRequest]) {
    requests.sort_by(|a, b| {
        b.submission_date
            .cmp(&a.submission_date)
            .then_with(|| a.id.cmp(&b.id))
    });
}
