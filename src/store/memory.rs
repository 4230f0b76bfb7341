use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{Mutex, broadcast};
use uuid::Uuid;

use super::{
    BalancePolicy, CHANGE_CHANNEL_CAPACITY, ChangeEvent, Collection, LeaveStore, Page,
    RequestQuery, StoreError, sort_newest_first,
};
use crate::model::{
    account::Account,
    employee::Employee,
    leave_request::{Decision, LeaveRequest, NewLeaveRequest, RequestStatus},
};

#[derive(Default)]
struct Collections {
    accounts: HashMap<String, Account>,
    users: HashMap<String, Employee>,
    requests: HashMap<String, LeaveRequest>,
}

impl Collections {
    fn pending_days(&self, uid: &str) -> i64 {
        self.requests
            .values()
            .filter(|r| r.employee_id == uid && r.status == RequestStatus::Pending)
            .map(|r| r.days_requested)
            .sum()
    }
}

/// In-process store. One lock covers both collections, so every compound
/// operation is a single atomic unit.
pub struct MemoryLeaveStore {
    inner: Mutex<Collections>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl Default for MemoryLeaveStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLeaveStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            inner: Mutex::new(Collections::default()),
            changes,
        }
    }

    /// Inserts a profile without credentials.
    pub async fn put_employee(&self, employee: Employee) {
        let uid = employee.uid.clone();
        self.inner.lock().await.users.insert(uid.clone(), employee);
        self.publish(Collection::Users, uid);
    }

    /// Drops a profile, leaving its requests orphaned.
    pub async fn remove_employee(&self, uid: &str) {
        self.inner.lock().await.users.remove(uid);
        self.publish(Collection::Users, uid.to_string());
    }

    fn publish(&self, collection: Collection, id: String) {
        // No receivers is fine.
        let _ = self.changes.send(ChangeEvent { collection, id });
    }
}

#[async_trait]
impl LeaveStore for MemoryLeaveStore {
    async fn create_account(&self, account: &Account, employee: &Employee) -> Result<(), StoreError> {
        {
            let mut inner = self.inner.lock().await;
            if inner.accounts.contains_key(&account.email) {
                return Err(StoreError::DuplicateEmail(account.email.clone()));
            }
            inner.accounts.insert(account.email.clone(), account.clone());
            inner.users.insert(employee.uid.clone(), employee.clone());
        }
        self.publish(Collection::Users, employee.uid.clone());
        Ok(())
    }

    async fn find_account(&self, email: &str) -> Result<Option<Account>, StoreError> {
        Ok(self.inner.lock().await.accounts.get(email).cloned())
    }

    async fn get_employee(&self, uid: &str) -> Result<Option<Employee>, StoreError> {
        Ok(self.inner.lock().await.users.get(uid).cloned())
    }

    async fn list_employees(&self) -> Result<Vec<Employee>, StoreError> {
        let mut users: Vec<Employee> = self.inner.lock().await.users.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.uid.cmp(&b.uid)));
        Ok(users)
    }

    async fn increment_leave_amount(&self, uid: &str, delta: i64) -> Result<i64, StoreError> {
        let balance = {
            let mut inner = self.inner.lock().await;
            let employee = inner
                .users
                .get_mut(uid)
                .ok_or_else(|| StoreError::EmployeeNotFound(uid.to_string()))?;
            employee.leave_amount += delta;
            employee.leave_amount
        };
        self.publish(Collection::Users, uid.to_string());
        Ok(balance)
    }

    async fn create_request(
        &self,
        request: NewLeaveRequest,
        policy: BalancePolicy,
    ) -> Result<LeaveRequest, StoreError> {
        let id = Uuid::new_v4().to_string();
        let uid = request.employee_id.clone();
        let created = {
            let mut inner = self.inner.lock().await;
            let balance = inner
                .users
                .get(&uid)
                .map(|e| e.leave_amount)
                .ok_or_else(|| StoreError::EmployeeNotFound(uid.clone()))?;

            if policy == BalancePolicy::RequireAvailable {
                let available = balance - inner.pending_days(&uid);
                if request.days_requested > available {
                    return Err(StoreError::InsufficientBalance {
                        requested: request.days_requested,
                        available,
                    });
                }
            }

            let created = request.into_request(id.clone());
            if policy == BalancePolicy::Debit {
                if let Some(employee) = inner.users.get_mut(&uid) {
                    employee.leave_amount -= created.days_requested;
                }
            }
            inner.requests.insert(id.clone(), created.clone());
            created
        };

        self.publish(Collection::Requests, id);
        if policy == BalancePolicy::Debit {
            self.publish(Collection::Users, uid);
        }
        Ok(created)
    }

    async fn get_request(&self, id: &str) -> Result<Option<LeaveRequest>, StoreError> {
        Ok(self.inner.lock().await.requests.get(id).cloned())
    }

    async fn list_requests(&self, query: &RequestQuery) -> Result<Vec<LeaveRequest>, StoreError> {
        let mut requests: Vec<LeaveRequest> = self
            .inner
            .lock()
            .await
            .requests
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        sort_newest_first(&mut requests);
        Ok(requests)
    }

    async fn page_requests(
        &self,
        query: &RequestQuery,
        page: Page,
    ) -> Result<(Vec<LeaveRequest>, u64), StoreError> {
        let requests = self.list_requests(query).await?;
        let total = requests.len() as u64;
        let offset = usize::try_from(page.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit).unwrap_or(usize::MAX);

        Ok((requests.into_iter().skip(offset).take(limit).collect(), total))
    }

    async fn decide_request(&self, id: &str, decision: Decision) -> Result<LeaveRequest, StoreError> {
        let decided = {
            let mut inner = self.inner.lock().await;
            let current = inner
                .requests
                .get(id)
                .ok_or_else(|| StoreError::RequestNotFound(id.to_string()))?;
            if current.status.is_terminal() {
                return Err(StoreError::AlreadyDecided(current.status));
            }
            let owner = current.employee_id.clone();
            let days = current.days_requested;

            if decision == Decision::Approved {
                let employee = inner
                    .users
                    .get_mut(&owner)
                    .ok_or_else(|| StoreError::EmployeeNotFound(owner.clone()))?;
                employee.leave_amount -= days;
            }

            let request = inner
                .requests
                .get_mut(id)
                .ok_or_else(|| StoreError::RequestNotFound(id.to_string()))?;
            request.status = decision.into();
            request.clone()
        };

        self.publish(Collection::Requests, decided.id.clone());
        if decision == Decision::Approved {
            self.publish(Collection::Users, decided.employee_id.clone());
        }
        Ok(decided)
    }

    fn changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}
