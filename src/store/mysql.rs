use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use futures_util::TryStreamExt;
use sqlx::{FromRow, MySql, MySqlPool, QueryBuilder, Transaction};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use super::{
    BalancePolicy, CHANGE_CHANNEL_CAPACITY, ChangeEvent, Collection, LeaveStore, Page,
    RequestQuery, StoreError,
};
use crate::model::{
    account::Account,
    employee::{DEFAULT_LEAVE_AMOUNT, Employee, UserType},
    leave_request::{Decision, LeaveRequest, NewLeaveRequest, RequestStatus},
};

const MYSQL_DUPLICATE_KEY: &str = "23000";

#[derive(FromRow)]
struct UserRow {
    uid: String,
    name: String,
    email: String,
    user_type: String,
    leave_amount: Option<i64>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for Employee {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let user_type = row
            .user_type
            .parse::<UserType>()
            .map_err(|_| StoreError::Corrupt(format!("user {} has type {:?}", row.uid, row.user_type)))?;
        Ok(Employee {
            uid: row.uid,
            name: row.name,
            email: row.email,
            user_type,
            leave_amount: row.leave_amount.unwrap_or(DEFAULT_LEAVE_AMOUNT),
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct RequestRow {
    id: String,
    employee_id: String,
    employee_name: String,
    employee_email: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    days_requested: i64,
    manager_remarks: Option<String>,
    status: String,
    submission_date: DateTime<Utc>,
}

impl TryFrom<RequestRow> for LeaveRequest {
    type Error = StoreError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<RequestStatus>()
            .map_err(|_| StoreError::Corrupt(format!("request {} has status {:?}", row.id, row.status)))?;
        Ok(LeaveRequest {
            id: row.id,
            employee_id: row.employee_id,
            employee_name: row.employee_name,
            employee_email: row.employee_email,
            start_date: row.start_date,
            end_date: row.end_date,
            days_requested: row.days_requested,
            manager_remarks: row.manager_remarks,
            status,
            submission_date: row.submission_date,
        })
    }
}

const SELECT_USER: &str = r#"
    SELECT uid, name, email, user_type, leave_amount, created_at
    FROM users
"#;

const SELECT_REQUEST: &str = r#"
    SELECT id, employee_id, employee_name, employee_email, start_date, end_date,
           days_requested, manager_remarks, status, submission_date
    FROM requests
"#;

/// MySQL-backed store. Compound operations run in one transaction with the
/// owner's `users` row locked, so they serialise against each other.
pub struct MySqlLeaveStore {
    pool: MySqlPool,
    changes: broadcast::Sender<ChangeEvent>,
}

impl MySqlLeaveStore {
    pub fn new(pool: MySqlPool) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { pool, changes }
    }

    fn publish(&self, collection: Collection, id: String) {
        let _ = self.changes.send(ChangeEvent { collection, id });
    }

    /// Locks the owner's row and returns its balance.
    async fn lock_balance(tx: &mut Transaction<'_, MySql>, uid: &str) -> Result<i64, StoreError> {
        let balance = sqlx::query_scalar::<_, Option<i64>>(
            "SELECT leave_amount FROM users WHERE uid = ? FOR UPDATE",
        )
        .bind(uid)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| StoreError::EmployeeNotFound(uid.to_string()))?;

        Ok(balance.unwrap_or(DEFAULT_LEAVE_AMOUNT))
    }

    async fn debit(tx: &mut Transaction<'_, MySql>, uid: &str, days: i64) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE users SET leave_amount = COALESCE(leave_amount, ?) - ? WHERE uid = ?",
        )
        .bind(DEFAULT_LEAVE_AMOUNT)
        .bind(days)
        .bind(uid)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::EmployeeNotFound(uid.to_string()));
        }
        Ok(())
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, MySql>, query: &RequestQuery) {
    builder.push(" WHERE 1=1");
    if let Some(email) = &query.employee_email {
        builder.push(" AND employee_email = ").push_bind(email.clone());
    }
    if let Some(status) = query.status {
        builder.push(" AND status = ").push_bind(status.as_ref().to_string());
    }
}

fn is_duplicate(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(MYSQL_DUPLICATE_KEY))
}

#[async_trait]
impl LeaveStore for MySqlLeaveStore {
    async fn create_account(&self, account: &Account, employee: &Employee) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO accounts (uid, email, password_hash) VALUES (?, ?, ?)")
            .bind(&account.uid)
            .bind(&account.email)
            .bind(&account.password_hash)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_duplicate(&e) {
                    StoreError::DuplicateEmail(account.email.clone())
                } else {
                    e.into()
                }
            })?;

        sqlx::query(
            r#"
            INSERT INTO users (uid, name, email, user_type, leave_amount, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&employee.uid)
        .bind(&employee.name)
        .bind(&employee.email)
        .bind(employee.user_type.as_ref())
        .bind(employee.leave_amount)
        .bind(employee.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.publish(Collection::Users, employee.uid.clone());
        Ok(())
    }

    async fn find_account(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query_as::<_, (String, String, String)>(
            "SELECT uid, email, password_hash FROM accounts WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(uid, email, password_hash)| Account {
            uid,
            email,
            password_hash,
        }))
    }

    async fn get_employee(&self, uid: &str) -> Result<Option<Employee>, StoreError> {
        sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} WHERE uid = ?"))
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?
            .map(Employee::try_from)
            .transpose()
    }

    async fn list_employees(&self) -> Result<Vec<Employee>, StoreError> {
        let sql = format!("{SELECT_USER} ORDER BY created_at ASC, uid ASC");
        let mut rows = sqlx::query_as::<_, UserRow>(&sql).fetch(&self.pool);

        let mut employees = Vec::new();
        while let Some(row) = rows.try_next().await? {
            employees.push(Employee::try_from(row)?);
        }
        Ok(employees)
    }

    async fn increment_leave_amount(&self, uid: &str, delta: i64) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Single-statement update; the read below only reports the result.
        let result = sqlx::query(
            "UPDATE users SET leave_amount = COALESCE(leave_amount, ?) + ? WHERE uid = ?",
        )
        .bind(DEFAULT_LEAVE_AMOUNT)
        .bind(delta)
        .bind(uid)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::EmployeeNotFound(uid.to_string()));
        }

        let balance = sqlx::query_scalar::<_, Option<i64>>("SELECT leave_amount FROM users WHERE uid = ?")
            .bind(uid)
            .fetch_one(&mut *tx)
            .await?
            .unwrap_or(DEFAULT_LEAVE_AMOUNT);

        tx.commit().await?;
        self.publish(Collection::Users, uid.to_string());
        Ok(balance)
    }

    async fn create_request(
        &self,
        request: NewLeaveRequest,
        policy: BalancePolicy,
    ) -> Result<LeaveRequest, StoreError> {
        let id = Uuid::new_v4().to_string();
        let mut tx = self.pool.begin().await?;

        let balance = Self::lock_balance(&mut tx, &request.employee_id).await?;

        match policy {
            BalancePolicy::RequireAvailable => {
                let pending: i64 = sqlx::query_scalar::<_, Option<i64>>(
                    r#"
                    SELECT CAST(SUM(days_requested) AS SIGNED)
                    FROM requests
                    WHERE employee_id = ? AND status = ?
                    "#,
                )
                .bind(&request.employee_id)
                .bind(RequestStatus::Pending.as_ref())
                .fetch_one(&mut *tx)
                .await?
                .unwrap_or(0);

                let available = balance - pending;
                if request.days_requested > available {
                    debug!(
                        employee_id = %request.employee_id,
                        requested = request.days_requested,
                        available,
                        "Balance check refused insert"
                    );
                    return Err(StoreError::InsufficientBalance {
                        requested: request.days_requested,
                        available,
                    });
                }
            }
            BalancePolicy::Debit => {
                Self::debit(&mut tx, &request.employee_id, request.days_requested).await?;
            }
        }

        sqlx::query(
            r#"
            INSERT INTO requests
                (id, employee_id, employee_name, employee_email, start_date, end_date,
                 days_requested, manager_remarks, status, submission_date)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&request.employee_id)
        .bind(&request.employee_name)
        .bind(&request.employee_email)
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(request.days_requested)
        .bind(&request.manager_remarks)
        .bind(request.status.as_ref())
        .bind(request.submission_date)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let created = request.into_request(id.clone());
        self.publish(Collection::Requests, id);
        if policy == BalancePolicy::Debit {
            self.publish(Collection::Users, created.employee_id.clone());
        }
        Ok(created)
    }

    async fn get_request(&self, id: &str) -> Result<Option<LeaveRequest>, StoreError> {
        sqlx::query_as::<_, RequestRow>(&format!("{SELECT_REQUEST} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(LeaveRequest::try_from)
            .transpose()
    }

    async fn list_requests(&self, query: &RequestQuery) -> Result<Vec<LeaveRequest>, StoreError> {
        let mut builder = QueryBuilder::<MySql>::new(SELECT_REQUEST);
        push_filters(&mut builder, query);
        builder.push(" ORDER BY submission_date DESC, id ASC");

        let mut rows = builder.build_query_as::<RequestRow>().fetch(&self.pool);
        let mut requests = Vec::new();
        while let Some(row) = rows.try_next().await? {
            requests.push(LeaveRequest::try_from(row)?);
        }
        Ok(requests)
    }

    async fn page_requests(
        &self,
        query: &RequestQuery,
        page: Page,
    ) -> Result<(Vec<LeaveRequest>, u64), StoreError> {
        let mut count = QueryBuilder::<MySql>::new("SELECT COUNT(*) FROM requests");
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut builder = QueryBuilder::<MySql>::new(SELECT_REQUEST);
        push_filters(&mut builder, query);
        builder
            .push(" ORDER BY submission_date DESC, id ASC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);

        let mut rows = builder.build_query_as::<RequestRow>().fetch(&self.pool);
        let mut requests = Vec::new();
        while let Some(row) = rows.try_next().await? {
            requests.push(LeaveRequest::try_from(row)?);
        }
        Ok((requests, total.max(0) as u64))
    }

    async fn decide_request(&self, id: &str, decision: Decision) -> Result<LeaveRequest, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, RequestRow>(&format!("{SELECT_REQUEST} WHERE id = ? FOR UPDATE"))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::RequestNotFound(id.to_string()))?;
        let mut request = LeaveRequest::try_from(row)?;

        if request.status.is_terminal() {
            return Err(StoreError::AlreadyDecided(request.status));
        }

        let status: RequestStatus = decision.into();
        let result = sqlx::query("UPDATE requests SET status = ? WHERE id = ? AND status = ?")
            .bind(status.as_ref())
            .bind(id)
            .bind(RequestStatus::Pending.as_ref())
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyDecided(request.status));
        }

        if decision == Decision::Approved {
            // Rolls back the status write when the owner is gone.
            Self::debit(&mut tx, &request.employee_id, request.days_requested).await?;
        }

        tx.commit().await?;
        request.status = status;

        self.publish(Collection::Requests, request.id.clone());
        if decision == Decision::Approved {
            self.publish(Collection::Users, request.employee_id.clone());
        }
        Ok(request)
    }

    fn changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}
