//! Runs against a live MySQL server named by `DATABASE_URL`:
//! `cargo test --test mysql_store -- --ignored`

use std::sync::Arc;

use uuid::Uuid;

use lms::db::init_db;
use lms::ledger::{LeaveApplication, LeaveLedger, LedgerError};
use lms::model::{
    account::Account,
    employee::{Employee, UserType},
    leave_request::{Decision, RequestStatus},
};
use lms::store::{LeaveStore, MySqlLeaveStore, Page, RequestQuery};

async fn connect() -> Arc<MySqlLeaveStore> {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = init_db(&url).await.expect("connect to database");
    Arc::new(MySqlLeaveStore::new(pool))
}

/// Creates a fresh profile so runs do not collide.
async fn employee(store: &MySqlLeaveStore, balance: i64, user_type: UserType) -> Employee {
    let uid = Uuid::new_v4().to_string();
    let email = format!("{uid}@company.com");
    let account = Account {
        uid: uid.clone(),
        email: email.clone(),
        password_hash: "unused".into(),
    };
    let profile = Employee::new(uid.clone(), "Jane".into(), email, user_type);
    store.create_account(&account, &profile).await.unwrap();
    store
        .increment_leave_amount(&uid, balance - profile.leave_amount)
        .await
        .unwrap();
    store.get_employee(&uid).await.unwrap().unwrap()
}

fn application(start: &str, end: &str) -> LeaveApplication {
    LeaveApplication {
        start_date: Some(start.into()),
        end_date: Some(end.into()),
        remarks: None,
    }
}

async fn balance(store: &MySqlLeaveStore, uid: &str) -> i64 {
    store.get_employee(uid).await.unwrap().unwrap().leave_amount
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn submission_is_pending_and_approval_debits() {
    let store = connect().await;
    let ledger = LeaveLedger::new(store.clone());
    let jane = employee(&store, 15, UserType::Employee).await;

    let request = ledger
        .submit_request(&jane, application("2024-01-01", "2024-01-05"))
        .await
        .unwrap();
    assert_eq!(request.status, RequestStatus::Pending);
    assert_eq!(request.days_requested, 5);
    assert_eq!(balance(&store, &jane.uid).await, 15);

    let decided = ledger.decide_request(&request.id, Decision::Approved).await.unwrap();
    assert_eq!(decided.status, RequestStatus::Approved);
    assert_eq!(balance(&store, &jane.uid).await, 10);

    let stored = store.get_request(&request.id).await.unwrap().unwrap();
    assert_eq!(stored.status, RequestStatus::Approved);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn insufficient_balance_writes_nothing() {
    let store = connect().await;
    let ledger = LeaveLedger::new(store.clone());
    let jane = employee(&store, 2, UserType::Employee).await;

    let err = ledger
        .submit_request(&jane, application("2024-01-01", "2024-01-05"))
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::InsufficientBalance { requested: 5, available: 2 }));
    let mine = store
        .list_requests(&RequestQuery::for_email(&jane.email))
        .await
        .unwrap();
    assert!(mine.is_empty());
    assert_eq!(balance(&store, &jane.uid).await, 2);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn pending_days_are_reserved() {
    let store = connect().await;
    let ledger = LeaveLedger::new(store.clone());
    let jane = employee(&store, 5, UserType::Employee).await;

    ledger
        .submit_request(&jane, application("2024-01-01", "2024-01-03"))
        .await
        .unwrap();
    let err = ledger
        .submit_request(&jane, application("2024-02-01", "2024-02-03"))
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::InsufficientBalance { available: 2, .. }));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn rejection_leaves_balance_untouched() {
    let store = connect().await;
    let ledger = LeaveLedger::new(store.clone());
    let jane = employee(&store, 15, UserType::Employee).await;

    let request = ledger
        .submit_request(&jane, application("2024-03-10", "2024-03-12"))
        .await
        .unwrap();
    let decided = ledger.decide_request(&request.id, Decision::Rejected).await.unwrap();

    assert_eq!(decided.status, RequestStatus::Rejected);
    assert_eq!(balance(&store, &jane.uid).await, 15);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn admin_self_service_is_approved_and_debited() {
    let store = connect().await;
    let ledger = LeaveLedger::new(store.clone());
    let admin = employee(&store, 1, UserType::Admin).await;

    let request = ledger
        .submit_and_approve(&admin, application("2024-01-01", "2024-01-03"))
        .await
        .unwrap();

    assert_eq!(request.status, RequestStatus::Approved);
    assert_eq!(balance(&store, &admin.uid).await, -2);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn concurrent_double_approval_debits_once() {
    let store = connect().await;
    let ledger = LeaveLedger::new(store.clone());
    let jane = employee(&store, 15, UserType::Employee).await;
    let request = ledger
        .submit_request(&jane, application("2024-01-01", "2024-01-03"))
        .await
        .unwrap();

    let (first, second) = tokio::join!(
        ledger.decide_request(&request.id, Decision::Approved),
        ledger.decide_request(&request.id, Decision::Approved),
    );

    let conflicts = [&first, &second]
        .iter()
        .filter(|r| matches!(r, Err(LedgerError::AlreadyDecided(RequestStatus::Approved))))
        .count();
    assert_eq!(conflicts, 1);
    assert_eq!(balance(&store, &jane.uid).await, 12);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn paging_counts_every_match() {
    let store = connect().await;
    let ledger = LeaveLedger::new(store.clone());
    let jane = employee(&store, 15, UserType::Employee).await;
    for day in ["2024-01-01", "2024-01-02", "2024-01-03"] {
        ledger.submit_request(&jane, application(day, day)).await.unwrap();
    }

    let query = RequestQuery::for_email(&jane.email);
    let (first, total) = store.page_requests(&query, Page::numbered(1, 2)).await.unwrap();
    assert_eq!(total, 3);
    assert_eq!(first.len(), 2);

    let (beyond, _) = store
        .page_requests(&query, Page::numbered(u64::MAX, 100))
        .await
        .unwrap();
    assert!(beyond.is_empty());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn null_balance_reads_and_moves_from_default() {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = init_db(&url).await.unwrap();
    let store = MySqlLeaveStore::new(pool.clone());

    let uid = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO users (uid, name, email, user_type, leave_amount, created_at) \
         VALUES (?, 'Legacy', ?, 'employee', NULL, NOW(3))",
    )
    .bind(&uid)
    .bind(format!("{uid}@company.com"))
    .execute(&pool)
    .await
    .unwrap();

    assert_eq!(balance(&store, &uid).await, 15);
    assert_eq!(store.increment_leave_amount(&uid, -1).await.unwrap(), 14);
}
