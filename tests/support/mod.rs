#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::{
    App,
    body::BoxBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    test,
    web::Data,
};
use serde_json::{Value, json};

use lms::auth::handlers::register_account;
use lms::config::{Config, StoreBackend};
use lms::model::employee::{Employee, UserType};
use lms::routes;
use lms::state::AppState;
use lms::store::{LeaveStore, MemoryLeaveStore};

pub const PASSWORD: &str = "correct horse battery staple";

pub fn peer() -> SocketAddr {
    "127.0.0.1:40000".parse().expect("peer addr")
}

pub fn test_config() -> Config {
    Config {
        server_addr: "127.0.0.1:0".into(),
        store_backend: StoreBackend::Memory,
        database_url: None,
        jwt_secret: "test-secret".into(),
        access_token_ttl: 900,
        log_dir: "logs".into(),
        profile_cache_capacity: 1_000,
        rate_auth_per_min: 10_000,
        rate_protected_per_min: 10_000,
        api_prefix: "/api".into(),
        bootstrap_admin: None,
    }
}

pub struct TestContext {
    pub store: Arc<MemoryLeaveStore>,
    pub state: Data<AppState>,
    pub config: Config,
}

impl TestContext {
    /// Must be called inside the actix test runtime; starts profile sync.
    pub fn new() -> Self {
        let store = Arc::new(MemoryLeaveStore::new());
        let config = test_config();
        let state = Data::new(AppState::new(store.clone(), &config));
        let changes = state.sessions.subscribe();
        actix_web::rt::spawn(state.sessions.clone().follow_changes(changes));
        Self { store, state, config }
    }

    pub fn app(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<BoxBody>,
            Error = actix_web::Error,
            InitError = (),
        > + use<>,
    > {
        let config = self.config.clone();
        App::new()
            .app_data(self.state.clone())
            .app_data(Data::new(self.config.clone()))
            .configure(move |cfg| routes::configure(cfg, config))
    }

    pub async fn seed_admin(&self, name: &str, email: &str) -> Employee {
        register_account(&self.state, name, email, PASSWORD, UserType::Admin)
            .await
            .expect("seed admin")
    }

    pub async fn set_balance(&self, uid: &str, balance: i64) {
        let current = self.balance(uid).await;
        self.store
            .increment_leave_amount(uid, balance - current)
            .await
            .expect("set balance");
    }

    pub async fn balance(&self, uid: &str) -> i64 {
        self.store
            .get_employee(uid)
            .await
            .expect("store read")
            .expect("employee exists")
            .leave_amount
    }
}

pub fn signup_request(name: &str, email: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/auth/signup")
        .peer_addr(peer())
        .set_json(json!({ "name": name, "email": email, "password": PASSWORD }))
}

pub fn login_request(email: &str, password: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/auth/login")
        .peer_addr(peer())
        .set_json(json!({ "email": email, "password": password }))
}

pub fn authed(req: test::TestRequest, token: &str) -> test::TestRequest {
    req.peer_addr(peer())
        .insert_header(("Authorization", format!("Bearer {token}")))
}

pub fn leave_body(start: &str, end: &str) -> Value {
    json!({ "startDate": start, "endDate": end, "managerRemarks": "" })
}
