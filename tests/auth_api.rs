mod support;

use std::time::Duration;

use actix_web::{http::StatusCode, test};
use serde_json::{Value, json};

use support::{TestContext, authed, leave_body, login_request, peer, signup_request};

#[actix_web::test]
async fn signup_returns_token_and_default_profile() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;

    let resp = test::call_service(&app, signup_request("Jane", "Jane@Company.com").to_request()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = test::read_body_json(resp).await;
    assert!(body["access_token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["expires_in"], 900);
    assert_eq!(body["profile"]["email"], "jane@company.com");
    assert_eq!(body["profile"]["userType"], "employee");
    assert_eq!(body["profile"]["leaveAmount"], 15);
}

#[actix_web::test]
async fn duplicate_email_conflicts() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;

    test::call_service(&app, signup_request("Jane", "jane@company.com").to_request()).await;
    let resp = test::call_service(&app, signup_request("Other", "JANE@company.com").to_request()).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "CONFLICT");
}

#[actix_web::test]
async fn signup_requires_all_fields() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;

    let req = test::TestRequest::post()
        .uri("/auth/signup")
        .peer_addr(peer())
        .set_json(json!({ "name": " ", "email": "jane@company.com", "password": "x" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn login_rejects_bad_credentials() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;
    test::call_service(&app, signup_request("Jane", "jane@company.com").to_request()).await;

    let resp = test::call_service(&app, login_request("jane@company.com", "wrong").to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = test::call_service(&app, login_request("nobody@company.com", "wrong").to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = test::call_service(&app, login_request("jane@company.com", support::PASSWORD).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn protected_routes_need_a_bearer_token() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;

    let req = test::TestRequest::get().uri("/api/me").peer_addr(peer()).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = authed(test::TestRequest::get().uri("/api/me"), "not-a-jwt").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn logout_revokes_the_token() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;
    let body: Value =
        test::call_and_read_body_json(&app, signup_request("Jane", "jane@company.com").to_request()).await;
    let token = body["access_token"].as_str().unwrap();

    let req = authed(test::TestRequest::get().uri("/api/me"), token).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = authed(test::TestRequest::post().uri("/auth/logout"), token).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

    let req = authed(test::TestRequest::get().uri("/api/me"), token).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    // Signing out twice, or without a token, is still a success.
    let req = authed(test::TestRequest::post().uri("/auth/logout"), token).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
    let req = test::TestRequest::post().uri("/auth/logout").peer_addr(peer()).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
}

#[actix_web::test]
async fn me_follows_balance_changes() {
    let ctx = TestContext::new();
    ctx.seed_admin("Boss", "boss@company.com").await;
    let app = test::init_service(ctx.app()).await;

    let body: Value =
        test::call_and_read_body_json(&app, signup_request("Jane", "jane@company.com").to_request()).await;
    let token = body["access_token"].as_str().unwrap();
    let body: Value = test::call_and_read_body_json(
        &app,
        login_request("boss@company.com", support::PASSWORD).to_request(),
    )
    .await;
    let admin = body["access_token"].as_str().unwrap();

    let req = authed(test::TestRequest::post().uri("/api/leave"), token)
        .set_json(leave_body("2024-01-01", "2024-01-04"))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let id = created["id"].as_str().unwrap();

    let req = authed(test::TestRequest::get().uri("/api/me"), token).to_request();
    let me: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(me["pendingRequests"], 1);

    let req = authed(
        test::TestRequest::put().uri(&format!("/api/admin/leave/{id}/approve")),
        admin,
    )
    .to_request();
    test::call_service(&app, req).await;

    // Profiles are refreshed from the change feed in the background.
    let mut me = Value::Null;
    for _ in 0..50 {
        let req = authed(test::TestRequest::get().uri("/api/me"), token).to_request();
        me = test::call_and_read_body_json(&app, req).await;
        if me["leaveAmount"] == 11 {
            break;
        }
        actix_web::rt::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(me["leaveAmount"], 11);
    assert_eq!(me["pendingRequests"], 0);
}

#[actix_web::test]
async fn admin_directory_lists_every_profile() {
    let ctx = TestContext::new();
    ctx.seed_admin("Boss", "boss@company.com").await;
    let app = test::init_service(ctx.app()).await;
    test::call_service(&app, signup_request("Jane", "jane@company.com").to_request()).await;

    let body: Value = test::call_and_read_body_json(
        &app,
        login_request("boss@company.com", support::PASSWORD).to_request(),
    )
    .await;
    let admin = body["access_token"].as_str().unwrap();

    let req = authed(test::TestRequest::get().uri("/api/admin/employees"), admin).to_request();
    let list: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(list["total"], 2);
    let emails: Vec<&str> = list["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["email"].as_str())
        .collect();
    assert!(emails.contains(&"jane@company.com"));
    assert!(emails.contains(&"boss@company.com"));
}
