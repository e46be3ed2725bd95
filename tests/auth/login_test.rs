use axum::http::StatusCode;
use campus_events::modules::auth::interface::RefreshTokenRepository;
use campus_events::modules::auth::model::Role;
use chrono::Utc;

use crate::common::{test_email, test_password, TestContext};

#[tokio::test]
async fn login_with_valid_credentials_returns_tokens() {
    let ctx = TestContext::new().await;
    let (_, email) = ctx.create_user(Role::Student).await;

    let response = ctx.login(&email, test_password()).await;

    response.assert_status(StatusCode::OK);

    let body: serde_json::Value = response.json();
    assert!(body.get("accessToken").is_some());
    assert_eq!(body["tokenType"], "Bearer");
    assert_eq!(body["expiresIn"], 900);
    assert!(body.get("refreshToken").is_none());

    let cookie = response.cookie("refreshToken");
    assert!(!cookie.value().is_empty());
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.path(), Some("/auth"));
    assert_eq!(
        cookie.same_site(),
        Some(axum_extra::extract::cookie::SameSite::Strict)
    );
    assert_eq!(cookie.max_age().map(|d| d.whole_seconds()), Some(7 * 24 * 60 * 60));
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let ctx = TestContext::new().await;
    let (_, email) = ctx.create_user(Role::Student).await;

    let wrong_password = ctx.login(&email, "WrongPassword123!").await;
    let unknown_email = ctx.login(&test_email(), test_password()).await;

    wrong_password.assert_status(StatusCode::UNAUTHORIZED);
    unknown_email.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.as_bytes(), unknown_email.as_bytes());

    let body: serde_json::Value = wrong_password.json();
    assert_eq!(body["errorCode"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn email_lookup_ignores_case() {
    let ctx = TestContext::new().await;
    let (_, email) = ctx.create_user(Role::Student).await;

    let response = ctx.login(&email.to_uppercase(), test_password()).await;

    response.assert_status(StatusCode::OK);
}

#[tokio::test]
async fn a_user_never_holds_more_than_three_sessions() {
    let ctx = TestContext::new().await;
    let (user_id, email) = ctx.create_user(Role::Student).await;

    for _ in 0..5 {
        ctx.login(&email, test_password())
            .await
            .assert_status(StatusCode::OK);
    }

    let live = ctx
        .store
        .list_live_refresh_tokens(&user_id, Utc::now())
        .await
        .unwrap();
    assert_eq!(live.len(), 3);
    assert_eq!(ctx.store.list_refresh_tokens(&user_id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn fourth_login_evicts_the_oldest_session() {
    let ctx = TestContext::new().await;
    let (_, email) = ctx.create_user(Role::Student).await;

    let first = ctx.login(&email, test_password()).await.cookie("refreshToken");
    for _ in 0..3 {
        ctx.login(&email, test_password()).await;
    }

    let response = ctx.server.post("/auth/refresh").add_cookie(first).await;

    response.assert_status(StatusCode::FORBIDDEN);
    let body: serde_json::Value = response.json();
    assert_eq!(body["errorCode"], "SESSION_MISMATCH");
}

#[tokio::test]
async fn malformed_json_uses_the_error_envelope() {
    let ctx = TestContext::new().await;

    let response = ctx
        .server
        .post("/auth/login")
        .content_type("application/json")
        .bytes("{not json".into())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["errorCode"], "VALIDATION_ERROR");
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
}
