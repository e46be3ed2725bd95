use axum::http::StatusCode;
use campus_events::modules::auth::interface::RefreshTokenRepository;
use campus_events::modules::auth::model::Role;
use chrono::Utc;

use crate::common::{test_password, TestContext};

#[tokio::test]
async fn logout_blacklists_the_access_token() {
    let ctx = TestContext::new().await;
    let user = ctx.student().await;

    ctx.server
        .post("/auth/logout")
        .authorization_bearer(&user.access_token)
        .await
        .assert_status(StatusCode::OK);

    let response = ctx
        .server
        .get("/auth/me")
        .authorization_bearer(&user.access_token)
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    let body: serde_json::Value = response.json();
    assert_eq!(body["errorCode"], "TOKEN_REVOKED");
}

#[tokio::test]
async fn logout_revokes_the_refresh_session_and_clears_the_cookie() {
    let ctx = TestContext::new().await;
    let (user_id, email) = ctx.create_user(Role::Student).await;
    let login = ctx.login(&email, test_password()).await;
    let body: serde_json::Value = login.json();

    let response = ctx
        .server
        .post("/auth/logout")
        .authorization_bearer(body["accessToken"].as_str().unwrap())
        .add_cookie(login.cookie("refreshToken"))
        .await;

    response.assert_status(StatusCode::OK);
    assert_eq!(response.cookie("refreshToken").value(), "");

    let live = ctx
        .store
        .list_live_refresh_tokens(&user_id, Utc::now())
        .await
        .unwrap();
    assert!(live.is_empty());
}

#[tokio::test]
async fn logout_twice_succeeds_both_times() {
    let ctx = TestContext::new().await;
    let (_, email) = ctx.create_user(Role::Student).await;
    let login = ctx.login(&email, test_password()).await;
    let body: serde_json::Value = login.json();
    let access_token = body["accessToken"].as_str().unwrap().to_string();
    let cookie = login.cookie("refreshToken");

    for _ in 0..2 {
        ctx.server
            .post("/auth/logout")
            .authorization_bearer(&access_token)
            .add_cookie(cookie.clone())
            .await
            .assert_status(StatusCode::OK);
    }
}

#[tokio::test]
async fn logout_with_garbage_tokens_still_succeeds() {
    let ctx = TestContext::new().await;

    let response = ctx
        .server
        .post("/auth/logout")
        .authorization_bearer("not.a.jwt")
        .await;

    response.assert_status(StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "Logged out successfully");
}

#[tokio::test]
async fn logout_leaves_other_sessions_alone() {
    let ctx = TestContext::new().await;
    let (user_id, email) = ctx.create_user(Role::Student).await;
    let laptop = ctx.login(&email, test_password()).await.cookie("refreshToken");
    let phone = ctx.login(&email, test_password()).await.cookie("refreshToken");

    ctx.server
        .post("/auth/logout")
        .add_cookie(laptop)
        .await
        .assert_status(StatusCode::OK);

    let live = ctx
        .store
        .list_live_refresh_tokens(&user_id, Utc::now())
        .await
        .unwrap();
    assert_eq!(live.len(), 1);

    ctx.server
        .post("/auth/refresh")
        .add_cookie(phone)
        .await
        .assert_status(StatusCode::OK);
}
