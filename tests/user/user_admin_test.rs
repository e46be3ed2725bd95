use axum::http::StatusCode;
use campus_events::modules::auth::interface::RefreshTokenRepository;
use chrono::Utc;
use serde_json::{json, Value};

use crate::common::{test_password, TestContext};

#[tokio::test]
async fn super_admin_lists_and_filters_users() {
    let ctx = TestContext::new().await;
    let super_admin = ctx.super_admin().await;
    ctx.student().await;
    ctx.student().await;
    ctx.admin().await;

    let all: Vec<Value> = ctx
        .server
        .get("/users")
        .authorization_bearer(&super_admin.access_token)
        .await
        .json();
    assert_eq!(all.len(), 4);
    assert!(all.iter().all(|u| u.get("passwordHash").is_none()));

    let students: Vec<Value> = ctx
        .server
        .get("/users")
        .add_query_param("role", "student")
        .authorization_bearer(&super_admin.access_token)
        .await
        .json();
    assert_eq!(students.len(), 2);
}

#[tokio::test]
async fn other_roles_cannot_manage_users() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin().await;
    let student = ctx.student().await;

    for user in [&admin, &student] {
        let response = ctx.server.get("/users").authorization_bearer(&user.access_token).await;
        response.assert_status(StatusCode::FORBIDDEN);
    }
    ctx.server
        .patch(&format!("/users/{}/role", student.id))
        .authorization_bearer(&admin.access_token)
        .json(&json!({ "role": "admin" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn promoting_a_student_grants_admin_rights() {
    let ctx = TestContext::new().await;
    let super_admin = ctx.super_admin().await;
    let student = ctx.student().await;

    let response = ctx
        .server
        .patch(&format!("/users/{}/role", student.id))
        .authorization_bearer(&super_admin.access_token)
        .json(&json!({ "role": "admin" }))
        .await;
    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["role"], "admin");

    // The role is read fresh on every request.
    ctx.server
        .post("/event")
        .authorization_bearer(&student.access_token)
        .multipart(crate::common::event_form("Newly Promoted"))
        .await
        .assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn super_admin_cannot_demote_themselves() {
    let ctx = TestContext::new().await;
    let super_admin = ctx.super_admin().await;

    ctx.server
        .patch(&format!("/users/{}/role", super_admin.id))
        .authorization_bearer(&super_admin.access_token)
        .json(&json!({ "role": "student" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_users_are_not_found() {
    let ctx = TestContext::new().await;
    let super_admin = ctx.super_admin().await;

    ctx.server
        .patch("/users/missing/role")
        .authorization_bearer(&super_admin.access_token)
        .json(&json!({ "role": "admin" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    ctx.server
        .delete("/users/missing")
        .authorization_bearer(&super_admin.access_token)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleted_users_lose_access_and_keep_their_email() {
    let ctx = TestContext::new().await;
    let super_admin = ctx.super_admin().await;
    let student = ctx.student().await;
    let cookie = ctx.login(&student.email, test_password()).await.cookie("refreshToken");

    ctx.server
        .delete(&format!("/users/{}", student.id))
        .authorization_bearer(&super_admin.access_token)
        .await
        .assert_status(StatusCode::OK);

    let live = ctx
        .store
        .list_live_refresh_tokens(&student.id, Utc::now())
        .await
        .unwrap();
    assert!(live.is_empty());

    ctx.server
        .get("/auth/me")
        .authorization_bearer(&student.access_token)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    ctx.server
        .post("/auth/refresh")
        .add_cookie(cookie)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    ctx.login(&student.email, test_password())
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let response = ctx
        .server
        .post("/auth/register")
        .json(&json!({
            "name": "Someone Else",
            "email": &student.email,
            "password": test_password(),
        }))
        .await;
    response.assert_status(StatusCode::CONFLICT);

    let listed: Vec<Value> = ctx
        .server
        .get("/users")
        .authorization_bearer(&super_admin.access_token)
        .await
        .json();
    assert!(listed.iter().all(|u| u["id"] != student.id.as_str()));
}
