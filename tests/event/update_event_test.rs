use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use serde_json::Value;

use crate::common::{png_bytes, TestContext};

#[tokio::test]
async fn editing_sends_the_event_back_to_pending() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin().await;
    let super_admin = ctx.super_admin().await;
    let event = ctx.create_event(&admin, "Film Club").await;
    let id = event["id"].as_str().unwrap();

    ctx.server
        .post(&format!("/event/{id}/approve"))
        .authorization_bearer(&super_admin.access_token)
        .await
        .assert_status(StatusCode::OK);

    let response = ctx
        .server
        .patch(&format!("/event/{id}"))
        .authorization_bearer(&admin.access_token)
        .multipart(MultipartForm::new().add_text("location", "Cinema Hall"))
        .await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "pending");
    assert_eq!(body["location"], "Cinema Hall");
    assert_eq!(body["name"], "Film Club");

    let rows: Vec<Value> = ctx
        .server
        .get("/notification")
        .authorization_bearer(&super_admin.access_token)
        .await
        .json();
    assert!(rows.iter().any(|n| n["type"] == "event_updated"));
}

#[tokio::test]
async fn replacing_the_image_removes_the_old_one() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin().await;
    let event = ctx.create_event(&admin, "Art Show").await;
    let id = event["id"].as_str().unwrap();
    assert_eq!(ctx.stored_images(), 1);

    let response = ctx
        .server
        .patch(&format!("/event/{id}"))
        .authorization_bearer(&admin.access_token)
        .multipart(MultipartForm::new().add_part(
            "image",
            Part::bytes(png_bytes()).file_name("new.png").mime_type("image/png"),
        ))
        .await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_ne!(body["imageUrl"], event["imageUrl"]);
    assert_eq!(ctx.stored_images(), 1);
}

#[tokio::test]
async fn only_the_owner_can_edit() {
    let ctx = TestContext::new().await;
    let owner = ctx.admin().await;
    let other = ctx.admin().await;
    let event = ctx.create_event(&owner, "Mine").await;

    ctx.server
        .patch(&format!("/event/{}", event["id"].as_str().unwrap()))
        .authorization_bearer(&other.access_token)
        .multipart(MultipartForm::new().add_text("name", "Theirs"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn edits_must_keep_a_valid_schedule() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin().await;
    let event = ctx.create_event(&admin, "Morning Run").await;

    ctx.server
        .patch(&format!("/event/{}", event["id"].as_str().unwrap()))
        .authorization_bearer(&admin.access_token)
        .multipart(MultipartForm::new().add_text("endTime", "09:00"))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
