use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::common::TestContext;

async fn notifications(ctx: &TestContext, token: &str) -> Vec<Value> {
    ctx.server
        .get("/notification")
        .authorization_bearer(token)
        .await
        .json()
}

fn of_type<'a>(rows: &'a [Value], kind: &str) -> Vec<&'a Value> {
    rows.iter().filter(|n| n["type"] == kind).collect()
}

#[tokio::test]
async fn approval_notifies_the_creator_once() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin().await;
    let super_admin = ctx.super_admin().await;
    let event = ctx.create_event(&admin, "Open Day").await;
    let id = event["id"].as_str().unwrap();

    let response = ctx
        .server
        .post(&format!("/event/{id}/approve"))
        .authorization_bearer(&super_admin.access_token)
        .await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "approved");

    let rows = notifications(&ctx, &admin.access_token).await;
    let approved = of_type(&rows, "event_approved");
    assert_eq!(approved.len(), 1);
    assert_eq!(approved[0]["senderId"], super_admin.id.as_str());
}

#[tokio::test]
async fn second_decision_conflicts_and_adds_nothing() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin().await;
    let super_admin = ctx.super_admin().await;
    let event = ctx.create_event(&admin, "Chess Open").await;
    let id = event["id"].as_str().unwrap();

    ctx.server
        .post(&format!("/event/{id}/approve"))
        .authorization_bearer(&super_admin.access_token)
        .await
        .assert_status(StatusCode::OK);

    let again = ctx
        .server
        .post(&format!("/event/{id}/approve"))
        .authorization_bearer(&super_admin.access_token)
        .await;
    again.assert_status(StatusCode::CONFLICT);
    let body: Value = again.json();
    assert_eq!(body["errorCode"], "EVENT_ALREADY_PROCESSED");

    ctx.server
        .post(&format!("/event/{id}/reject"))
        .authorization_bearer(&super_admin.access_token)
        .await
        .assert_status(StatusCode::CONFLICT);

    let rows = notifications(&ctx, &admin.access_token).await;
    assert_eq!(of_type(&rows, "event_approved").len(), 1);
    assert!(of_type(&rows, "event_rejected").is_empty());
}

#[tokio::test]
async fn rejection_carries_optional_feedback() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin().await;
    let super_admin = ctx.super_admin().await;
    let with_note = ctx.create_event(&admin, "Quiz Night").await;
    let without_note = ctx.create_event(&admin, "Movie Night").await;

    ctx.server
        .post(&format!("/event/{}/reject", with_note["id"].as_str().unwrap()))
        .authorization_bearer(&super_admin.access_token)
        .json(&json!({ "feedback": "  Clashes with exams  " }))
        .await
        .assert_status(StatusCode::OK);
    let response = ctx
        .server
        .post(&format!("/event/{}/reject", without_note["id"].as_str().unwrap()))
        .authorization_bearer(&super_admin.access_token)
        .await;
    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "rejected");

    let rows = notifications(&ctx, &admin.access_token).await;
    let rejected = of_type(&rows, "event_rejected");
    assert_eq!(rejected.len(), 2);
    let feedback: Vec<&Value> = rejected.iter().map(|n| &n["feedback"]).collect();
    assert!(feedback.contains(&&json!("Clashes with exams")));
    assert!(feedback.contains(&&Value::Null));
}

#[tokio::test]
async fn revision_requires_feedback() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin().await;
    let super_admin = ctx.super_admin().await;
    let event = ctx.create_event(&admin, "Poetry Slam").await;
    let id = event["id"].as_str().unwrap();

    ctx.server
        .post(&format!("/event/{id}/feedback"))
        .authorization_bearer(&super_admin.access_token)
        .json(&json!({ "feedback": "" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    ctx.server
        .post(&format!("/event/{id}/feedback"))
        .authorization_bearer(&super_admin.access_token)
        .json(&json!({ "feedback": "   " }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let response = ctx
        .server
        .post(&format!("/event/{id}/feedback"))
        .authorization_bearer(&super_admin.access_token)
        .json(&json!({ "feedback": "Please add a room number" }))
        .await;
    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "revised");

    let rows = notifications(&ctx, &admin.access_token).await;
    let revised = of_type(&rows, "event_revised");
    assert_eq!(revised.len(), 1);
    assert_eq!(revised[0]["feedback"], "Please add a room number");
}

#[tokio::test]
async fn revised_events_can_still_be_approved() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin().await;
    let super_admin = ctx.super_admin().await;
    let event = ctx.create_event(&admin, "Debate Club").await;
    let id = event["id"].as_str().unwrap();

    ctx.server
        .post(&format!("/event/{id}/feedback"))
        .authorization_bearer(&super_admin.access_token)
        .json(&json!({ "feedback": "Shorten the description" }))
        .await
        .assert_status(StatusCode::OK);

    // A second revision request needs a pending event.
    ctx.server
        .post(&format!("/event/{id}/feedback"))
        .authorization_bearer(&super_admin.access_token)
        .json(&json!({ "feedback": "Again" }))
        .await
        .assert_status(StatusCode::CONFLICT);

    ctx.server
        .post(&format!("/event/{id}/approve"))
        .authorization_bearer(&super_admin.access_token)
        .await
        .assert_status(StatusCode::OK);
}

#[tokio::test]
async fn only_super_admins_decide() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin().await;
    let event = ctx.create_event(&admin, "Self Approval").await;
    let id = event["id"].as_str().unwrap();

    let response = ctx
        .server
        .post(&format!("/event/{id}/approve"))
        .authorization_bearer(&admin.access_token)
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(body["errorCode"], "FORBIDDEN");
}

#[tokio::test]
async fn deciding_a_missing_event_is_not_found() {
    let ctx = TestContext::new().await;
    let super_admin = ctx.super_admin().await;

    ctx.server
        .post("/event/does-not-exist/approve")
        .authorization_bearer(&super_admin.access_token)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
