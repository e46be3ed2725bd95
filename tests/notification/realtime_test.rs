use axum::http::StatusCode;
use campus_events::services::realtime::{Broadcast, Room, EVENT_UPDATED, NEW_NOTIFICATION};
use tokio::sync::broadcast::Receiver;

use crate::common::TestContext;

fn drain(rx: &mut Receiver<Broadcast>) -> Vec<Broadcast> {
    let mut messages = Vec::new();
    while let Ok(message) = rx.try_recv() {
        messages.push(message);
    }
    messages
}

#[tokio::test]
async fn creation_pushes_to_each_recipient_and_the_review_room() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin().await;
    let super_admin = ctx.super_admin().await;
    let mut rx = ctx.realtime.subscribe();

    let event = ctx.create_event(&admin, "Robotics Expo").await;

    let messages = drain(&mut rx);
    let personal: Vec<&Broadcast> = messages
        .iter()
        .filter(|m| m.event == NEW_NOTIFICATION)
        .collect();
    assert_eq!(personal.len(), 2);
    assert!(personal.iter().any(|m| m.room == Room::User(super_admin.id.clone())));
    assert!(personal.iter().any(|m| m.room == Room::User(admin.id.clone())));

    let review = personal
        .iter()
        .find(|m| m.room == Room::User(super_admin.id.clone()))
        .unwrap();
    assert_eq!(review.payload["type"], "event_created");
    assert_eq!(review.payload["isRead"], false);
    assert_eq!(review.payload["data"]["eventId"], event["id"]);

    let updates: Vec<&Broadcast> = messages.iter().filter(|m| m.event == EVENT_UPDATED).collect();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].room, Room::SuperAdmins);
    let update = &updates[0].payload;
    assert_eq!(update["type"], "event_created");
    assert_eq!(update["title"], "New event submitted");
    assert_eq!(update["message"], "\"Robotics Expo\" was submitted for approval");
    assert_eq!(update["isRead"], false);
    assert_eq!(update["data"]["eventId"], event["id"]);
    assert_eq!(update["data"]["status"], "pending");
    assert_eq!(update["data"]["action"], "created");
}

#[tokio::test]
async fn revision_push_carries_the_feedback() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin().await;
    let super_admin = ctx.super_admin().await;
    let event = ctx.create_event(&admin, "Draft Talk").await;
    let id = event["id"].as_str().unwrap();
    let mut rx = ctx.realtime.subscribe();

    ctx.server
        .post(&format!("/event/{id}/feedback"))
        .authorization_bearer(&super_admin.access_token)
        .json(&serde_json::json!({ "feedback": "Please add the room number" }))
        .await
        .assert_status(StatusCode::OK);

    let messages = drain(&mut rx);
    let to_owner = messages
        .iter()
        .find(|m| m.event == NEW_NOTIFICATION && m.room == Room::User(admin.id.clone()))
        .unwrap();
    assert_eq!(to_owner.payload["type"], "event_revised");
    assert_eq!(to_owner.payload["data"]["feedback"], "Please add the room number");

    let update = messages.iter().find(|m| m.event == EVENT_UPDATED).unwrap();
    assert_eq!(update.payload["type"], "event_revised");
    assert_eq!(update.payload["data"]["status"], "revised");
}

#[tokio::test]
async fn nothing_is_pushed_when_the_commit_fails() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin().await;
    ctx.super_admin().await;
    let mut rx = ctx.realtime.subscribe();
    ctx.store.fail_event_commits(true);

    ctx.server
        .post("/event")
        .authorization_bearer(&admin.access_token)
        .multipart(crate::common::event_form("Never Happens"))
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR);

    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn rejected_decisions_push_nothing() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin().await;
    let super_admin = ctx.super_admin().await;
    let event = ctx.create_event(&admin, "Once Only").await;
    let id = event["id"].as_str().unwrap();

    ctx.server
        .post(&format!("/event/{id}/approve"))
        .authorization_bearer(&super_admin.access_token)
        .await
        .assert_status(StatusCode::OK);

    let mut rx = ctx.realtime.subscribe();
    ctx.server
        .post(&format!("/event/{id}/approve"))
        .authorization_bearer(&super_admin.access_token)
        .await
        .assert_status(StatusCode::CONFLICT);

    assert!(drain(&mut rx).is_empty());
}
