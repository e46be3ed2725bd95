pub mod auth;
pub mod event;
pub mod metrics;
pub mod notification;
pub mod password;
pub mod user;
