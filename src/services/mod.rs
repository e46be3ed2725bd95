pub mod hashing;
pub mod image_store;
pub mod jwt;
pub mod mailer;
pub mod metrics;
pub mod rate_limit;
pub mod realtime;
pub mod security;
