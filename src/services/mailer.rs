use async_trait::async_trait;

use crate::error::Result;

/// Outbound email seam. Delivery itself is an external concern.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_otp(&self, email: &str, name: &str, code: &str) -> Result<()>;
}

/// Writes OTP deliveries to the log instead of sending mail.
#[derive(Debug, Default, Clone)]
pub struct TracingMailer;

#[async_trait]
impl Mailer for TracingMailer {
    async fn send_otp(&self, email: &str, name: &str, code: &str) -> Result<()> {
        tracing::info!(to = %email, name = %name, "password reset OTP issued");
        tracing::debug!(to = %email, code = %code, "password reset OTP code");
        Ok(())
    }
}
