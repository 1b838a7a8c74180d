//! The SMS gateway seam. A real integration is out of scope the same
//! way the payment provider's wire contract is: only the trait is
//! specified. This logs the code at `info` so local/dev runs and
//! integration tests can read it off the log instead of a phone.

use async_trait::async_trait;
use tracing::info;

use stakeboard_core::Result;
use stakeboard_registry::SmsProvider;

#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSmsProvider;

#[async_trait]
impl SmsProvider for LoggingSmsProvider {
    async fn send_otp(&self, phone: &str, code: &str) -> Result<()> {
        info!("OTP for {phone}: {code}");
        Ok(())
    }
}
