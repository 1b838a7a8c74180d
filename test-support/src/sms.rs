//! A capturing `SmsProvider`: records every OTP instead of sending it,
//! so a test can read back the code without scraping a log.

use std::sync::Mutex;

use async_trait::async_trait;

use stakeboard_core::Result;
use stakeboard_registry::SmsProvider;

#[derive(Default)]
pub struct CapturingSms {
    sent: Mutex<Vec<(String, String)>>,
}

impl CapturingSms {
    /// The most recent OTP sent to `phone`, if any.
    pub fn last_code_for(&self, phone: &str) -> Option<String> {
        self.sent.lock().unwrap().iter().rev().find(|(p, _)| p == phone).map(|(_, code)| code.clone())
    }
}

#[async_trait]
impl SmsProvider for CapturingSms {
    async fn send_otp(&self, phone: &str, code: &str) -> Result<()> {
        self.sent.lock().unwrap().push((phone.to_owned(), code.to_owned()));
        Ok(())
    }
}
