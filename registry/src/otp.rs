//! OTP delivery is an external collaborator (SMS gateway), modeled the
//! same way `ledger`/`payment` keep their providers behind a trait so
//! tests never reach the network.

use async_trait::async_trait;
use rand::Rng;

use stakeboard_core::Result;

#[async_trait]
pub trait SmsProvider: Send + Sync {
    async fn send_otp(&self, phone: &str, code: &str) -> Result<()>;
}

/// Six-digit numeric code, zero-padded. Not cryptographically unguessable
/// by itself; `Registry` rate-limits and expires it quickly and the
/// hashed copy stored server-side is what is actually compared.
pub fn generate_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{n:06}")
}
