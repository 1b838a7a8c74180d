//! Player identity and credentials: phone-keyed accounts, argon2id PIN
//! hashing, session cookies, scoped action tokens, and OTP-backed PIN
//! reset. No HTTP here — the `server` crate maps this contract onto
//! routes.

pub mod memory;
pub mod otp;
pub mod service;
pub mod store;

pub use service::{ActionScope, CheckStatus, Registry, RegistryConfig, VerifyOutcome};
pub use store::{ActionToken, RegistryStore, Session};
pub use otp::SmsProvider;
