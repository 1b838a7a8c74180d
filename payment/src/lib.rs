//! Mobile-money collection and disbursement orchestration. Owns the
//! provider seam (`CollectionProvider`/`DisbursementProvider`), the
//! idempotent intent state machine that sits between a webhook callback
//! and the ledger, and the stale-intent sweeper that keeps a wedged
//! provider from leaving an intent pending forever.

pub mod fake;
pub mod http;
pub mod intent;
pub mod memory;
pub mod provider;
pub mod service;
pub mod withdrawal;

pub use fake::FakeProvider;
pub use http::HttpProvider;
pub use intent::{IntentKind, IntentStatus, PaymentIntent, PaymentStore};
pub use memory::MemoryPaymentStore;
pub use provider::{CollectionProvider, DisbursementProvider, ProviderStatus};
pub use service::{CollectionOutcome, DisbursementOutcome, PaymentOrchestrator};
pub use withdrawal::{MemoryWithdrawalStore, WithdrawalStore};
