//! The collaborator seam: everything the real Mobile-Money integration
//! would implement, kept out of scope per the purpose/scope section and
//! stood in for here by a trait. `FakeProvider` (tests) and
//! `HttpProvider` (a real webhook-driven backend) both implement these.

use async_trait::async_trait;
use serde::Deserialize;

use stakeboard_core::types::Amount;
use stakeboard_core::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    Pending,
    Succeeded,
    Failed,
}

#[async_trait]
pub trait CollectionProvider: Send + Sync {
    /// Requests the provider pull `amount` from `phone`'s mobile-money
    /// account. Returns the provider's own reference for the attempt;
    /// the actual result arrives later via callback or sweep poll.
    async fn initiate_collection(&self, phone: &str, amount: Amount, reference_id: &str) -> Result<String>;

    async fn poll_status(&self, provider_ref: &str) -> Result<ProviderStatus>;
}

#[async_trait]
pub trait DisbursementProvider: Send + Sync {
    async fn initiate_disbursement(&self, phone: &str, net_amount: Amount, reference_id: &str) -> Result<String>;

    async fn poll_status(&self, provider_ref: &str) -> Result<ProviderStatus>;
}
