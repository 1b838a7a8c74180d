//! A test double that always succeeds immediately. Production code
//! never constructs this; it exists for the Orchestrator's own test
//! suite and for other crates' fixtures.

use async_trait::async_trait;
use uuid::Uuid;

use stakeboard_core::types::Amount;
use stakeboard_core::Result;

use crate::provider::{CollectionProvider, DisbursementProvider, ProviderStatus};

#[derive(Debug, Clone, Copy, Default)]
pub struct FakeProvider;

#[async_trait]
impl CollectionProvider for FakeProvider {
    async fn initiate_collection(&self, _phone: &str, _amount: Amount, _reference_id: &str) -> Result<String> {
        Ok(format!("fake-collect-{}", Uuid::new_v4()))
    }

    async fn poll_status(&self, _provider_ref: &str) -> Result<ProviderStatus> {
        Ok(ProviderStatus::Succeeded)
    }
}

#[async_trait]
impl DisbursementProvider for FakeProvider {
    async fn initiate_disbursement(&self, _phone: &str, _net_amount: Amount, _reference_id: &str) -> Result<String> {
        Ok(format!("fake-disburse-{}", Uuid::new_v4()))
    }

    async fn poll_status(&self, _provider_ref: &str) -> Result<ProviderStatus> {
        Ok(ProviderStatus::Succeeded)
    }
}
