//! A provider that actually calls out to a Mobile-Money gateway over
//! HTTP. The wire shape is deliberately minimal — `{status: "pending" |
//! "succeeded" | "failed"}` — since the real provider contract is out
//! of this system's scope; only the seam is specified.

use serde::Deserialize;

use stakeboard_core::types::Amount;
use stakeboard_core::{Error, Result};

use crate::provider::{CollectionProvider, DisbursementProvider, ProviderStatus};

#[derive(Debug, Deserialize)]
struct InitiateResponse {
    provider_ref: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
}

fn parse_status(raw: &str) -> ProviderStatus {
    match raw {
        "succeeded" => ProviderStatus::Succeeded,
        "failed" => ProviderStatus::Failed,
        _ => ProviderStatus::Pending,
    }
}

pub struct HttpProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProvider {
    pub fn new(base_url: impl Into<String>) -> HttpProvider {
        HttpProvider { client: reqwest::Client::new(), base_url: base_url.into() }
    }

    async fn post_initiate(&self, path: &str, body: serde_json::Value) -> Result<String> {
        let resp: InitiateResponse = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(provider_unavailable)?
            .json()
            .await
            .map_err(provider_unavailable)?;
        Ok(resp.provider_ref)
    }

    async fn get_status(&self, provider_ref: &str) -> Result<ProviderStatus> {
        let resp: StatusResponse = self
            .client
            .get(format!("{}/status/{provider_ref}", self.base_url))
            .send()
            .await
            .map_err(provider_unavailable)?
            .json()
            .await
            .map_err(provider_unavailable)?;
        Ok(parse_status(&resp.status))
    }
}

fn provider_unavailable(e: reqwest::Error) -> Error {
    tracing::warn!("payment provider request failed: {e}");
    Error::ProviderUnavailable
}

#[async_trait::async_trait]
impl CollectionProvider for HttpProvider {
    async fn initiate_collection(&self, phone: &str, amount: Amount, reference_id: &str) -> Result<String> {
        self.post_initiate("/collections", serde_json::json!({ "phone": phone, "amount": amount, "reference_id": reference_id }))
            .await
    }

    async fn poll_status(&self, provider_ref: &str) -> Result<ProviderStatus> {
        self.get_status(provider_ref).await
    }
}

#[async_trait::async_trait]
impl DisbursementProvider for HttpProvider {
    async fn initiate_disbursement(&self, phone: &str, net_amount: Amount, reference_id: &str) -> Result<String> {
        self.post_initiate("/disbursements", serde_json::json!({ "phone": phone, "net_amount": net_amount, "reference_id": reference_id }))
            .await
    }

    async fn poll_status(&self, provider_ref: &str) -> Result<ProviderStatus> {
        self.get_status(provider_ref).await
    }
}
