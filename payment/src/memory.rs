//! In-memory `PaymentStore`, for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use stakeboard_core::types::LedgerTxId;
use stakeboard_core::{Error, Result};

use crate::intent::{IntentStatus, PaymentIntent, PaymentStore};

#[derive(Default)]
pub struct MemoryPaymentStore {
    intents: Mutex<HashMap<Uuid, PaymentIntent>>,
}

#[async_trait]
impl PaymentStore for MemoryPaymentStore {
    async fn create_intent(&self, intent: PaymentIntent) -> Result<PaymentIntent> {
        let mut intents = self.intents.lock().unwrap();
        intents.insert(intent.id, intent.clone());
        Ok(intent)
    }

    async fn get_intent(&self, id: Uuid) -> Result<PaymentIntent> {
        let intents = self.intents.lock().unwrap();
        intents.get(&id).cloned().ok_or(Error::Internal("payment intent not found".into()))
    }

    async fn transition_status(&self, id: Uuid, new_status: IntentStatus, provider_ref: Option<String>) -> Result<bool> {
        let mut intents = self.intents.lock().unwrap();
        let intent = intents.get_mut(&id).ok_or(Error::Internal("payment intent not found".into()))?;
        if intent.status != IntentStatus::Pending {
            return Ok(false);
        }
        intent.status = new_status;
        if provider_ref.is_some() {
            intent.provider_ref = provider_ref;
        }
        Ok(true)
    }

    async fn set_ledger_tx_ids(&self, id: Uuid, tx_ids: Vec<LedgerTxId>) -> Result<()> {
        let mut intents = self.intents.lock().unwrap();
        let intent = intents.get_mut(&id).ok_or(Error::Internal("payment intent not found".into()))?;
        intent.ledger_tx_ids = tx_ids;
        Ok(())
    }

    async fn list_stale_pending(&self, older_than: DateTime<Utc>) -> Result<Vec<PaymentIntent>> {
        let intents = self.intents.lock().unwrap();
        Ok(intents
            .values()
            .filter(|i| i.status == IntentStatus::Pending && i.created_at < older_than)
            .cloned()
            .collect())
    }
}
