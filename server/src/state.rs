use std::sync::Arc;

use stakeboard_core::types::MatchVariant;
use stakeboard_ledger::Ledger;
use stakeboard_match_runtime::MatchRegistry;
use stakeboard_matchmaker::Matchmaker;
use stakeboard_payment::{FakeProvider, HttpProvider, PaymentOrchestrator};
use stakeboard_registry::Registry;
use stakeboard_session_hub::{ConnectionRegistry, GraceConfig};
use stakeboard_storage::{PgLedgerStore, PgMatchStore, PgMatchmakerStore, PgPaymentStore, PgRegistryStore, PgWithdrawalStore};
use sqlx::postgres::PgPool;

use crate::cache::PresenceCache;
use crate::config::Config;
use crate::sms::LoggingSmsProvider;

/// Everything a route handler needs, wired once at startup and shared
/// behind `axum::extract::State` as a single `Arc` clone per request.
pub struct AppState {
    pub ledger: Ledger,
    pub registry: Registry,
    pub matchmaker: Arc<Matchmaker>,
    pub match_store: Arc<PgMatchStore>,
    pub match_registry: Arc<MatchRegistry>,
    pub connections: ConnectionRegistry,
    pub payment: Arc<PaymentOrchestrator>,
    pub cache: PresenceCache,
    pub grace: GraceConfig,
    pub config: Config,
    pub pool: PgPool,
}

impl AppState {
    pub async fn build(config: Config) -> anyhow::Result<Arc<AppState>> {
        let pool = stakeboard_storage::connect(&config.database_url, config.database_max_connections).await?;

        let ledger_store = Arc::new(PgLedgerStore::new(pool.clone()));
        let registry_store = Arc::new(PgRegistryStore::new(pool.clone()));
        let matchmaker_store = Arc::new(PgMatchmakerStore::new(pool.clone()));
        let match_store = Arc::new(PgMatchStore::new(pool.clone()));
        let payment_store = Arc::new(PgPaymentStore::new(pool.clone()));
        let withdrawal_store = Arc::new(PgWithdrawalStore::new(pool.clone()));

        let ledger = Ledger::new(ledger_store);

        let registry = Registry::new(registry_store.clone(), Arc::new(LoggingSmsProvider), config.registry.clone().into());

        let matchmaker = Arc::new(Matchmaker::new(
            matchmaker_store,
            match_store.clone(),
            ledger.clone(),
            config.matchmaker_config(MatchVariant::Cards),
        ));

        let match_registry = Arc::new(MatchRegistry::new(match_store.clone(), ledger.clone(), registry_store, config.runtime.clone().into()));

        let (collection, disbursement): (Arc<dyn stakeboard_payment::CollectionProvider>, Arc<dyn stakeboard_payment::DisbursementProvider>) =
            if config.payment.provider == "fake" {
                (Arc::new(FakeProvider), Arc::new(FakeProvider))
            } else {
                let http = Arc::new(HttpProvider::new(config.payment.provider.clone()));
                (http.clone(), http)
            };

        let payment = Arc::new(PaymentOrchestrator::new(
            payment_store,
            withdrawal_store,
            ledger.clone(),
            collection,
            disbursement,
            config.payment.provider_fee_bps,
        ));

        let cache = PresenceCache::connect(config.redis_url.as_deref()).await;

        Ok(Arc::new(AppState {
            ledger,
            registry,
            matchmaker,
            match_store,
            match_registry,
            connections: ConnectionRegistry::new(),
            payment,
            cache,
            grace: config.session_hub.clone().into(),
            config,
            pool,
        }))
    }
}
