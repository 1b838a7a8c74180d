//! Postgres-backed implementations of every `*Store` trait the other
//! crates define, plus the schema migration that creates their tables.
//! Each module here is a thin translation layer: SQL in, domain types
//! out, errors mapped to `stakeboard_core::Error::Storage`.

pub mod ledger;
pub mod matchmaker;
pub mod match_store;
pub mod payment;
pub mod pg;
pub mod registry;
pub mod withdrawal;

pub use ledger::PgLedgerStore;
pub use matchmaker::PgMatchmakerStore;
pub use match_store::PgMatchStore;
pub use payment::PgPaymentStore;
pub use pg::connect;
pub use registry::PgRegistryStore;
pub use withdrawal::PgWithdrawalStore;
