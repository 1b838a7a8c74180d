mod account;
mod ledger_tx;
mod match_;
mod player;
mod queue_entry;
mod session;
mod withdrawal;

pub use account::{Account, AccountType};
pub use ledger_tx::{LedgerTransaction, ReferenceKind};
pub use match_::{Match, MatchStatus, MatchVariant, WinType};
pub use player::Player;
pub use queue_entry::{QueueEntry, QueueMode, QueueStatus};
pub use session::SessionInfo;
pub use withdrawal::{WithdrawalRequest, WithdrawalStatus};

pub type PlayerId = uuid::Uuid;
pub type AccountId = uuid::Uuid;
pub type MatchId = uuid::Uuid;
pub type QueueEntryId = uuid::Uuid;
pub type WithdrawalId = uuid::Uuid;
pub type LedgerTxId = uuid::Uuid;

/// Minor currency units (e.g. cents). Always non-negative for balances;
/// always positive for transfer amounts.
pub type Amount = i64;
