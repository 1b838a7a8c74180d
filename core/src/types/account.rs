use serde::{Deserialize, Serialize};

use super::{AccountId, Amount, PlayerId};

/// The ledger's unit of balance.
///
/// Commission sits in `Escrow` alongside the stakes it was collected
/// with, same as everything else a player pays in at enqueue time, and
/// is only split out to `HouseCommission` when a match resolves (win,
/// chop, or no-show). There is no separate pending/earned pair of
/// accounts: escrow already *is* the pending state, and a single
/// terminal transfer group recognizes it. See DESIGN.md.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccountType {
    PlayerWinnings,
    PlayerWallet,
    Escrow,
    HouseCommission,
    HouseExpense,
    MobileMoneyProvider,
}

impl AccountType {
    pub fn is_per_player(&self) -> bool {
        matches!(self, AccountType::PlayerWinnings | AccountType::PlayerWallet)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub account_type: AccountType,
    /// Present only for per-player account types.
    pub owner: Option<PlayerId>,
    pub balance: Amount,
}
