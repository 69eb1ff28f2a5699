use thiserror::Error;

use merit_types::{AccountId, Amount, ItemId, PayoutId, PayoutStatus};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("account {0} not found")]
    AccountNotFound(AccountId),

    #[error("queue item {0} not found")]
    ItemNotFound(ItemId),

    #[error("payout request {0} not found")]
    PayoutNotFound(PayoutId),

    #[error("payout request {0} already finalized as {status}", status = .1.as_str())]
    AlreadyFinalized(PayoutId, PayoutStatus),

    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: Amount, available: Amount },

    #[error("account {0} already has a pending payout")]
    DuplicatePending(AccountId),

    #[error("account {0} is banned")]
    Banned(AccountId),

    #[error("account {0} has no payout destination on file")]
    NoDestination(AccountId),

    #[error("balance overflow for account {0}")]
    Overflow(AccountId),

    #[error("storage error: {0}")]
    Storage(#[from] merit_store::StoreError),
}

impl LedgerError {
    /// Whether this error indicates a record that no longer exists (lost a
    /// race to another finalizer, typically).
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::AccountNotFound(_) | Self::ItemNotFound(_) | Self::PayoutNotFound(_)
        )
    }
}
