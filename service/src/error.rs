use merit_types::{AccountId, ReviewerId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("ledger error: {0}")]
    Ledger(#[from] merit_ledger::LedgerError),

    #[error("payout error: {0}")]
    Payout(#[from] merit_payout::PayoutError),

    #[error("store error: {0}")]
    Store(#[from] merit_store_lmdb::LmdbError),

    #[error("invalid destination address: {0}")]
    Address(#[from] merit_types::AddressError),

    #[error("config error: {0}")]
    Config(String),

    #[error("startup error: {0}")]
    Startup(String),

    #[error("metrics error: {0}")]
    Metrics(String),

    #[error("reviewer {actor} may not manage account {target}")]
    PermissionDenied {
        actor: ReviewerId,
        target: AccountId,
    },
}
