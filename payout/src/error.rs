use merit_ledger::LedgerError;
use merit_types::{PayoutId, PayoutStatus};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PayoutError {
    #[error("payout request {0} not found")]
    NotFound(PayoutId),

    #[error("payout request {0} already finalized as {status}", status = .1.as_str())]
    AlreadyFinalized(PayoutId, PayoutStatus),

    /// No usable quote. The request is still PENDING and can be retried.
    #[error("rate unavailable: {0}")]
    RateUnavailable(String),

    /// The transfer attempt failed or timed out. The request was cancelled
    /// and the balance restored.
    #[error("transfer failed: {0}")]
    TransferFailed(String),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}
