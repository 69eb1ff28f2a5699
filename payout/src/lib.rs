//! Payout execution against external collaborators.
//!
//! The ledger decides who gets paid; this crate performs the payment. Rate
//! quoting and coin transfer sit behind async traits so the orchestrator and
//! its failure handling can be tested without a network.

pub mod error;
pub mod orchestrator;
pub mod rate;
pub mod transfer;

pub use error::PayoutError;
pub use orchestrator::{PayoutOrchestrator, PayoutReceipt};
pub use rate::{CoingeckoRates, RateError, RateSource};
pub use transfer::{HttpTransferClient, TransferClient, TransferError};
