//! Abstract storage traits for the merit reward ledger.
//!
//! Every storage backend implements these traits for single-record reads and
//! writes. Compound mutations that must land atomically (credit + history +
//! delete, debit + payout insert) go through the backend's write batch, which
//! is deliberately concrete: atomicity is a property of the real transaction.

pub mod account;
pub mod error;
pub mod history;
pub mod meta;
pub mod payout;
pub mod queue;

pub use account::AccountStore;
pub use error::StoreError;
pub use history::HistoryStore;
pub use meta::MetaStore;
pub use payout::PayoutStore;
pub use queue::QueueStore;
