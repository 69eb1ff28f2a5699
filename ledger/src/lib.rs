//! Reward ledger operations and queue claim management.
//!
//! Every mutation runs inside one LMDB write batch, so each operation is
//! atomic. Claims live on the queue items themselves and are arbitrated by
//! LMDB's single-writer transactions.

pub mod accounts;
pub mod claim;
pub mod error;
pub mod ledger;

pub use accounts::{AccountStats, GlobalStats};
pub use claim::ClaimManager;
pub use error::LedgerError;
pub use ledger::Ledger;
