//! Fundamental types for the merit reward ledger.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! identifiers, fixed-point amounts, timestamps, destination addresses, status enums,
//! and the persisted record structs.

pub mod address;
pub mod amount;
pub mod id;
pub mod record;
pub mod state;
pub mod time;

pub use address::{AddressError, DestAddress};
pub use amount::{Amount, CoinAmount, Rate};
pub use id::{AccountId, HistoryId, ItemId, PayoutId, ReviewerId};
pub use record::{Account, Claim, HistoryRecord, PayoutRequest, QueueItem};
pub use state::{PayoutStatus, ReviewStatus};
pub use time::Timestamp;
