//! Metadata storage trait.

use crate::StoreError;

/// Well-known counter keys maintained by the backend.
pub mod counters {
    pub const NEXT_ITEM_ID: &str = "next_item_id";
    pub const NEXT_PAYOUT_ID: &str = "next_payout_id";
    pub const NEXT_HISTORY_ID: &str = "next_history_id";
    pub const ACCEPTED_TOTAL: &str = "accepted_total";
    pub const REJECTED_TOTAL: &str = "rejected_total";
    pub const PAID_MICROS_TOTAL: &str = "paid_micros_total";
}

/// Trait for internal bookkeeping that doesn't belong in any domain store:
/// id allocation counters, running totals, schema version.
///
/// Counters only move inside the backend's write batch, in the same
/// transaction as the record write they count; this trait is the read side.
pub trait MetaStore {
    /// Read a counter; missing keys read as zero.
    fn get_counter(&self, key: &str) -> Result<u64, StoreError>;

    /// Get the current database schema version.
    fn get_schema_version(&self) -> Result<u32, StoreError>;

    /// Set the database schema version.
    fn set_schema_version(&self, version: u32) -> Result<(), StoreError>;
}
