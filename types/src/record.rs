//! Persisted record structs.
//!
//! These are the exact shapes the store serializes. Claim state lives on the
//! queue item itself, so a claim survives process restarts and is visible to
//! staleness takeover.

use serde::{Deserialize, Serialize};

use crate::address::DestAddress;
use crate::amount::Amount;
use crate::id::{AccountId, HistoryId, ItemId, PayoutId, ReviewerId};
use crate::state::{PayoutStatus, ReviewStatus};
use crate::time::Timestamp;

/// A participant account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Current spendable balance. Never negative: the type is unsigned and
    /// every debit is a checked subtraction.
    pub balance: Amount,
    /// Where payouts for this account are sent. Must be set before a payout
    /// can be requested.
    pub destination: Option<DestAddress>,
    pub banned: bool,
    /// Informational role flag; authority comes from the permission
    /// hierarchy collaborator, not from this field.
    pub reviewer: bool,
    pub registered_at: Timestamp,
}

impl Account {
    pub fn new(id: AccountId, registered_at: Timestamp) -> Self {
        Self {
            id,
            balance: Amount::ZERO,
            destination: None,
            banned: false,
            reviewer: false,
            registered_at,
        }
    }
}

/// An exclusive, time-limited hold a reviewer has on a queue item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub reviewer: ReviewerId,
    pub claimed_at: Timestamp,
}

/// A submitted payload awaiting review.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: ItemId,
    pub account: AccountId,
    pub payload: String,
    pub submitted_at: Timestamp,
    pub claim: Option<Claim>,
}

impl QueueItem {
    pub fn new(id: ItemId, account: AccountId, payload: String, submitted_at: Timestamp) -> Self {
        Self {
            id,
            account,
            payload,
            submitted_at,
            claim: None,
        }
    }

    /// Whether a reviewer may take this item now.
    ///
    /// True when unclaimed, when the existing claim has expired, or when the
    /// existing claim belongs to `reviewer` itself (re-entry after a crash
    /// resumes the same item).
    pub fn claimable_by(&self, reviewer: ReviewerId, stale_after_secs: u64, now: Timestamp) -> bool {
        match &self.claim {
            None => true,
            Some(c) => c.reviewer == reviewer || c.claimed_at.has_expired(stale_after_secs, now),
        }
    }
}

/// An immutable record of a finished review.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: HistoryId,
    pub account: AccountId,
    pub payload: String,
    pub status: ReviewStatus,
    /// Present for rejections.
    pub reason: Option<String>,
    pub reviewer: ReviewerId,
    /// When the payload was originally enqueued, preserved from the queue item.
    pub submitted_at: Timestamp,
    pub finalized_at: Timestamp,
}

/// A request to pay out an account's full balance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutRequest {
    pub id: PayoutId,
    pub account: AccountId,
    /// The full balance captured (and debited) at request time.
    pub amount: Amount,
    pub destination: DestAddress,
    pub status: PayoutStatus,
    /// Reviewer who finalized the request.
    pub reviewer: Option<ReviewerId>,
    /// Transfer reference; set only on PAID.
    pub tx_ref: Option<String>,
    pub created_at: Timestamp,
    pub finalized_at: Option<Timestamp>,
}

impl PayoutRequest {
    pub fn new_pending(
        id: PayoutId,
        account: AccountId,
        amount: Amount,
        destination: DestAddress,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            account,
            amount,
            destination,
            status: PayoutStatus::Pending,
            reviewer: None,
            tx_ref: None,
            created_at,
            finalized_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == PayoutStatus::Pending
    }
}
