//! Status enums for reviews and payouts.

use serde::{Deserialize, Serialize};

/// The outcome of a finished review.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReviewStatus {
    /// Payload accepted; the submitter was credited the reward.
    Accepted,
    /// Payload rejected with a reason; no credit.
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "ACCEPTED",
            Self::Rejected => "REJECTED",
        }
    }
}

/// The state of a payout request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayoutStatus {
    /// Awaiting processing; the requested amount is already debited.
    Pending,
    /// Transfer confirmed; terminal.
    Paid,
    /// Cancelled; the amount was restored to the account; terminal.
    Cancelled,
}

impl PayoutStatus {
    /// Whether this status is terminal (no further transitions).
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Paid | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Cancelled => "CANCELLED",
        }
    }
}
