//! Drives one PENDING payout request to a terminal state.
//!
//! The sequence is quote, convert, transfer, confirm. The ledger is the
//! source of truth throughout: a quote failure leaves the request PENDING
//! and retryable, while a transfer failure cancels the request and restores
//! the balance in the same ledger transaction.

use std::time::Duration;

use merit_ledger::{Ledger, LedgerError};
use merit_types::{Amount, CoinAmount, PayoutId, Rate, ReviewerId, Timestamp};
use serde::Serialize;

use crate::error::PayoutError;
use crate::rate::RateSource;
use crate::transfer::TransferClient;

/// What a completed payout looked like on the wire.
#[derive(Clone, Debug, Serialize)]
pub struct PayoutReceipt {
    pub payout_id: PayoutId,
    /// Reward amount debited from the account.
    pub amount: Amount,
    /// Coins actually sent, after conversion at `rate`.
    pub coin_amount: CoinAmount,
    pub rate: Rate,
    pub tx_ref: String,
}

/// Executes payout requests against the rate source and transfer client.
pub struct PayoutOrchestrator<R, T> {
    ledger: Ledger,
    rates: R,
    transfers: T,
    transfer_timeout: Duration,
}

impl<R: RateSource, T: TransferClient> PayoutOrchestrator<R, T> {
    pub fn new(ledger: Ledger, rates: R, transfers: T, transfer_timeout: Duration) -> Self {
        Self {
            ledger,
            rates,
            transfers,
            transfer_timeout,
        }
    }

    /// Take one PENDING request through quote → convert → transfer → confirm.
    ///
    /// Terminal outcomes:
    /// - `Ok(receipt)`: transferred and confirmed PAID.
    /// - `Err(RateUnavailable)`: no usable quote or the amount converts to
    ///   zero coins; the request is untouched and still PENDING.
    /// - `Err(TransferFailed)`: the transfer attempt failed or timed out;
    ///   the request was CANCELLED and the balance restored.
    /// - `Err(NotFound | AlreadyFinalized)`: nothing to do; calling twice
    ///   for the same request fails cleanly without touching state.
    pub async fn process(
        &self,
        payout_id: PayoutId,
        reviewer: ReviewerId,
        now: Timestamp,
    ) -> Result<PayoutReceipt, PayoutError> {
        let request = self.ledger.get_payout(payout_id).map_err(|e| match e {
            LedgerError::PayoutNotFound(id) => PayoutError::NotFound(id),
            other => PayoutError::Ledger(other),
        })?;
        if !request.is_pending() {
            return Err(PayoutError::AlreadyFinalized(payout_id, request.status));
        }

        let rate = self
            .rates
            .get_rate()
            .await
            .map_err(|e| PayoutError::RateUnavailable(e.to_string()))?;

        let coins = match rate.convert(request.amount) {
            Some(coins) if !coins.is_zero() => coins,
            _ => {
                return Err(PayoutError::RateUnavailable(format!(
                    "{} converts to no coins at {rate}",
                    request.amount
                )));
            }
        };

        let memo = format!("merit payout #{payout_id}");
        let attempt = self
            .transfers
            .send(&request.destination, coins, &memo);
        let tx_ref = match tokio::time::timeout(self.transfer_timeout, attempt).await {
            Ok(Ok(tx_ref)) => tx_ref,
            Ok(Err(e)) => return self.cancel_after_failure(payout_id, reviewer, now, e.to_string()),
            Err(_elapsed) => {
                let reason = format!(
                    "no response within {}s",
                    self.transfer_timeout.as_secs()
                );
                return self.cancel_after_failure(payout_id, reviewer, now, reason);
            }
        };

        let confirmed = self
            .ledger
            .confirm_payout(payout_id, reviewer, tx_ref.clone(), now)
            .map_err(|e| {
                tracing::error!(
                    payout = %payout_id,
                    tx_ref = %tx_ref,
                    error = %e,
                    "transfer sent but confirmation failed"
                );
                PayoutError::Ledger(e)
            })?;

        tracing::info!(
            payout = %payout_id,
            amount = %confirmed.amount,
            coins = %coins,
            rate = %rate,
            tx_ref = %tx_ref,
            "payout completed"
        );
        Ok(PayoutReceipt {
            payout_id,
            amount: confirmed.amount,
            coin_amount: coins,
            rate,
            tx_ref,
        })
    }

    /// Cancel the request after a failed or timed-out transfer attempt.
    ///
    /// The attempt's on-chain outcome is unknown at this point; the ledger
    /// restores the balance anyway and the gap is left to manual
    /// reconciliation against the transfer service's records.
    fn cancel_after_failure(
        &self,
        payout_id: PayoutId,
        reviewer: ReviewerId,
        now: Timestamp,
        reason: String,
    ) -> Result<PayoutReceipt, PayoutError> {
        let cancelled = self.ledger.cancel_payout(payout_id, reviewer, now)?;
        tracing::warn!(
            payout = %payout_id,
            account = %cancelled.account,
            amount = %cancelled.amount,
            destination = %cancelled.destination,
            reason = %reason,
            "transfer failed, payout cancelled and balance restored; \
             reconcile against transfer records if the attempt landed"
        );
        Err(PayoutError::TransferFailed(reason))
    }
}
