//! Ledger operations: every state transition the reward platform performs.
//!
//! Each public operation runs inside a single `WriteBatch`, so a crash or an
//! error mid-operation leaves no partial effect: the batch either commits in
//! full or is dropped and rolled back. Validation failures surface as typed
//! `LedgerError` variants before anything is written.

use std::sync::Arc;

use merit_store::meta::counters;
use merit_store::{HistoryStore, PayoutStore, QueueStore, StoreError};
use merit_store_lmdb::{LmdbEnvironment, WriteBatch};
use merit_types::{
    AccountId, Amount, HistoryId, HistoryRecord, ItemId, PayoutId, PayoutRequest, PayoutStatus,
    QueueItem, ReviewStatus, ReviewerId, Timestamp,
};

use crate::error::LedgerError;

/// The reward ledger: accounts, the review queue, history, and payouts,
/// all over one LMDB environment.
#[derive(Clone)]
pub struct Ledger {
    pub(crate) env: Arc<LmdbEnvironment>,
}

impl Ledger {
    pub fn new(env: Arc<LmdbEnvironment>) -> Self {
        Self { env }
    }

    // ── Review flow ─────────────────────────────────────────────────────

    /// Enqueue a work item for review.
    pub fn submit(
        &self,
        account: AccountId,
        payload: String,
        now: Timestamp,
    ) -> Result<ItemId, LedgerError> {
        let mut batch = self.env.write_batch()?;

        let submitter = batch
            .get_account(account)?
            .ok_or(LedgerError::AccountNotFound(account))?;
        if submitter.banned {
            return Err(LedgerError::Banned(account));
        }

        let id = batch.next_item_id()?;
        let item = QueueItem::new(id, account, payload, now);
        batch.put_queue_item(&item)?;
        batch.commit()?;

        tracing::debug!(item = %id, account = %account, "item submitted");
        Ok(id)
    }

    /// Accept a queue item: credit the reward, record history, drop the item.
    ///
    /// The claim is not re-checked here. Two reviewers racing to finalize the
    /// same item are arbitrated by the item's deletion: the second call sees
    /// `ItemNotFound`.
    pub fn accept(
        &self,
        item_id: ItemId,
        reviewer: ReviewerId,
        reward: Amount,
        now: Timestamp,
    ) -> Result<HistoryRecord, LedgerError> {
        let mut batch = self.env.write_batch()?;

        let item = batch
            .get_queue_item(item_id)?
            .ok_or(LedgerError::ItemNotFound(item_id))?;
        let mut account = batch
            .get_account(item.account)?
            .ok_or(LedgerError::AccountNotFound(item.account))?;

        account.balance = account
            .balance
            .checked_add(reward)
            .ok_or(LedgerError::Overflow(item.account))?;
        batch.put_account(&account)?;

        let record = finalize_item(&mut batch, item, ReviewStatus::Accepted, None, reviewer, now)?;
        batch.bump_counter(counters::ACCEPTED_TOTAL, 1)?;
        batch.commit()?;

        tracing::info!(
            item = %item_id,
            account = %record.account,
            reviewer = %reviewer,
            reward = %reward,
            "item accepted"
        );
        Ok(record)
    }

    /// Reject a queue item: record history with the reason, drop the item.
    /// The submitter's balance is untouched.
    pub fn reject(
        &self,
        item_id: ItemId,
        reviewer: ReviewerId,
        reason: String,
        now: Timestamp,
    ) -> Result<HistoryRecord, LedgerError> {
        let mut batch = self.env.write_batch()?;

        let item = batch
            .get_queue_item(item_id)?
            .ok_or(LedgerError::ItemNotFound(item_id))?;

        let record =
            finalize_item(&mut batch, item, ReviewStatus::Rejected, Some(reason), reviewer, now)?;
        batch.bump_counter(counters::REJECTED_TOTAL, 1)?;
        batch.commit()?;

        tracing::info!(
            item = %item_id,
            account = %record.account,
            reviewer = %reviewer,
            "item rejected"
        );
        Ok(record)
    }

    // ── Payout flow ─────────────────────────────────────────────────────

    /// Capture an account's full balance into a new PENDING payout request.
    ///
    /// The balance is zeroed and the request written in the same batch, so
    /// the captured amount can never be spent twice. At most one PENDING
    /// request may exist per account.
    pub fn request_payout(
        &self,
        account_id: AccountId,
        min_payout: Amount,
        now: Timestamp,
    ) -> Result<PayoutRequest, LedgerError> {
        let mut batch = self.env.write_batch()?;

        let mut account = batch
            .get_account(account_id)?
            .ok_or(LedgerError::AccountNotFound(account_id))?;
        if account.banned {
            return Err(LedgerError::Banned(account_id));
        }
        let destination = account
            .destination
            .clone()
            .ok_or(LedgerError::NoDestination(account_id))?;
        if batch.pending_payout_for(account_id)?.is_some() {
            return Err(LedgerError::DuplicatePending(account_id));
        }
        if account.balance < min_payout || account.balance.is_zero() {
            return Err(LedgerError::InsufficientBalance {
                needed: min_payout,
                available: account.balance,
            });
        }

        let amount = account.balance;
        account.balance = Amount::ZERO;
        batch.put_account(&account)?;

        let id = batch.next_payout_id()?;
        let request = PayoutRequest::new_pending(id, account_id, amount, destination, now);
        batch.put_payout(&request)?;
        batch.set_pending_payout(account_id, id)?;
        batch.commit()?;

        tracing::info!(
            payout = %id,
            account = %account_id,
            amount = %amount,
            "payout requested"
        );
        Ok(request)
    }

    /// Mark a PENDING request PAID and record the transfer reference.
    pub fn confirm_payout(
        &self,
        payout_id: PayoutId,
        reviewer: ReviewerId,
        tx_ref: String,
        now: Timestamp,
    ) -> Result<PayoutRequest, LedgerError> {
        let mut batch = self.env.write_batch()?;

        let mut request = batch
            .get_payout(payout_id)?
            .ok_or(LedgerError::PayoutNotFound(payout_id))?;
        if !request.is_pending() {
            return Err(LedgerError::AlreadyFinalized(payout_id, request.status));
        }

        request.status = PayoutStatus::Paid;
        request.reviewer = Some(reviewer);
        request.tx_ref = Some(tx_ref);
        request.finalized_at = Some(now);
        batch.put_payout(&request)?;
        batch.clear_pending_payout(request.account)?;
        batch.add_paid_total(request.amount)?;
        batch.commit()?;

        tracing::info!(
            payout = %payout_id,
            account = %request.account,
            amount = %request.amount,
            "payout confirmed"
        );
        Ok(request)
    }

    /// Mark a PENDING request CANCELLED and restore its amount to the
    /// account balance.
    ///
    /// If the restore would overflow the balance the whole batch rolls back
    /// and the request stays PENDING (retryable). If the account record has
    /// vanished the restore has nowhere to land; the request is finalized
    /// anyway, since leaving it PENDING forever would wedge the account's
    /// payout slot.
    pub fn cancel_payout(
        &self,
        payout_id: PayoutId,
        reviewer: ReviewerId,
        now: Timestamp,
    ) -> Result<PayoutRequest, LedgerError> {
        let mut batch = self.env.write_batch()?;

        let mut request = batch
            .get_payout(payout_id)?
            .ok_or(LedgerError::PayoutNotFound(payout_id))?;
        if !request.is_pending() {
            return Err(LedgerError::AlreadyFinalized(payout_id, request.status));
        }

        match batch.get_account(request.account)? {
            Some(mut account) => {
                account.balance = account
                    .balance
                    .checked_add(request.amount)
                    .ok_or(LedgerError::Overflow(request.account))?;
                batch.put_account(&account)?;
            }
            None => {
                tracing::error!(
                    payout = %payout_id,
                    account = %request.account,
                    amount = %request.amount,
                    "cancelling payout for missing account, restore amount dropped"
                );
            }
        }

        request.status = PayoutStatus::Cancelled;
        request.reviewer = Some(reviewer);
        request.finalized_at = Some(now);
        batch.put_payout(&request)?;
        batch.clear_pending_payout(request.account)?;
        batch.commit()?;

        tracing::info!(
            payout = %payout_id,
            account = %request.account,
            amount = %request.amount,
            "payout cancelled"
        );
        Ok(request)
    }

    // ── Reads ───────────────────────────────────────────────────────────

    pub fn get_queue_item(&self, item_id: ItemId) -> Result<QueueItem, LedgerError> {
        self.env.queue_store().get_item(item_id).map_err(|e| match e {
            StoreError::NotFound(_) => LedgerError::ItemNotFound(item_id),
            other => LedgerError::Storage(other),
        })
    }

    pub fn get_payout(&self, payout_id: PayoutId) -> Result<PayoutRequest, LedgerError> {
        self.env.payout_store().get_payout(payout_id).map_err(|e| match e {
            StoreError::NotFound(_) => LedgerError::PayoutNotFound(payout_id),
            other => LedgerError::Storage(other),
        })
    }

    /// The oldest PENDING payout request, if any. Operators drain payouts
    /// in request order.
    pub fn oldest_pending_payout(&self) -> Result<Option<PayoutRequest>, LedgerError> {
        Ok(self.env.payout_store().oldest_pending()?)
    }

    pub fn history_record(&self, id: HistoryId) -> Result<HistoryRecord, LedgerError> {
        Ok(self.env.history_store().get_record(id)?)
    }
}

/// Shared tail of accept/reject: append history, delete the queue item.
fn finalize_item(
    batch: &mut WriteBatch<'_>,
    item: QueueItem,
    status: ReviewStatus,
    reason: Option<String>,
    reviewer: ReviewerId,
    now: Timestamp,
) -> Result<HistoryRecord, LedgerError> {
    let history_id = batch.next_history_id()?;
    let record = HistoryRecord {
        id: history_id,
        account: item.account,
        payload: item.payload.clone(),
        status,
        reason,
        reviewer,
        submitted_at: item.submitted_at,
        finalized_at: now,
    };
    batch.put_history(&record)?;
    batch.delete_queue_item(&item)?;
    Ok(record)
}
