//! Account administration and read-only statistics.
//!
//! Everything here is bookkeeping around the review/payout flows in
//! `ledger.rs`: registering accounts, maintaining their flags and payout
//! destination, and serving aggregate numbers from the store's counters and
//! indexes.

use serde::Serialize;

use merit_store::meta::counters;
use merit_store::{AccountStore, HistoryStore, MetaStore, PayoutStore, QueueStore, StoreError};
use merit_types::{
    Account, AccountId, Amount, DestAddress, HistoryRecord, ReviewStatus, Timestamp,
};

use crate::error::LedgerError;
use crate::ledger::Ledger;

/// Per-account aggregates.
#[derive(Clone, Debug, Serialize)]
pub struct AccountStats {
    /// Items currently queued for review.
    pub on_review: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub balance: Amount,
}

/// Platform-wide aggregates, served from counters and index lengths.
#[derive(Clone, Debug, Serialize)]
pub struct GlobalStats {
    pub accounts: u64,
    pub queue_len: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub pending_payouts: u64,
    pub total_paid: Amount,
}

impl Ledger {
    /// Get-or-create an account. Registering an existing account returns it
    /// unchanged, so callers can register on every first contact.
    pub fn register_account(
        &self,
        account_id: AccountId,
        now: Timestamp,
    ) -> Result<Account, LedgerError> {
        let mut batch = self.env.write_batch()?;
        if let Some(existing) = batch.get_account(account_id)? {
            return Ok(existing);
        }
        let account = Account::new(account_id, now);
        batch.put_account(&account)?;
        batch.commit()?;
        tracing::debug!(account = %account_id, "account registered");
        Ok(account)
    }

    pub fn get_account(&self, account_id: AccountId) -> Result<Account, LedgerError> {
        self.env
            .account_store()
            .get_account(account_id)
            .map_err(|e| match e {
                StoreError::NotFound(_) => LedgerError::AccountNotFound(account_id),
                other => LedgerError::Storage(other),
            })
    }

    /// Set where payouts for this account are sent.
    pub fn set_destination(
        &self,
        account_id: AccountId,
        destination: DestAddress,
    ) -> Result<(), LedgerError> {
        self.update_account(account_id, |account| {
            account.destination = Some(destination);
            Ok(())
        })?;
        Ok(())
    }

    /// Credit a bonus to the account and return the new balance.
    ///
    /// Bans do not block credits: the ban gates submission and payout, not
    /// bookkeeping.
    pub fn credit(&self, account_id: AccountId, amount: Amount) -> Result<Amount, LedgerError> {
        let account = self.update_account(account_id, |account| {
            account.balance = account
                .balance
                .checked_add(amount)
                .ok_or(LedgerError::Overflow(account_id))?;
            Ok(())
        })?;
        tracing::debug!(account = %account_id, amount = %amount, balance = %account.balance, "credit applied");
        Ok(account.balance)
    }

    pub fn set_banned(&self, account_id: AccountId, banned: bool) -> Result<(), LedgerError> {
        self.update_account(account_id, |account| {
            account.banned = banned;
            Ok(())
        })?;
        tracing::info!(account = %account_id, banned, "ban flag updated");
        Ok(())
    }

    pub fn set_reviewer(&self, account_id: AccountId, reviewer: bool) -> Result<(), LedgerError> {
        self.update_account(account_id, |account| {
            account.reviewer = reviewer;
            Ok(())
        })?;
        Ok(())
    }

    /// Load-modify-store one account in its own batch, returning the stored
    /// record.
    fn update_account<F>(&self, account_id: AccountId, apply: F) -> Result<Account, LedgerError>
    where
        F: FnOnce(&mut Account) -> Result<(), LedgerError>,
    {
        let mut batch = self.env.write_batch()?;
        let mut account = batch
            .get_account(account_id)?
            .ok_or(LedgerError::AccountNotFound(account_id))?;
        apply(&mut account)?;
        batch.put_account(&account)?;
        batch.commit()?;
        Ok(account)
    }

    // ── Statistics ──────────────────────────────────────────────────────

    pub fn account_stats(&self, account_id: AccountId) -> Result<AccountStats, LedgerError> {
        let account = self.get_account(account_id)?;
        let history = self.env.history_store();
        Ok(AccountStats {
            on_review: self.env.queue_store().count_for_account(account_id)?,
            accepted: history.count_for_account(account_id, ReviewStatus::Accepted)?,
            rejected: history.count_for_account(account_id, ReviewStatus::Rejected)?,
            balance: account.balance,
        })
    }

    pub fn global_stats(&self) -> Result<GlobalStats, LedgerError> {
        let meta = self.env.meta_store();
        let payouts = self.env.payout_store();
        Ok(GlobalStats {
            accounts: self.env.account_store().account_count()?,
            queue_len: self.env.queue_store().queue_len()?,
            accepted: meta.get_counter(counters::ACCEPTED_TOTAL)?,
            rejected: meta.get_counter(counters::REJECTED_TOTAL)?,
            pending_payouts: payouts.pending_count()?,
            total_paid: payouts.total_paid()?,
        })
    }

    /// Review history for one account, newest first, at most `limit` records.
    pub fn history_for_account(
        &self,
        account_id: AccountId,
        limit: usize,
    ) -> Result<Vec<HistoryRecord>, LedgerError> {
        Ok(self.env.history_store().history_for_account(account_id, limit)?)
    }
}
