//! The main merit service struct. Wires storage, ledger, claims, and
//! payouts together behind one embeddable facade.

use std::sync::Arc;

use merit_ledger::{AccountStats, ClaimManager, GlobalStats, Ledger};
use merit_payout::{
    CoingeckoRates, HttpTransferClient, PayoutError, PayoutOrchestrator, PayoutReceipt,
    RateSource, TransferClient,
};
use merit_store_lmdb::LmdbEnvironment;
use merit_types::{
    Account, AccountId, Amount, DestAddress, HistoryRecord, ItemId, PayoutId, PayoutRequest,
    QueueItem, ReviewerId, Timestamp,
};

use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::metrics::ServiceMetrics;
use crate::permission::{PermissionHierarchy, StaticHierarchy};

/// Number of named LMDB databases the store opens.
const MAX_DBS: u32 = 16;

/// A running merit service.
///
/// Hosts call the methods below instead of touching the ledger directly:
/// the service supplies wall-clock timestamps, applies the configured
/// reward/minimum/staleness values, gates moderation through the permission
/// hierarchy, and keeps the Prometheus metrics current.
pub struct MeritService<R, T> {
    pub config: ServiceConfig,
    pub metrics: ServiceMetrics,
    ledger: Ledger,
    claims: ClaimManager,
    payouts: PayoutOrchestrator<R, T>,
    hierarchy: Box<dyn PermissionHierarchy>,
}

impl MeritService<CoingeckoRates, HttpTransferClient> {
    /// Open the service with the production collaborators built from the
    /// config. This is the only fatal path: a store that cannot open or an
    /// HTTP client that cannot build aborts startup.
    pub fn open(config: ServiceConfig) -> Result<Self, ServiceError> {
        let rates = CoingeckoRates::new(
            config.rate_base_url.as_str(),
            config.rate_asset_id.as_str(),
            config.rate_vs_currency.as_str(),
        )
        .map_err(|e| ServiceError::Startup(format!("failed to build rate client: {e}")))?;
        let transfers = HttpTransferClient::new(config.transfer_endpoint.as_str())
            .map_err(|e| ServiceError::Startup(format!("failed to build transfer client: {e}")))?;
        let hierarchy = Box::new(StaticHierarchy::new(
            config.operators.iter().copied(),
            config.supervisors.iter().copied(),
        ));
        Self::with_collaborators(config, rates, transfers, hierarchy)
    }
}

impl<R: RateSource, T: TransferClient> MeritService<R, T> {
    /// Open the service with caller-supplied collaborators. The seam tests
    /// and non-HTTP hosts plug into.
    pub fn with_collaborators(
        config: ServiceConfig,
        rates: R,
        transfers: T,
        hierarchy: Box<dyn PermissionHierarchy>,
    ) -> Result<Self, ServiceError> {
        let env = Arc::new(LmdbEnvironment::open(
            &config.data_dir,
            MAX_DBS,
            config.map_size_bytes(),
        )?);
        let ledger = Ledger::new(Arc::clone(&env));
        let claims = ClaimManager::new(Arc::clone(&env));
        let payouts = PayoutOrchestrator::new(
            ledger.clone(),
            rates,
            transfers,
            config.transfer_timeout(),
        );

        let service = Self {
            config,
            metrics: ServiceMetrics::new(),
            ledger,
            claims,
            payouts,
            hierarchy,
        };
        service.refresh_gauges();
        tracing::info!(
            data_dir = %service.config.data_dir.display(),
            reward = %service.config.reward(),
            min_payout = %service.config.min_payout(),
            "merit service opened"
        );
        Ok(service)
    }

    // ── Review flow ─────────────────────────────────────────────────────

    /// Get-or-create an account; safe to call on every first contact.
    pub fn register_account(&self, account: AccountId) -> Result<Account, ServiceError> {
        let _span = tracing::info_span!("register_account", account = %account).entered();
        Ok(self.ledger.register_account(account, Timestamp::now())?)
    }

    /// Enqueue a work item for review.
    pub fn submit(&self, account: AccountId, payload: String) -> Result<ItemId, ServiceError> {
        let _span = tracing::info_span!("submit", account = %account).entered();
        let id = self.ledger.submit(account, payload, Timestamp::now())?;
        self.metrics.submissions.inc();
        self.refresh_gauges();
        Ok(id)
    }

    /// Claim the oldest claimable item for a reviewer, using the configured
    /// staleness window. `None` means the queue holds nothing claimable.
    pub fn claim_next(&self, reviewer: ReviewerId) -> Result<Option<QueueItem>, ServiceError> {
        let _span = tracing::info_span!("claim_next", reviewer = %reviewer).entered();
        let item = self
            .claims
            .claim_next(reviewer, self.config.claim_stale_secs, Timestamp::now())?;
        if item.is_some() {
            self.metrics.claims.inc();
        }
        Ok(item)
    }

    /// Put a claimed item back without review.
    pub fn release(&self, item: ItemId) -> Result<(), ServiceError> {
        let _span = tracing::info_span!("release", item = %item).entered();
        self.claims.release(item)?;
        self.metrics.releases.inc();
        Ok(())
    }

    /// Accept an item, crediting the configured reward to its submitter.
    pub fn accept(
        &self,
        item: ItemId,
        reviewer: ReviewerId,
    ) -> Result<HistoryRecord, ServiceError> {
        let _span = tracing::info_span!("accept", item = %item, reviewer = %reviewer).entered();
        let record = self
            .ledger
            .accept(item, reviewer, self.config.reward(), Timestamp::now())?;
        self.metrics.accepts.inc();
        self.refresh_gauges();
        Ok(record)
    }

    /// Reject an item with a reason. The submitter's balance is untouched.
    pub fn reject(
        &self,
        item: ItemId,
        reviewer: ReviewerId,
        reason: String,
    ) -> Result<HistoryRecord, ServiceError> {
        let _span = tracing::info_span!("reject", item = %item, reviewer = %reviewer).entered();
        let record = self.ledger.reject(item, reviewer, reason, Timestamp::now())?;
        self.metrics.rejects.inc();
        self.refresh_gauges();
        Ok(record)
    }

    // ── Payout flow ─────────────────────────────────────────────────────

    /// Capture an account's full balance into a PENDING payout request,
    /// enforcing the configured minimum.
    pub fn request_payout(&self, account: AccountId) -> Result<PayoutRequest, ServiceError> {
        let _span = tracing::info_span!("request_payout", account = %account).entered();
        let request =
            self.ledger
                .request_payout(account, self.config.min_payout(), Timestamp::now())?;
        self.metrics.payout_requests.inc();
        self.refresh_gauges();
        Ok(request)
    }

    /// Execute one PENDING request end to end: quote, convert, transfer,
    /// confirm. Failures route to the metrics they belong to; a failed
    /// transfer has already cancelled the request and restored the balance
    /// by the time the error comes back.
    pub async fn process_payout(
        &self,
        payout: PayoutId,
        reviewer: ReviewerId,
    ) -> Result<PayoutReceipt, ServiceError> {
        let result = self.payouts.process(payout, reviewer, Timestamp::now()).await;
        match &result {
            Ok(_) => self.metrics.payouts_confirmed.inc(),
            Err(PayoutError::RateUnavailable(_)) => self.metrics.rate_failures.inc(),
            Err(PayoutError::TransferFailed(_)) => {
                self.metrics.transfer_failures.inc();
                self.metrics.payouts_cancelled.inc();
            }
            Err(_) => {}
        }
        self.refresh_gauges();
        Ok(result?)
    }

    /// Manually confirm a PENDING request, recording an externally obtained
    /// transfer reference.
    pub fn confirm_payout(
        &self,
        payout: PayoutId,
        reviewer: ReviewerId,
        tx_ref: String,
    ) -> Result<PayoutRequest, ServiceError> {
        let _span = tracing::info_span!("confirm_payout", payout = %payout).entered();
        let request = self
            .ledger
            .confirm_payout(payout, reviewer, tx_ref, Timestamp::now())?;
        self.metrics.payouts_confirmed.inc();
        self.refresh_gauges();
        Ok(request)
    }

    /// Manually cancel a PENDING request, restoring the captured balance.
    pub fn cancel_payout(
        &self,
        payout: PayoutId,
        reviewer: ReviewerId,
    ) -> Result<PayoutRequest, ServiceError> {
        let _span = tracing::info_span!("cancel_payout", payout = %payout).entered();
        let request = self.ledger.cancel_payout(payout, reviewer, Timestamp::now())?;
        self.metrics.payouts_cancelled.inc();
        self.refresh_gauges();
        Ok(request)
    }

    /// The oldest PENDING request, if any. Payouts drain in request order.
    pub fn oldest_pending_payout(&self) -> Result<Option<PayoutRequest>, ServiceError> {
        Ok(self.ledger.oldest_pending_payout()?)
    }

    // ── Account administration ──────────────────────────────────────────

    /// Set the payout destination from its text form.
    pub fn set_destination(&self, account: AccountId, address: &str) -> Result<(), ServiceError> {
        let _span = tracing::info_span!("set_destination", account = %account).entered();
        let destination = DestAddress::parse(address)?;
        Ok(self.ledger.set_destination(account, destination)?)
    }

    /// Credit a bonus and return the new balance.
    pub fn credit(&self, account: AccountId, amount: Amount) -> Result<Amount, ServiceError> {
        let _span = tracing::info_span!("credit", account = %account, amount = %amount).entered();
        Ok(self.ledger.credit(account, amount)?)
    }

    /// Ban an account. The actor must outrank the target in the permission
    /// hierarchy.
    pub fn ban(&self, actor: ReviewerId, target: AccountId) -> Result<(), ServiceError> {
        let _span = tracing::info_span!("ban", actor = %actor, target = %target).entered();
        self.check_manage(actor, target)?;
        Ok(self.ledger.set_banned(target, true)?)
    }

    /// Lift a ban. Same authority rules as [`ban`](Self::ban).
    pub fn unban(&self, actor: ReviewerId, target: AccountId) -> Result<(), ServiceError> {
        let _span = tracing::info_span!("unban", actor = %actor, target = %target).entered();
        self.check_manage(actor, target)?;
        Ok(self.ledger.set_banned(target, false)?)
    }

    /// Grant or revoke the reviewer flag. Same authority rules as banning.
    pub fn set_reviewer(
        &self,
        actor: ReviewerId,
        target: AccountId,
        reviewer: bool,
    ) -> Result<(), ServiceError> {
        let _span = tracing::info_span!("set_reviewer", actor = %actor, target = %target).entered();
        self.check_manage(actor, target)?;
        Ok(self.ledger.set_reviewer(target, reviewer)?)
    }

    fn check_manage(&self, actor: ReviewerId, target: AccountId) -> Result<(), ServiceError> {
        if !self.hierarchy.can_manage(actor, target) {
            tracing::warn!(actor = %actor, target = %target, "moderation denied");
            return Err(ServiceError::PermissionDenied { actor, target });
        }
        Ok(())
    }

    // ── Reads ───────────────────────────────────────────────────────────

    pub fn get_account(&self, account: AccountId) -> Result<Account, ServiceError> {
        Ok(self.ledger.get_account(account)?)
    }

    pub fn get_payout(&self, payout: PayoutId) -> Result<PayoutRequest, ServiceError> {
        Ok(self.ledger.get_payout(payout)?)
    }

    pub fn account_stats(&self, account: AccountId) -> Result<AccountStats, ServiceError> {
        Ok(self.ledger.account_stats(account)?)
    }

    pub fn global_stats(&self) -> Result<GlobalStats, ServiceError> {
        Ok(self.ledger.global_stats()?)
    }

    /// Review history for one account, newest first.
    pub fn history(
        &self,
        account: AccountId,
        limit: usize,
    ) -> Result<Vec<HistoryRecord>, ServiceError> {
        Ok(self.ledger.history_for_account(account, limit)?)
    }

    /// Prometheus text exposition of every service metric.
    pub fn render_metrics(&self) -> Result<String, ServiceError> {
        self.metrics.render_text()
    }

    /// Re-read the queue depth and pending payout gauges from the store.
    /// Stats errors are logged, never returned: the mutation that triggered
    /// the refresh has already committed.
    fn refresh_gauges(&self) {
        match self.ledger.global_stats() {
            Ok(stats) => {
                self.metrics.queue_depth.set(stats.queue_len as i64);
                self.metrics.pending_payouts.set(stats.pending_payouts as i64);
            }
            Err(e) => tracing::warn!(error = %e, "failed to refresh metric gauges"),
        }
    }
}
