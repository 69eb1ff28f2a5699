//! Orchestrator tests with scripted collaborators: every terminal outcome
//! of `process`, and the ledger state each one must leave behind.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use merit_ledger::Ledger;
use merit_payout::{
    PayoutError, PayoutOrchestrator, RateError, RateSource, TransferClient, TransferError,
};
use merit_store_lmdb::LmdbEnvironment;
use merit_types::{
    AccountId, Amount, CoinAmount, DestAddress, PayoutRequest, PayoutStatus, Rate, ReviewerId,
    Timestamp,
};

// ---------------------------------------------------------------------------
// Scripted collaborators
// ---------------------------------------------------------------------------

struct FixedRate(f64);

#[async_trait]
impl RateSource for FixedRate {
    async fn get_rate(&self) -> Result<Rate, RateError> {
        Ok(Rate::from_f64(self.0).expect("test rate"))
    }
}

struct NoRate;

#[async_trait]
impl RateSource for NoRate {
    async fn get_rate(&self) -> Result<Rate, RateError> {
        Err(RateError::Unavailable("exchange maintenance".into()))
    }
}

/// Records every attempt and returns `tx-<n>`.
#[derive(Default)]
struct RecordingTransfer {
    calls: Mutex<Vec<(String, u64, String)>>,
}

impl RecordingTransfer {
    fn call_count(&self) -> usize {
        self.calls.lock().expect("lock").len()
    }
}

#[async_trait]
impl TransferClient for &RecordingTransfer {
    async fn send(
        &self,
        destination: &DestAddress,
        amount: CoinAmount,
        memo: &str,
    ) -> Result<String, TransferError> {
        let mut calls = self.calls.lock().expect("lock");
        calls.push((destination.as_str().to_string(), amount.nanos(), memo.to_string()));
        Ok(format!("tx-{}", calls.len()))
    }
}

struct RejectingTransfer;

#[async_trait]
impl TransferClient for RejectingTransfer {
    async fn send(
        &self,
        _destination: &DestAddress,
        _amount: CoinAmount,
        _memo: &str,
    ) -> Result<String, TransferError> {
        Err(TransferError::Rejected("destination frozen".into()))
    }
}

/// Never answers inside any reasonable timeout.
struct StalledTransfer {
    attempts: Arc<AtomicUsize>,
}

#[async_trait]
impl TransferClient for StalledTransfer {
    async fn send(
        &self,
        _destination: &DestAddress,
        _amount: CoinAmount,
        _memo: &str,
    ) -> Result<String, TransferError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok("tx-too-late".into())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const TIMEOUT: Duration = Duration::from_millis(50);

fn reviewer() -> ReviewerId {
    ReviewerId::new(7)
}

/// Ledger with one account holding 10.00 and a PENDING request for it.
fn ledger_with_pending_request() -> (tempfile::TempDir, Ledger, PayoutRequest) {
    let dir = tempfile::tempdir().expect("temp dir");
    let env = Arc::new(LmdbEnvironment::open(dir.path(), 16, 10 * 1024 * 1024).expect("open env"));
    let ledger = Ledger::new(env);

    let account = AccountId::new(1);
    ledger
        .register_account(account, Timestamp::new(1))
        .expect("register");
    ledger
        .set_destination(account, DestAddress::parse("coin:participant-1").expect("addr"))
        .expect("destination");
    ledger.credit(account, Amount::from_units(10)).expect("credit");

    let request = ledger
        .request_payout(account, Amount::from_units(5), Timestamp::new(100))
        .expect("request");
    assert_eq!(request.amount, Amount::from_units(10));
    assert!(ledger.get_account(account).expect("account").balance.is_zero());

    (dir, ledger, request)
}

// ---------------------------------------------------------------------------
// 1. Success path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn successful_transfer_confirms_the_request() {
    let (_dir, ledger, request) = ledger_with_pending_request();
    let transfers = RecordingTransfer::default();
    let orchestrator =
        PayoutOrchestrator::new(ledger.clone(), FixedRate(2.0), &transfers, TIMEOUT);

    let receipt = orchestrator
        .process(request.id, reviewer(), Timestamp::new(200))
        .await
        .expect("process");

    // 10.00 at 2.00 per coin is exactly 5 coins.
    assert_eq!(receipt.amount, Amount::from_units(10));
    assert_eq!(receipt.coin_amount, CoinAmount::from_nanos(5 * CoinAmount::NANOS_PER_COIN));
    assert_eq!(receipt.tx_ref, "tx-1");

    let (destination, nanos, memo) = transfers.calls.lock().expect("lock")[0].clone();
    assert_eq!(destination, "coin:participant-1");
    assert_eq!(nanos, 5 * CoinAmount::NANOS_PER_COIN);
    assert_eq!(memo, format!("merit payout #{}", request.id));

    let stored = ledger.get_payout(request.id).expect("payout");
    assert_eq!(stored.status, PayoutStatus::Paid);
    assert_eq!(stored.tx_ref.as_deref(), Some("tx-1"));
    assert_eq!(stored.finalized_at, Some(Timestamp::new(200)));
    assert!(ledger.get_account(request.account).expect("account").balance.is_zero());
    assert_eq!(
        ledger.global_stats().expect("stats").total_paid,
        Amount::from_units(10)
    );
}

#[tokio::test]
async fn second_process_call_changes_nothing() {
    let (_dir, ledger, request) = ledger_with_pending_request();
    let transfers = RecordingTransfer::default();
    let orchestrator =
        PayoutOrchestrator::new(ledger.clone(), FixedRate(2.0), &transfers, TIMEOUT);

    orchestrator
        .process(request.id, reviewer(), Timestamp::new(200))
        .await
        .expect("first process");

    let err = orchestrator
        .process(request.id, reviewer(), Timestamp::new(201))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PayoutError::AlreadyFinalized(_, PayoutStatus::Paid)
    ));

    // No second transfer attempt was made.
    assert_eq!(transfers.call_count(), 1);
    assert_eq!(
        ledger.global_stats().expect("stats").total_paid,
        Amount::from_units(10)
    );
}

// ---------------------------------------------------------------------------
// 2. Transfer failure cancels and restores
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rejected_transfer_cancels_and_restores_balance() {
    let (_dir, ledger, request) = ledger_with_pending_request();
    let orchestrator =
        PayoutOrchestrator::new(ledger.clone(), FixedRate(2.0), RejectingTransfer, TIMEOUT);

    let err = orchestrator
        .process(request.id, reviewer(), Timestamp::new(200))
        .await
        .unwrap_err();
    assert!(matches!(err, PayoutError::TransferFailed(_)));

    let stored = ledger.get_payout(request.id).expect("payout");
    assert_eq!(stored.status, PayoutStatus::Cancelled);
    assert_eq!(stored.tx_ref, None);
    assert_eq!(
        ledger.get_account(request.account).expect("account").balance,
        Amount::from_units(10)
    );
    assert_eq!(ledger.global_stats().expect("stats").total_paid, Amount::ZERO);
}

#[tokio::test]
async fn stalled_transfer_times_out_and_cancels() {
    let (_dir, ledger, request) = ledger_with_pending_request();
    let attempts = Arc::new(AtomicUsize::new(0));
    let transfers = StalledTransfer {
        attempts: attempts.clone(),
    };
    let orchestrator = PayoutOrchestrator::new(ledger.clone(), FixedRate(2.0), transfers, TIMEOUT);

    let err = orchestrator
        .process(request.id, reviewer(), Timestamp::new(200))
        .await
        .unwrap_err();
    assert!(matches!(err, PayoutError::TransferFailed(_)));

    // Exactly one attempt was made; no retry after the timeout.
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert_eq!(
        ledger.get_payout(request.id).expect("payout").status,
        PayoutStatus::Cancelled
    );
    assert_eq!(
        ledger.get_account(request.account).expect("account").balance,
        Amount::from_units(10)
    );
}

// ---------------------------------------------------------------------------
// 3. Quote failures leave the request pending
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_quote_keeps_request_pending_and_retryable() {
    let (_dir, ledger, request) = ledger_with_pending_request();
    let transfers = RecordingTransfer::default();

    let failing =
        PayoutOrchestrator::new(ledger.clone(), NoRate, &transfers, TIMEOUT);
    let err = failing
        .process(request.id, reviewer(), Timestamp::new(200))
        .await
        .unwrap_err();
    assert!(matches!(err, PayoutError::RateUnavailable(_)));
    assert_eq!(transfers.call_count(), 0);

    // Untouched: still PENDING, balance still captured.
    let stored = ledger.get_payout(request.id).expect("payout");
    assert_eq!(stored.status, PayoutStatus::Pending);
    assert!(ledger.get_account(request.account).expect("account").balance.is_zero());

    // A later attempt with a live rate source completes the same request.
    let retry =
        PayoutOrchestrator::new(ledger.clone(), FixedRate(2.0), &transfers, TIMEOUT);
    retry
        .process(request.id, reviewer(), Timestamp::new(300))
        .await
        .expect("retry");
    assert_eq!(
        ledger.get_payout(request.id).expect("payout").status,
        PayoutStatus::Paid
    );
}

#[tokio::test]
async fn quote_that_converts_to_zero_coins_is_unavailable() {
    let dir = tempfile::tempdir().expect("temp dir");
    let env = Arc::new(LmdbEnvironment::open(dir.path(), 16, 10 * 1024 * 1024).expect("open env"));
    let ledger = Ledger::new(env);

    // A dust balance against an enormous unit price.
    let account = AccountId::new(1);
    ledger
        .register_account(account, Timestamp::new(1))
        .expect("register");
    ledger
        .set_destination(account, DestAddress::parse("coin:participant-1").expect("addr"))
        .expect("destination");
    ledger.credit(account, Amount::from_micros(1)).expect("credit");
    let request = ledger
        .request_payout(account, Amount::ZERO, Timestamp::new(100))
        .expect("request");

    let transfers = RecordingTransfer::default();
    let orchestrator = PayoutOrchestrator::new(
        ledger.clone(),
        FixedRate(2_000.0),
        &transfers,
        TIMEOUT,
    );

    let err = orchestrator
        .process(request.id, reviewer(), Timestamp::new(200))
        .await
        .unwrap_err();
    assert!(matches!(err, PayoutError::RateUnavailable(_)));
    assert_eq!(transfers.call_count(), 0);
    assert_eq!(
        ledger.get_payout(request.id).expect("payout").status,
        PayoutStatus::Pending
    );
}

// ---------------------------------------------------------------------------
// 4. Missing request
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_request_is_not_found() {
    let (_dir, ledger, _request) = ledger_with_pending_request();
    let orchestrator = PayoutOrchestrator::new(
        ledger,
        FixedRate(2.0),
        RejectingTransfer,
        TIMEOUT,
    );

    let err = orchestrator
        .process(merit_types::PayoutId::new(999), reviewer(), Timestamp::new(200))
        .await
        .unwrap_err();
    assert!(matches!(err, PayoutError::NotFound(_)));
}
