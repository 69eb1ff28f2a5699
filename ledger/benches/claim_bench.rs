use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use merit_ledger::{ClaimManager, Ledger};
use merit_store_lmdb::LmdbEnvironment;
use merit_types::{AccountId, Amount, ReviewerId, Timestamp};

const STALE_AFTER: u64 = 600;

fn seeded_queue(depth: u64) -> (tempfile::TempDir, Ledger, ClaimManager) {
    let dir = tempfile::tempdir().expect("temp dir");
    let env = Arc::new(
        LmdbEnvironment::open(dir.path(), 16, 256 * 1024 * 1024).expect("open env"),
    );
    let ledger = Ledger::new(env.clone());
    let claims = ClaimManager::new(env);

    let account = AccountId::new(1);
    ledger
        .register_account(account, Timestamp::new(1))
        .expect("register");
    for i in 0..depth {
        ledger
            .submit(account, format!("work-{i}"), Timestamp::new(10 + i))
            .expect("submit");
    }
    (dir, ledger, claims)
}

fn bench_claim_next(c: &mut Criterion) {
    let mut group = c.benchmark_group("claim_next");

    for depth in [1u64, 100, 1_000, 10_000] {
        let (_dir, _ledger, claims) = seeded_queue(depth);
        let now = Timestamp::new(1_000_000);

        // Claiming and resuming the same head item each iteration keeps the
        // queue depth constant across samples.
        group.bench_with_input(BenchmarkId::new("queue_depth", depth), &depth, |b, _| {
            b.iter(|| {
                black_box(
                    claims
                        .claim_next(black_box(ReviewerId::new(1)), STALE_AFTER, black_box(now))
                        .expect("claim"),
                )
            });
        });
    }

    group.finish();
}

fn bench_claim_scan_past_fresh_claims(c: &mut Criterion) {
    let mut group = c.benchmark_group("claim_scan");

    // Every item ahead of the target is freshly claimed by other reviewers,
    // so each call scans the full prefix before finding claimable work.
    for claimed_prefix in [10u64, 100, 1_000] {
        let (_dir, _ledger, claims) = seeded_queue(claimed_prefix + 1);
        let now = Timestamp::new(1_000_000);
        for r in 0..claimed_prefix {
            claims
                .claim_next(ReviewerId::new(100 + r), STALE_AFTER, now)
                .expect("claim")
                .expect("item");
        }

        group.bench_with_input(
            BenchmarkId::new("claimed_prefix", claimed_prefix),
            &claimed_prefix,
            |b, _| {
                b.iter(|| {
                    black_box(
                        claims
                            .claim_next(black_box(ReviewerId::new(1)), STALE_AFTER, black_box(now))
                            .expect("claim"),
                    )
                });
            },
        );
    }

    group.finish();
}

fn bench_submit(c: &mut Criterion) {
    let (_dir, ledger, _claims) = seeded_queue(0);
    let account = AccountId::new(1);
    let mut ts = 1_000u64;

    c.bench_function("submit", |b| {
        b.iter(|| {
            ts += 1;
            black_box(
                ledger
                    .submit(account, "bench payload".to_string(), Timestamp::new(ts))
                    .expect("submit"),
            )
        });
    });
}

fn bench_accept(c: &mut Criterion) {
    let (_dir, ledger, claims) = seeded_queue(0);
    let account = AccountId::new(1);
    let reviewer = ReviewerId::new(1);

    c.bench_function("claim_and_accept", |b| {
        b.iter_batched(
            || {
                ledger
                    .submit(account, "bench payload".to_string(), Timestamp::new(10))
                    .expect("submit")
            },
            |_| {
                let now = Timestamp::new(20);
                let item = claims
                    .claim_next(reviewer, STALE_AFTER, now)
                    .expect("claim")
                    .expect("item");
                ledger
                    .accept(item.id, reviewer, Amount::from_units(1), now)
                    .expect("accept");
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_claim_next,
    bench_claim_scan_past_fresh_claims,
    bench_submit,
    bench_accept,
);
criterion_main!(benches);
