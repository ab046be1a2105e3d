mod common;

use std::time::{Duration, Instant};

use common::{on_disk, root, user};
use fortune_core::{ClaimError, PrizeUpdate, RetryPolicy};
use sqlx::{Connection, SqliteConnection};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn claims_and_deactivations_race_on_a_wal_database() {
    let dir = tempfile::tempdir().unwrap();
    let (fortune, _pool, _url) = on_disk(&dir, Duration::from_secs(5), RetryPolicy::default()).await;
    let active = fortune.prizes.list_active().await.unwrap();
    assert_eq!(active.len(), 6);

    let same = user(42);
    let mut claims = Vec::new();
    for i in 0..24 {
        let shared = fortune.clone();
        let same = same.clone();
        claims.push(tokio::spawn(async move { shared.allocator.claim(&same).await }));
        if i % 2 == 0 {
            let fortune = fortune.clone();
            claims.push(tokio::spawn(async move {
                fortune.allocator.claim(&user(1_000 + i)).await
            }));
        }
    }
    let mut toggles = Vec::new();
    for prize in &active[3..] {
        let fortune = fortune.clone();
        let id = prize.id;
        toggles.push(tokio::spawn(async move {
            let patch = PrizeUpdate {
                active: Some(false),
                ..Default::default()
            };
            fortune.admin.update_prize(&root(), id, patch).await
        }));
    }

    let (mut won, mut already) = (0, 0);
    for handle in claims {
        match handle.await.unwrap() {
            Ok(_) => won += 1,
            Err(ClaimError::AlreadyClaimed) => already += 1,
            Err(other) => panic!("unexpected claim error: {other}"),
        }
    }
    for handle in toggles {
        handle.await.unwrap().unwrap();
    }

    // one win for identity 42 plus one per distinct identity
    assert_eq!(won, 13);
    assert_eq!(already, 23);
    assert_eq!(fortune.ledger.count().await.unwrap(), 13);
    let for_42 = fortune
        .ledger
        .records()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.identity_id == 42)
        .count();
    assert_eq!(for_42, 1);
    assert_eq!(fortune.prizes.list_active().await.unwrap().len(), 3);
}

#[tokio::test]
async fn locked_database_exhausts_reservation_retries() {
    let dir = tempfile::tempdir().unwrap();
    let busy = Duration::from_millis(50);
    let attempts = 3;
    let (fortune, _pool, url) = on_disk(&dir, busy, RetryPolicy::new(attempts, Duration::from_millis(5))).await;

    let mut holder = SqliteConnection::connect(&url).await.unwrap();
    sqlx::query("BEGIN IMMEDIATE").execute(&mut holder).await.unwrap();

    let started = Instant::now();
    let result = fortune.allocator.claim(&user(7)).await;
    let waited = started.elapsed();
    assert!(
        matches!(result, Err(ClaimError::StoreUnavailable(_))),
        "expected StoreUnavailable, got {result:?}"
    );
    // every attempt waits out the busy timeout before giving up
    assert!(waited >= busy * (attempts as u32 - 1), "only waited {waited:?}");

    sqlx::query("ROLLBACK").execute(&mut holder).await.unwrap();
    assert_eq!(fortune.ledger.count().await.unwrap(), 0);
    assert!(fortune.ledger.check_claimed(7).await.unwrap().is_none());

    fortune.allocator.claim(&user(7)).await.unwrap();
    assert!(fortune.ledger.check_claimed(7).await.unwrap().is_some());
}

#[tokio::test]
async fn conflicts_are_not_retried_even_with_a_budget() {
    let dir = tempfile::tempdir().unwrap();
    let (fortune, _pool, _url) =
        on_disk(&dir, Duration::from_secs(5), RetryPolicy::new(5, Duration::from_secs(30))).await;

    fortune.allocator.claim(&user(9)).await.unwrap();
    let started = Instant::now();
    let again = fortune.allocator.claim(&user(9)).await;
    assert!(matches!(again, Err(ClaimError::AlreadyClaimed)));
    assert!(started.elapsed() < Duration::from_secs(30));
}
