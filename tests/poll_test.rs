//! Timing behaviour of the poller, on tokio's paused clock.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use consistency_probe::error::Error;
use consistency_probe::poll::{PollConfig, poll};
use tokio::time::Instant;

fn config(interval_ms: u64, timeout_ms: u64) -> PollConfig {
    PollConfig::new(
        Duration::from_millis(interval_ms),
        Duration::from_millis(timeout_ms),
    )
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn returns_after_k_failures() {
    let calls = AtomicU32::new(0);
    let k = 4;

    let value = poll(&config(500, 7000), || async {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= k {
            Err(Error::NotReady(format!("attempt {n}")))
        } else {
            Ok(n)
        }
    })
    .await
    .unwrap();

    assert_eq!(value, k + 1);
    assert_eq!(calls.load(Ordering::SeqCst), k + 1);
}

#[tokio::test(start_paused = true)]
async fn immediate_success_does_not_wait() {
    let calls = AtomicU32::new(0);
    let start = Instant::now();
    let value: Result<&str, _> = poll(&config(500, 7000), || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok::<_, Error>("ready")
    })
    .await;

    assert_eq!(value.unwrap(), "ready");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(start.elapsed() < Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn always_failing_operation_times_out() {
    let calls = AtomicU32::new(0);
    let start = Instant::now();

    let err = poll(&config(100, 1000), || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Err::<(), _>(Error::NotReady("never".into()))
    })
    .await
    .unwrap_err();

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(1000), "elapsed {elapsed:?}");
    assert!(elapsed <= Duration::from_millis(1100), "elapsed {elapsed:?}");
    assert!(calls.load(Ordering::SeqCst) >= 10);
    assert_eq!(err.attempts, calls.load(Ordering::SeqCst));
    assert!(matches!(err.last_error, Some(Error::NotReady(_))));
}

#[tokio::test(start_paused = true)]
async fn timeout_not_a_multiple_of_interval() {
    let calls = AtomicU32::new(0);
    let start = Instant::now();

    let err = poll(&config(500, 700), || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Err::<(), _>(Error::NotReady("no task".into()))
    })
    .await
    .unwrap_err();

    // attempts at 0ms, 500ms and 700ms
    assert_eq!(err.attempts, 3);
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(700), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(710), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn hung_attempt_is_cut_off_by_budget() {
    let err = poll(&config(100, 300), || async {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok::<(), Error>(())
    })
    .await
    .unwrap_err();

    assert_eq!(err.attempts, 1);
    assert!(err.last_error.is_none());
    assert!(err.elapsed >= Duration::from_millis(300));
}

async fn search_that_stays_unavailable() -> consistency_probe::error::Result<()> {
    poll(&config(100, 100), || async {
        Err::<(), _>(Error::remote("search user tasks", Some(503), "unavailable"))
    })
    .await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn timeout_converts_to_crate_error() {
    match search_that_stays_unavailable().await {
        Err(Error::PollTimeout { last_error, .. }) => {
            assert_eq!(last_error.unwrap().to_string(), "search user tasks failed (503): unavailable");
        }
        other => panic!("expected PollTimeout, got {other:?}"),
    }
}
