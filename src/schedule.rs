//! Hourly trigger for the full pipeline (cron `0 * * * *`).

use chrono::{DateTime, Duration, DurationRound, Utc};
use std::future::Future;

/// The next top of the hour strictly after `now`.
pub fn next_hourly_run(now: DateTime<Utc>) -> DateTime<Utc> {
    let hour = Duration::hours(1);
    match now.duration_trunc(hour) {
        Ok(truncated) => truncated + hour,
        Err(_) => now + hour,
    }
}

/// How long to sleep from `now` until the next hourly run.
pub fn delay_until_next_run(now: DateTime<Utc>) -> std::time::Duration {
    (next_hourly_run(now) - now)
        .to_std()
        .unwrap_or(std::time::Duration::ZERO)
}

/// Drive `work` until it finishes or `shutdown` resolves.
///
/// Returns `None` when shutdown won; `work` is dropped at that point, so
/// guards it holds (such as the run lock) are released.
pub async fn until_shutdown<F, S>(work: F, shutdown: S) -> Option<F::Output>
where
    F: Future,
    S: Future,
{
    tokio::select! {
        output = work => Some(output),
        _ = shutdown => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ArtifactStore;
    use chrono::{TimeZone, Timelike};
    use tempfile::tempdir;

    #[test]
    fn test_next_run_is_top_of_next_hour() {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 14, 25, 7).unwrap();
        let next = next_hourly_run(now);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 10, 16, 15, 0, 0).unwrap());
    }

    #[test]
    fn test_exactly_on_the_hour_waits_a_full_hour() {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 23, 0, 0).unwrap();
        let next = next_hourly_run(now);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 10, 17, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_next_run_is_after_now_on_minute_zero() {
        let now = Utc::now();
        let next = next_hourly_run(now);
        assert!(next > now);
        assert_eq!(next.minute(), 0);
        assert_eq!(next.second(), 0);
        assert!(delay_until_next_run(now) <= std::time::Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_running_work() {
        let result = until_shutdown(std::future::pending::<()>(), async {}).await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_finished_work_is_returned() {
        let result = until_shutdown(async { 42 }, std::future::pending::<()>()).await;
        assert_eq!(result, Some(42));
    }

    #[tokio::test]
    async fn test_interrupted_run_releases_its_lock() {
        let tmp = tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path());

        let run = async {
            let _lock = store.lock().unwrap();
            std::future::pending::<()>().await
        };
        let shutdown = tokio::time::sleep(std::time::Duration::from_millis(10));

        assert!(until_shutdown(run, shutdown).await.is_none());
        assert!(!store.dir().join(".pipeline.lock").exists());
        assert!(store.lock().is_ok());
    }
}
