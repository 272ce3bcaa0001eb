mod common;

use std::fs;
use std::time::Duration;

use tokio_test::assert_ok;

use cache_warmer::config::ExecutionMode;
use cache_warmer::models::RunReport;
use cache_warmer::orchestrator::RunCoordinator;

use common::{test_config, urlset, FakeFetcher, FakeLauncher, FakeState};

const HOUR_MS: i64 = 60 * 60 * 1000;

fn shop_fetcher() -> FakeFetcher {
    FakeFetcher::new().with(
        "https://shop.test/sitemap.xml",
        urlset(&[
            "https://shop.test/",
            "https://shop.test/catalog/",
            "https://shop.test/admin/settings",
        ]),
    )
}

#[tokio::test]
async fn test_end_to_end_single_site() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let state = FakeState::new();

    let coordinator = RunCoordinator::new(&config, shop_fetcher(), FakeLauncher::new(state.clone()));
    let report = assert_ok!(coordinator.run().await);

    let RunReport::Completed { statistics, sites } = report else {
        panic!("应该完成预热");
    };
    assert_eq!(statistics.total, 2);
    assert_eq!(statistics.success, 2);
    assert_eq!(statistics.cache_generated, 2);
    assert_eq!(statistics.failed, 0);

    assert_eq!(sites.len(), 1);
    assert_eq!(sites[0].discovered, 2);
    assert_eq!(sites[0].selected, 2);

    assert!(state.visited().iter().all(|url| !url.contains("/admin/")));
    assert!(!config.lock_file.exists());
}

#[tokio::test]
async fn test_fresh_lock_skips_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let content = chrono::Utc::now().timestamp_millis().to_string();
    fs::write(&config.lock_file, &content).unwrap();

    let state = FakeState::new();
    let fetcher = shop_fetcher();
    let fetches = fetcher.fetches.clone();

    let coordinator = RunCoordinator::new(&config, fetcher, FakeLauncher::new(state.clone()));
    let report = assert_ok!(coordinator.run().await);

    assert!(matches!(report, RunReport::Skipped { .. }));
    assert!(report.statistics().is_none());
    assert_eq!(FakeState::count(&fetches), 0);
    assert_eq!(FakeState::count(&state.launches), 0);
    assert_eq!(FakeState::count(&state.navigations), 0);
    assert_eq!(fs::read_to_string(&config.lock_file).unwrap(), content);
}

#[tokio::test]
async fn test_stale_lock_is_replaced_and_released() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let stale = chrono::Utc::now().timestamp_millis() - 4 * HOUR_MS;
    fs::write(&config.lock_file, stale.to_string()).unwrap();

    let state = FakeState::new();
    let coordinator = RunCoordinator::new(&config, shop_fetcher(), FakeLauncher::new(state.clone()));
    let report = assert_ok!(coordinator.run().await);

    assert_eq!(report.statistics().map(|s| s.total), Some(2));
    assert_eq!(FakeState::count(&state.navigations), 2);
    assert!(!config.lock_file.exists());
}

#[tokio::test]
async fn test_launch_failure_still_releases_lock() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let state = FakeState::new();
    state.limit_launches(0);

    let coordinator = RunCoordinator::new(&config, shop_fetcher(), FakeLauncher::new(state.clone()));
    let report = assert_ok!(coordinator.run().await);

    let stats = report.statistics().cloned().unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.success, 0);
    assert_eq!(stats.failed, 2);
    assert!(!config.lock_file.exists());
}

#[tokio::test]
async fn test_launch_failure_keeps_finished_batches_in_report() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.batch_size = 1;
    let state = FakeState::new();
    state.limit_launches(1);

    let coordinator = RunCoordinator::new(&config, shop_fetcher(), FakeLauncher::new(state.clone()));
    let report = assert_ok!(coordinator.run().await);

    let RunReport::Completed { statistics, sites } = report else {
        panic!("应该完成预热");
    };
    assert_eq!(statistics.total, 2);
    assert_eq!(statistics.success, 1);
    assert_eq!(statistics.failed, 1);
    assert_eq!(sites[0].statistics.as_ref().map(|s| s.success), Some(1));
    assert!(!config.lock_file.exists());
}

#[tokio::test]
async fn test_end_to_end_worker_pool() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.execution_mode = ExecutionMode::WorkerPool;
    config.max_concurrency = 2;
    let state = FakeState::with_nav_delay(Duration::from_millis(20));
    state.set_status("/catalog/", 503);

    let coordinator = RunCoordinator::new(&config, shop_fetcher(), FakeLauncher::new(state.clone()));
    let report = assert_ok!(coordinator.run().await);

    let stats = report.statistics().cloned().unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.success, 1);
    assert_eq!(stats.failed, stats.total - stats.success);
    assert_eq!(FakeState::count(&state.launches), 1);
    assert_eq!(FakeState::count(&state.max_in_flight), 2);
    assert!(!config.lock_file.exists());
}

#[tokio::test]
async fn test_unreachable_sitemap_completes_with_empty_stats() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let state = FakeState::new();

    let coordinator = RunCoordinator::new(&config, FakeFetcher::new(), FakeLauncher::new(state.clone()));
    let report = assert_ok!(coordinator.run().await);

    let RunReport::Completed { statistics, sites } = report else {
        panic!("应该完成预热");
    };
    assert_eq!(statistics.total, 0);
    assert_eq!(sites[0].statistics, None);
    assert_eq!(FakeState::count(&state.launches), 0);
    assert!(!config.lock_file.exists());
}

#[tokio::test]
async fn test_max_urls_per_site_truncates_after_priority() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.max_urls_per_site = 1;
    config.priority_patterns = vec!["/catalog/".to_string()];
    let state = FakeState::new();

    let coordinator = RunCoordinator::new(&config, shop_fetcher(), FakeLauncher::new(state.clone()));
    let report = assert_ok!(coordinator.run().await);

    assert_eq!(report.statistics().map(|s| s.total), Some(1));
    let visited = state.visited();
    assert_eq!(visited.len(), 1);
    assert!(visited[0].starts_with("https://shop.test/catalog/"));
}
