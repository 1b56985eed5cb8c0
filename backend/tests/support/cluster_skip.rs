//! Skip policy for suites that need the embedded cluster.
//!
//! Set `SKIP_TEST_CLUSTER` to `1`, `true` or `yes` where PostgreSQL cannot
//! start; everywhere else a bootstrap failure fails the test loudly.

pub fn should_skip_test_cluster() -> bool {
    std::env::var("SKIP_TEST_CLUSTER")
        .is_ok_and(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

/// Return `None` after printing a skip marker when skipping is allowed,
/// otherwise panic with `reason`.
pub fn handle_cluster_setup_failure<T>(reason: impl std::fmt::Display) -> Option<T> {
    if should_skip_test_cluster() {
        eprintln!("SKIP-TEST-CLUSTER: {reason}");
        return None;
    }
    panic!("embedded cluster setup failed: {reason}. Set SKIP_TEST_CLUSTER=1 to skip.");
}
