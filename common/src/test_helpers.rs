/// Shared test helpers for cross-crate use.
///
/// Centralizes the identifiers and database URLs the integration suites
/// need so individual test files do not duplicate them.
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

// Global counter for unique test identifiers across parallel tests
static GLOBAL_TEST_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate globally unique test identifiers that won't conflict across
/// parallel tests.
///
/// Combines a timestamp with an atomic counter so names stay unique even
/// when suites run in parallel.
pub fn generate_unique_id(prefix: &str) -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis();
    let counter = GLOBAL_TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}-{}-{}", prefix, timestamp, counter)
}

/// Get the test database URL from the environment or the in-memory default.
pub fn get_test_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite::memory:".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_ids_do_not_collide() {
        let a = generate_unique_id("ORDER");
        let b = generate_unique_id("ORDER");
        assert_ne!(a, b);
    }
}
