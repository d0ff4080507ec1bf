pub mod config;

/// Common utilities shared across the Airsupply Pilot workspace.
///
/// This crate provides shared functionality used by the domain crate and
/// its binaries:
///
/// - YAML configuration loading for all executables
/// - Shared test utilities (unique ids, test database URLs)

// Test helpers module - available for both development and test builds
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

#[cfg(any(test, feature = "test-helpers"))]
pub use test_helpers::{generate_unique_id, get_test_database_url};
