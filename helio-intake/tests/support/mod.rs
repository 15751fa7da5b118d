//! Shared setup for intake integration tests.

#![allow(dead_code)]

use helio_intake::{Adapters, ProjectStore};
use helio_test_utils::{Harness, IntakeConfig};

/// Adapters backed by the harness recorders.
pub fn adapters(harness: &Harness) -> Adapters {
    Adapters::new(
        harness.entities.clone(),
        harness.blobs.clone(),
        harness.identity.clone(),
    )
}

/// A project store over the harness with default configuration.
pub fn project_store(harness: &Harness) -> ProjectStore {
    project_store_with(harness, IntakeConfig::default())
}

pub fn project_store_with(harness: &Harness, config: IntakeConfig) -> ProjectStore {
    ProjectStore::init(adapters(harness), config).expect("test config should be valid")
}
