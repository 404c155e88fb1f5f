//! Test Database Manager
//!
//! Creates isolated, temporary `Strata` instances for each test so journeys
//! never interfere with each other or with a developer's real store.

use std::path::PathBuf;

use tempfile::TempDir;

use strata_core::{Strata, StrataConfig};

/// Manager for a test store.
///
/// Wraps a [`Strata`] handle backed by a temporary directory, which is
/// deleted when the manager is dropped.
pub struct TestDatabaseManager {
    pub strata: Strata,
    _temp_dir: TempDir,
    store_path: PathBuf,
}

impl TestDatabaseManager {
    /// Opens a new store in a fresh temporary directory.
    pub fn new_temp() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let store_path = temp_dir.path().join("strata-store");
        let config = StrataConfig::new().with_store_path(store_path.clone());
        let strata = Strata::open(config).expect("failed to open test store");

        Self { strata, _temp_dir: temp_dir, store_path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.store_path
    }

    pub fn node_count(&self) -> usize {
        self.strata.store().all_node_ids().map(|ids| ids.len()).unwrap_or(0)
    }

    /// Seeds `count` plain Episode nodes, returning their ids.
    pub fn seed_episodes(&mut self, count: usize) -> Vec<String> {
        (0..count)
            .map(|i| {
                self.strata
                    .add_memory(
                        &format!("Episode {i}"),
                        &format!("Episode body content {i}"),
                        &["Episode"],
                        None,
                        None,
                        None,
                        None,
                    )
                    .expect("add_memory")
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_database_starts_empty() {
        let db = TestDatabaseManager::new_temp();
        assert_eq!(db.node_count(), 0);
        assert!(db.path().exists());
    }

    #[test]
    fn seed_episodes_creates_the_requested_count() {
        let mut db = TestDatabaseManager::new_temp();
        let ids = db.seed_episodes(5);
        assert_eq!(ids.len(), 5);
        assert_eq!(db.node_count(), 5);
    }
}
