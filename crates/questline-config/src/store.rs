//! The configuration store: backend seam, singleton row, cached reads.

use std::sync::Mutex;

use questline_types::{Timestamp, UserId};
use serde::{Deserialize, Serialize};

use crate::{ConfigCache, ConfigError, RewardConfig};

/// The persisted singleton configuration row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigRecord {
    /// The document as stored (a JSON value, replaced wholesale on write).
    pub value: serde_json::Value,
    pub version: u64,
    pub updated_by: Option<UserId>,
    pub updated_at: Timestamp,
}

/// Persistence seam for the singleton configuration row.
///
/// Implementations hold exactly one row; `save` replaces it.
pub trait ConfigBackend: Send + Sync {
    /// Loads the singleton row, if one has ever been written.
    fn load(&self) -> Result<Option<ConfigRecord>, ConfigError>;

    /// Replaces the singleton row.
    fn save(&self, record: ConfigRecord) -> Result<(), ConfigError>;
}

/// In-memory backend, the reference implementation used in tests and
/// single-process deployments.
#[derive(Debug, Default)]
pub struct MemoryConfigBackend {
    row: Mutex<Option<ConfigRecord>>,
}

impl MemoryConfigBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigBackend for MemoryConfigBackend {
    fn load(&self) -> Result<Option<ConfigRecord>, ConfigError> {
        let row = self
            .row
            .lock()
            .map_err(|_| ConfigError::Backend("config row lock poisoned".to_string()))?;
        Ok(row.clone())
    }

    fn save(&self, record: ConfigRecord) -> Result<(), ConfigError> {
        let mut row = self
            .row
            .lock()
            .map_err(|_| ConfigError::Backend("config row lock poisoned".to_string()))?;
        *row = Some(record);
        Ok(())
    }
}

/// The configuration store: cached reads, validated versioned writes.
///
/// Reads return the cached document when present, otherwise load the
/// singleton row, seeding the built-in defaults if no row exists yet.
/// Writes validate the full document first (nothing is persisted on
/// failure), bump the version, persist, and then unconditionally invalidate
/// the cache.
pub struct ConfigStore<B: ConfigBackend> {
    backend: B,
    cache: Mutex<ConfigCache>,
}

impl<B: ConfigBackend> ConfigStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            cache: Mutex::new(ConfigCache::new()),
        }
    }

    /// Returns the current document, seeding defaults on first read.
    pub fn read(&self) -> Result<RewardConfig, ConfigError> {
        let mut cache = self.lock_cache()?;
        if let Some((value, _)) = cache.get() {
            return Ok(value.clone());
        }

        let (config, version) = match self.backend.load()? {
            Some(record) => {
                let config = serde_json::from_value(record.value).map_err(|e| {
                    ConfigError::Backend(format!("stored configuration is unreadable: {e}"))
                })?;
                (config, record.version)
            }
            None => {
                let defaults = RewardConfig::default();
                let record = ConfigRecord {
                    value: serde_json::to_value(&defaults)
                        .map_err(|e| ConfigError::Backend(e.to_string()))?,
                    version: 1,
                    updated_by: None,
                    updated_at: Timestamp::now(),
                };
                self.backend.save(record)?;
                tracing::info!(version = 1, "seeded default reward configuration");
                (defaults, 1)
            }
        };

        cache.fill(config.clone(), version);
        Ok(config)
    }

    /// Replaces the document. Returns the new row version.
    ///
    /// Validation failures leave the row and the cache untouched.
    pub fn write(
        &self,
        doc: &serde_json::Value,
        actor: &UserId,
    ) -> Result<u64, ConfigError> {
        let config = RewardConfig::from_document(doc)?;

        // The cache guard doubles as the writer lock: holding it across the
        // load-then-save keeps concurrent writes from minting the same
        // version.
        let mut cache = self.lock_cache()?;

        let current_version = self.backend.load()?.map_or(0, |record| record.version);
        let new_version = current_version + 1;

        self.backend.save(ConfigRecord {
            value: serde_json::to_value(&config)
                .map_err(|e| ConfigError::Backend(e.to_string()))?,
            version: new_version,
            updated_by: Some(actor.clone()),
            updated_at: Timestamp::now(),
        })?;

        // Invalidate after the write lands, never before.
        cache.invalidate();

        tracing::info!(version = new_version, actor = %actor, "reward configuration updated");
        Ok(new_version)
    }

    /// The version of the row the cache was loaded from, if cached.
    pub fn cached_version(&self) -> Result<Option<u64>, ConfigError> {
        Ok(self.lock_cache()?.get().map(|(_, version)| version))
    }

    fn lock_cache(&self) -> Result<std::sync::MutexGuard<'_, ConfigCache>, ConfigError> {
        self.cache
            .lock()
            .map_err(|_| ConfigError::Backend("config cache lock poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ConfigStore<MemoryConfigBackend> {
        ConfigStore::new(MemoryConfigBackend::new())
    }

    #[test]
    fn first_read_seeds_defaults() {
        let store = store();
        let config = store.read().expect("read should seed defaults");
        assert_eq!(config, RewardConfig::default());

        let row = store.backend.load().expect("load").expect("row seeded");
        assert_eq!(row.version, 1);
        assert!(row.updated_by.is_none());
    }

    #[test]
    fn read_caches_and_serves_from_cache() {
        let store = store();
        store.read().expect("seed");
        assert_eq!(store.cached_version().expect("cache"), Some(1));

        // Mutate the backend behind the store's back: a cached read must not
        // observe it.
        let mut record = store.backend.load().expect("load").expect("row");
        record.value = serde_json::to_value(RewardConfig {
            daily_high_cap: 999,
            ..RewardConfig::default()
        })
        .expect("serializable");
        record.version = 7;
        store.backend.save(record).expect("save");

        assert_eq!(store.read().expect("cached read"), RewardConfig::default());
    }

    #[test]
    fn write_bumps_version_and_invalidates_cache() {
        let store = store();
        store.read().expect("seed v1");

        let updated = RewardConfig {
            daily_high_cap: 450,
            ..RewardConfig::default()
        };
        let doc = serde_json::to_value(&updated).expect("serializable");
        let version = store.write(&doc, &UserId::from("admin")).expect("write");
        assert_eq!(version, 2);
        assert_eq!(store.cached_version().expect("cache"), None);

        // Next read observes the new document and refills the cache.
        assert_eq!(store.read().expect("reload"), updated);
        assert_eq!(store.cached_version().expect("cache"), Some(2));
    }

    #[test]
    fn write_on_empty_backend_starts_at_version_one() {
        let store = store();
        let doc = serde_json::to_value(RewardConfig::default()).expect("serializable");
        let version = store.write(&doc, &UserId::from("admin")).expect("write");
        assert_eq!(version, 1);
    }

    #[test]
    fn invalid_write_persists_nothing() {
        let store = store();
        store.read().expect("seed v1");

        let mut doc = serde_json::to_value(RewardConfig::default()).expect("serializable");
        doc.as_object_mut()
            .expect("object")
            .remove("onTimeBonus");

        let err = store
            .write(&doc, &UserId::from("admin"))
            .expect_err("must reject");
        assert!(matches!(err, ConfigError::Validation { .. }));

        // Row still at version 1, cache untouched.
        let row = store.backend.load().expect("load").expect("row");
        assert_eq!(row.version, 1);
        assert_eq!(store.cached_version().expect("cache"), Some(1));
    }

    #[test]
    fn concurrent_writes_mint_distinct_versions() {
        let store = store();
        store.read().expect("seed v1");
        let doc = serde_json::to_value(RewardConfig::default()).expect("serializable");

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    store.write(&doc, &UserId::from("admin")).expect("write");
                });
            }
        });

        // Four serialized writes on top of the seeded row: versions 2..=5,
        // no duplicates.
        let row = store.backend.load().expect("load").expect("row");
        assert_eq!(row.version, 5);
    }

    #[test]
    fn write_records_the_acting_admin() {
        let store = store();
        let doc = serde_json::to_value(RewardConfig::default()).expect("serializable");
        store.write(&doc, &UserId::from("admin-7")).expect("write");

        let row = store.backend.load().expect("load").expect("row");
        assert_eq!(row.updated_by, Some(UserId::from("admin-7")));
    }
}
