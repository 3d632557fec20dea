//! Disk cache setup
//!
//! The video cache itself is a collaborator; this module only configures it
//! and wipes it once whenever the on-disk schema version moves forward.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::Result;

/// Current cache schema version
pub const CACHE_SCHEMA_VERSION: u32 = 1;

/// Default capacity limit, 200 MB
pub const DEFAULT_CAPACITY_BYTES: u64 = 200 * 1024 * 1024;

/// Verbosity of the cache's own logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheLogLevel {
    Off,
    Error,
    Warning,
    #[default]
    Info,
    Debug,
    Verbose,
}

/// Cache behaviour applied at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub capacity_bytes: u64,
    pub log_level: CacheLogLevel,
    pub auto_check_usage: bool,
    pub schema_version: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity_bytes: DEFAULT_CAPACITY_BYTES,
            log_level: CacheLogLevel::default(),
            auto_check_usage: true,
            schema_version: CACHE_SCHEMA_VERSION,
        }
    }
}

/// Media cache collaborator
pub trait VideoCache {
    fn set_capacity_limit(&mut self, bytes: u64);

    fn set_log_level(&mut self, level: CacheLogLevel);

    fn set_auto_check_usage(&mut self, enabled: bool);

    /// Remove every cached entry
    fn clean_all(&mut self) -> Result<()>;
}

/// Directory-backed cache
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
    capacity_bytes: u64,
    log_level: CacheLogLevel,
    auto_check_usage: bool,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            capacity_bytes: DEFAULT_CAPACITY_BYTES,
            log_level: CacheLogLevel::default(),
            auto_check_usage: false,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn capacity_limit(&self) -> u64 {
        self.capacity_bytes
    }

    pub fn log_level(&self) -> CacheLogLevel {
        self.log_level
    }

    pub fn auto_check_usage(&self) -> bool {
        self.auto_check_usage
    }

    /// Bytes used by regular files directly under the cache directory
    pub fn usage(&self) -> Result<u64> {
        if !self.dir.exists() {
            return Ok(0);
        }
        let mut total = 0;
        for entry in fs::read_dir(&self.dir)? {
            let metadata = entry?.metadata()?;
            if metadata.is_file() {
                total += metadata.len();
            }
        }
        Ok(total)
    }
}

impl VideoCache for DiskCache {
    fn set_capacity_limit(&mut self, bytes: u64) {
        self.capacity_bytes = bytes;
    }

    fn set_log_level(&mut self, level: CacheLogLevel) {
        self.log_level = level;
    }

    fn set_auto_check_usage(&mut self, enabled: bool) {
        self.auto_check_usage = enabled;
    }

    fn clean_all(&mut self) -> Result<()> {
        if !self.dir.exists() {
            return Ok(());
        }
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)?;
            }
        }
        debug!(dir = %self.dir.display(), "Cache cleaned");
        Ok(())
    }
}

/// Persistent schema-version counter
pub trait VersionStore {
    /// Stored version, 0 if none
    fn load(&self) -> Result<u32>;

    fn store(&self, version: u32) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct VersionRecord {
    version: u32,
    updated_at: DateTime<Utc>,
}

/// Version counter kept in a JSON file
#[derive(Debug, Clone)]
pub struct FileVersionStore {
    path: PathBuf,
}

impl FileVersionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VersionStore for FileVersionStore {
    fn load(&self) -> Result<u32> {
        if !self.path.exists() {
            return Ok(0);
        }
        let text = fs::read_to_string(&self.path)?;
        let record: VersionRecord = serde_json::from_str(&text)?;
        Ok(record.version)
    }

    fn store(&self, version: u32) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let record = VersionRecord {
            version,
            updated_at: Utc::now(),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&record)?)?;
        Ok(())
    }
}

/// Outcome of [`setup_cache`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheSetup {
    /// Version found before setup
    pub previous_version: u32,
    pub version: u32,
    pub cleaned: bool,
}

/// Configure the cache and wipe it if the stored schema version is older
pub fn setup_cache(
    cache: &mut dyn VideoCache,
    store: &dyn VersionStore,
    config: &CacheConfig,
) -> Result<CacheSetup> {
    cache.set_capacity_limit(config.capacity_bytes);
    cache.set_log_level(config.log_level);
    cache.set_auto_check_usage(config.auto_check_usage);

    let previous = store.load()?;
    if previous >= config.schema_version {
        debug!(version = previous, "Cache schema up to date");
        return Ok(CacheSetup {
            previous_version: previous,
            version: previous,
            cleaned: false,
        });
    }

    if let Err(err) = cache.clean_all() {
        warn!(error = %err, "Cache clean failed, version left at {}", previous);
        return Err(err);
    }
    store.store(config.schema_version)?;
    info!(from = previous, to = config.schema_version, "Cache schema upgraded");

    Ok(CacheSetup {
        previous_version: previous,
        version: config.schema_version,
        cleaned: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::cell::Cell;

    struct FailingCache;

    impl VideoCache for FailingCache {
        fn set_capacity_limit(&mut self, _bytes: u64) {}
        fn set_log_level(&mut self, _level: CacheLogLevel) {}
        fn set_auto_check_usage(&mut self, _enabled: bool) {}
        fn clean_all(&mut self) -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
        }
    }

    #[derive(Default)]
    struct MemoryStore(Cell<u32>);

    impl VersionStore for MemoryStore {
        fn load(&self) -> Result<u32> {
            Ok(self.0.get())
        }

        fn store(&self, version: u32) -> Result<()> {
            self.0.set(version);
            Ok(())
        }
    }

    #[test]
    fn test_first_run_cleans_and_records_version() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("segment.bin"), vec![0u8; 512]).unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        let mut cache = DiskCache::new(dir.path());
        assert_eq!(cache.usage().unwrap(), 512);
        let store = FileVersionStore::new(dir.path().join("meta").join("version.json"));
        let meta_dir = dir.path().join("meta");

        let setup = setup_cache(&mut cache, &store, &CacheConfig::default()).unwrap();
        assert!(setup.cleaned);
        assert_eq!(setup.previous_version, 0);
        assert_eq!(store.load().unwrap(), CACHE_SCHEMA_VERSION);
        assert!(!dir.path().join("segment.bin").exists());
        assert!(meta_dir.exists());

        assert_eq!(cache.capacity_limit(), DEFAULT_CAPACITY_BYTES);
        assert_eq!(cache.log_level(), CacheLogLevel::Info);
        assert!(cache.auto_check_usage());
    }

    #[test]
    fn test_current_version_skips_clean() {
        let store = MemoryStore(Cell::new(CACHE_SCHEMA_VERSION));
        let setup = setup_cache(&mut FailingCache, &store, &CacheConfig::default()).unwrap();
        assert!(!setup.cleaned);
    }

    #[test]
    fn test_failed_clean_keeps_old_version() {
        let store = MemoryStore::default();
        let err = setup_cache(&mut FailingCache, &store, &CacheConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(store.load().unwrap(), 0);
    }
}
