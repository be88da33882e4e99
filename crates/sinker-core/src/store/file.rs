// # File Probe Store
//
// File-based implementation of ProbeStore with crash recovery.
//
// ## Purpose
//
// Keeps the registry's probes across daemon restarts in a single JSON
// document. Every mutation is written through immediately.
//
// ## Crash Recovery
//
// - Atomic writes: write to `<path>.tmp`, then rename over the store file
// - A mutation is applied in memory only after its write succeeds
// - Backup: the previous good file is copied to `<path>.backup` first
// - Corruption: a file that fails to parse is replaced by its backup
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "probes": {
//     "3f2a…": { "id": "3f2a…", "fqdn": "probe1.example.com", … }
//   }
// }
// ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::Error;
use crate::config::StoreConfig;
use crate::probe::{Probe, ProbeFilter};
use crate::traits::probe_store::{ProbeStore, ProbeStoreFactory, sort_scan};

/// Store file format version
const STORE_FILE_VERSION: &str = "1.0";

/// File-based probe store with crash recovery
///
/// # Example
///
/// ```rust,no_run
/// use sinker_core::store::FileProbeStore;
/// use sinker_core::traits::ProbeStore;
/// use sinker_core::ProbeFilter;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileProbeStore::open("/var/lib/sinker/probes.json").await?;
///     let probes = store.scan(&ProbeFilter::enabled()).await?;
///     println!("{} enabled probes", probes.len());
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileProbeStore {
    path: PathBuf,
    probes: Arc<RwLock<HashMap<String, Probe>>>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct StoreFileFormat {
    version: String,
    probes: HashMap<String, Probe>,
}

impl FileProbeStore {
    /// Open or create a file store
    ///
    /// 1. Create parent directories if needed
    /// 2. Load the store file, if present
    /// 3. On a parse failure, fall back to the backup
    /// 4. With no usable backup, start empty
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::store(format!(
                    "Failed to create store directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let probes = Self::load_with_recovery(&path).await?;

        Ok(Self {
            path,
            probes: Arc::new(RwLock::new(probes)),
        })
    }

    async fn load_with_recovery(path: &Path) -> Result<HashMap<String, Probe>, Error> {
        let err = match Self::load(path).await {
            Ok(probes) => {
                tracing::debug!("Loaded {} probes from {}", probes.len(), path.display());
                return Ok(probes);
            }
            Err(e @ Error::Json(_)) => e,
            Err(e) => return Err(e),
        };

        tracing::warn!(
            "Store file {} is corrupted ({}), trying backup",
            path.display(),
            err
        );

        let backup = Self::backup_path(path);
        if !backup.exists() {
            tracing::warn!("No backup file found, starting with an empty store");
            return Ok(HashMap::new());
        }

        match Self::load(&backup).await {
            Ok(probes) => {
                tracing::info!("Recovered {} probes from backup", probes.len());
                if let Err(restore_err) = fs::copy(&backup, path).await {
                    tracing::error!("Failed to restore store file from backup: {}", restore_err);
                }
                Ok(probes)
            }
            Err(backup_err) => {
                tracing::error!(
                    "Backup also unreadable ({}), starting with an empty store",
                    backup_err
                );
                Ok(HashMap::new())
            }
        }
    }

    async fn load(path: &Path) -> Result<HashMap<String, Probe>, Error> {
        if !path.exists() {
            tracing::debug!("Store file does not exist yet: {}", path.display());
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(path).await?;
        let file: StoreFileFormat = serde_json::from_str(&content)?;

        if file.version != STORE_FILE_VERSION {
            tracing::warn!(
                "Store file version mismatch: expected {}, got {}. Loading anyway.",
                STORE_FILE_VERSION,
                file.version
            );
        }

        Ok(file.probes)
    }

    /// Write `probes` as the whole store, atomically
    ///
    /// Callers hold the write guard so writers never share the temp file.
    async fn write(&self, probes: &HashMap<String, Probe>) -> Result<(), Error> {
        let file = StoreFileFormat {
            version: STORE_FILE_VERSION.to_string(),
            probes: probes.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        let temp_path = self.temp_path();
        {
            let mut temp = fs::File::create(&temp_path).await.map_err(|e| {
                Error::store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            temp.write_all(json.as_bytes()).await.map_err(|e| {
                Error::store(format!("Failed to write {}: {}", temp_path.display(), e))
            })?;
            temp.flush().await.map_err(|e| {
                Error::store(format!("Failed to flush {}: {}", temp_path.display(), e))
            })?;
        }

        if self.path.exists()
            && let Err(e) = fs::copy(&self.path, Self::backup_path(&self.path)).await
        {
            tracing::warn!("Failed to create backup: {}", e);
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Store written to {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }

    /// Path of the store file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ProbeStore for FileProbeStore {
    async fn insert(&self, probe: &Probe) -> Result<(), Error> {
        let mut guard = self.probes.write().await;
        if guard.contains_key(&probe.id) {
            return Err(Error::store(format!("duplicate probe id {}", probe.id)));
        }

        let mut next = guard.clone();
        next.insert(probe.id.clone(), probe.clone());
        self.write(&next).await?;
        *guard = next;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Probe>, Error> {
        let guard = self.probes.read().await;
        Ok(guard.get(id).cloned())
    }

    async fn update(&self, probe: &Probe) -> Result<(), Error> {
        let mut guard = self.probes.write().await;
        if !guard.contains_key(&probe.id) {
            return Err(Error::store(format!(
                "cannot update missing probe {}",
                probe.id
            )));
        }

        let mut next = guard.clone();
        next.insert(probe.id.clone(), probe.clone());
        self.write(&next).await?;
        *guard = next;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), Error> {
        let mut guard = self.probes.write().await;
        if !guard.contains_key(id) {
            return Ok(());
        }

        let mut next = guard.clone();
        next.remove(id);
        self.write(&next).await?;
        *guard = next;
        Ok(())
    }

    async fn scan(&self, filter: &ProbeFilter) -> Result<Vec<Probe>, Error> {
        let guard = self.probes.read().await;
        let mut probes: Vec<Probe> = guard
            .values()
            .filter(|probe| filter.matches(probe))
            .cloned()
            .collect();
        sort_scan(&mut probes);
        Ok(probes)
    }

    async fn flush(&self) -> Result<(), Error> {
        // Mutations are written through; this rewrites the current snapshot
        let guard = self.probes.write().await;
        self.write(&guard).await
    }
}

/// Factory for the `file` store type
pub struct FileProbeStoreFactory;

#[async_trait]
impl ProbeStoreFactory for FileProbeStoreFactory {
    async fn create(&self, config: &serde_json::Value) -> Result<Box<dyn ProbeStore>, Error> {
        match serde_json::from_value::<StoreConfig>(config.clone())? {
            StoreConfig::File { path } => Ok(Box::new(FileProbeStore::open(path).await?)),
            other => Err(Error::config(format!(
                "Invalid config for file store: {}",
                other.type_name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProbeDefaults;
    use crate::probe::NewProbe;
    use chrono::Utc;
    use tempfile::tempdir;

    fn stored(id: &str, ipv4: &str) -> Probe {
        let mut probe = NewProbe::new("probe1.example.com", ipv4, "Hetzner")
            .into_probe(&ProbeDefaults::default(), Utc::now());
        probe.id = id.to_string();
        probe
    }

    #[tokio::test]
    async fn test_file_store_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("probes.json");

        let store = FileProbeStore::open(&path).await.unwrap();
        assert!(store.scan(&ProbeFilter::default()).await.unwrap().is_empty());

        let mut probe = stored("a", "10.0.0.1");
        store.insert(&probe).await.unwrap();
        probe.enabled = true;
        store.update(&probe).await.unwrap();
        assert!(path.exists());

        let reopened = FileProbeStore::open(&path).await.unwrap();
        assert_eq!(reopened.get("a").await.unwrap(), Some(probe));
    }

    #[tokio::test]
    async fn test_file_store_corruption_recovery() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("probes.json");

        let store = FileProbeStore::open(&path).await.unwrap();
        store.insert(&stored("a", "10.0.0.1")).await.unwrap();
        // Second write leaves the first state in the backup
        store.insert(&stored("b", "10.0.0.2")).await.unwrap();

        let backup_path = FileProbeStore::backup_path(&path);
        assert!(backup_path.exists(), "Backup file should exist after write");

        fs::write(&path, b"corrupted json data").await.unwrap();

        let recovered = FileProbeStore::open(&path).await.unwrap();
        assert!(recovered.get("a").await.unwrap().is_some());
        assert!(
            recovered.get("b").await.unwrap().is_none(),
            "Backup should contain previous state, not latest"
        );
    }

    #[tokio::test]
    async fn test_file_store_delete_is_written_through() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("probes.json");

        let store = FileProbeStore::open(&path).await.unwrap();
        store.insert(&stored("a", "10.0.0.1")).await.unwrap();
        store.delete("a").await.unwrap();

        let reopened = FileProbeStore::open(&path).await.unwrap();
        assert!(reopened.get("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_memory_unchanged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("probes.json");
        let store = FileProbeStore::open(&path).await.unwrap();

        let original = stored("a", "10.0.0.1");
        store.insert(&original).await.unwrap();

        // A directory where the temp file goes makes every write fail
        let blocker = store.temp_path();
        std::fs::create_dir(&blocker).unwrap();

        let err = store.insert(&stored("b", "10.0.0.2")).await.unwrap_err();
        assert!(matches!(err, Error::Store(_)));
        assert!(store.get("b").await.unwrap().is_none());

        let mut changed = original.clone();
        changed.enabled = true;
        assert!(store.update(&changed).await.is_err());
        assert_eq!(store.get("a").await.unwrap(), Some(original.clone()));

        assert!(store.delete("a").await.is_err());
        assert_eq!(
            store.scan(&ProbeFilter::default()).await.unwrap(),
            vec![original.clone()]
        );

        // Memory and disk still agree once writes work again
        std::fs::remove_dir(&blocker).unwrap();
        store.insert(&stored("b", "10.0.0.2")).await.unwrap();
        let reopened = FileProbeStore::open(&path).await.unwrap();
        assert_eq!(reopened.get("a").await.unwrap(), Some(original));
        assert!(reopened.get("b").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_file_factory_requires_file_config() {
        let dir = tempdir().unwrap();
        let config = serde_json::to_value(StoreConfig::File {
            path: dir.path().join("probes.json").display().to_string(),
        })
        .unwrap();

        assert!(FileProbeStoreFactory.create(&config).await.is_ok());

        let memory = serde_json::to_value(StoreConfig::Memory).unwrap();
        assert!(FileProbeStoreFactory.create(&memory).await.is_err());
    }
}
