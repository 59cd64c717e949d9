use std::path::{Path, PathBuf};

use tokio::fs;

use crate::Result;

/// Persists a completed key share to a JSON file, and loads it back on
/// restart.
///
/// Grounded in the coordinator's own `key.json` save/load pair: a
/// completed key generation run is serialized whole and written to a
/// fixed path, and every startup attempts to load it before offering
/// the signing RPC.
pub struct KeyStore {
    path: PathBuf,
}

impl KeyStore {
    /// A key store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Whether a key share has already been persisted.
    pub async fn exists(&self) -> bool {
        fs::try_exists(&self.path).await.unwrap_or(false)
    }

    /// Load the persisted key share, deserializing it as `T`.
    pub async fn load<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        let bytes = fs::read(&self.path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Persist `share`, overwriting any existing file.
    pub async fn save<T: serde::Serialize>(&self, share: &T) -> Result<()> {
        let bytes = serde_json::to_vec(share)?;
        fs::write(&self.path, bytes).await?;
        Ok(())
    }

    /// Path this store reads and writes.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Dummy {
        value: u32,
    }

    #[tokio::test]
    async fn round_trips_through_a_temp_file() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!(
            "tss-node-keystore-test-{}.json",
            std::process::id()
        ));
        let store = KeyStore::new(&path);
        assert!(!store.exists().await);

        store.save(&Dummy { value: 42 }).await.unwrap();
        assert!(store.exists().await);

        let loaded: Dummy = store.load().await.unwrap();
        assert_eq!(loaded, Dummy { value: 42 });

        let _ = fs::remove_file(&path).await;
    }
}
