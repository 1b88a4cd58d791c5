use std::{io::ErrorKind, path::PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use fs4::tokio::AsyncFileExt;
use serde_json::Value;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncWriteExt},
};
use tracing::{debug, warn};

/// Interface for abstracting durable key-value storage. Keys are plain strings, values JSON
/// documents. There are no transactions across keys; callers tolerate that by keeping every
/// write idempotent.
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Removing a key that doesn't exist is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// The main realization of [KeyValueStore]. One file per key inside a dedicated directory.
pub struct JsonFileStore {
    store_dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(store_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&store_dir)?;

        Ok(Self { store_dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.store_dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let path = self.path_for(key);
        debug!("Reading {path:?}");
        let mut file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        file.lock_shared()?;
        let mut contents = String::new();
        let read = file.read_to_string(&mut contents).await;
        file.unlock_async().await?;
        read?;

        match serde_json::from_str(&contents) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                // Might happen after a shutdown cut a write short. Treated as absent, the
                // next write repairs the file.
                warn!("Found illegal json in {path:?}: {e}");
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let path = self.path_for(key);
        let mut file = File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .await?;

        // Semi-safe acquire-release for a file
        file.lock_exclusive()?;
        let write = async {
            file.set_len(0).await?;
            file.write_all(&serde_json::to_vec(&value)?).await?;
            file.flush().await?;
            Ok::<_, anyhow::Error>(())
        }
        .await;
        file.unlock_async().await?;
        write
    }

    async fn remove(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
