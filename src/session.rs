use crate::{CryptoStore, Error, SyncConfig};
use std::path::{Path, PathBuf};
use tracing::info;

/// Encrypted storage for the message source's serialized login session.
#[derive(Clone, Debug)]
pub struct SessionStore {
    store: CryptoStore,
    path: PathBuf,
}

impl SessionStore {
    pub fn new(store: CryptoStore, config: &SyncConfig) -> Self {
        let path = config
            .sessions_dir()
            .join(format!("{}.session.enc", config.session_name));
        Self { store, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored session, or `None` on first run. A present but unreadable
    /// session is an error.
    pub async fn load(&self) -> Result<Option<String>, Error> {
        if !self.store.exists(&self.path).await? {
            info!("no stored session, starting a new one");
            return Ok(None);
        }

        self.store.read_text(&self.path).await.map(Some)
    }

    pub async fn save(&self, session: &str) -> Result<(), Error> {
        self.store.write_text(&self.path, session).await
    }
}
