use crate::{Error, Identity, Recipient};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Encrypted file storage bound to one identity.
///
/// Every read and write crosses the disk boundary through this type. Sealing and
/// opening run on the blocking thread pool. Clones share the identity.
#[derive(Clone, Debug)]
pub struct CryptoStore {
    identity: Arc<Identity>,
    recipient: Recipient,
}

impl CryptoStore {
    pub fn new(identity: Identity) -> Self {
        let recipient = identity.recipient();
        Self {
            identity: Arc::new(identity),
            recipient,
        }
    }

    /// The public key every file is sealed to.
    pub fn recipient(&self) -> Recipient {
        self.recipient
    }

    /// Whether a file exists at `path`, without trying to decrypt it.
    pub async fn exists(&self, path: &Path) -> Result<bool, Error> {
        tokio::fs::try_exists(path)
            .await
            .map_err(|err| io_error(path, err))
    }

    /// Reads and decrypts a binary payload.
    ///
    /// An absent file is a decryption error here; callers that treat absence as
    /// a normal state check [`CryptoStore::exists`] first.
    pub async fn read_binary(&self, path: &Path) -> Result<Vec<u8>, Error> {
        let sealed = tokio::fs::read(path)
            .await
            .map_err(|err| Error::Decryption {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?;

        let identity = Arc::clone(&self.identity);
        tokio::task::spawn_blocking(move || identity.open(&sealed))
            .await?
            .map_err(|err| Error::Decryption {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })
    }

    /// Reads and decrypts a UTF-8 payload.
    pub async fn read_text(&self, path: &Path) -> Result<String, Error> {
        let bytes = self.read_binary(path).await?;
        String::from_utf8(bytes).map_err(|_| Error::Encoding {
            path: path.to_path_buf(),
        })
    }

    /// Encrypts and atomically writes a binary payload, creating parent
    /// directories as needed.
    pub async fn write_binary(&self, path: &Path, data: Vec<u8>) -> Result<(), Error> {
        let recipient = self.recipient;
        let sealed = tokio::task::spawn_blocking(move || recipient.seal(&data)).await??;

        write_atomically(path, &sealed).await?;
        debug!("wrote {} sealed bytes to {}", sealed.len(), path.display());

        Ok(())
    }

    /// Encrypts and atomically writes a UTF-8 payload.
    pub async fn write_text(&self, path: &Path, text: &str) -> Result<(), Error> {
        self.write_binary(path, text.as_bytes().to_vec()).await
    }
}

/// Writes to a sibling temp file, syncs it, then renames it over `path`. A
/// crash never leaves a half-written file in place of committed data.
async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|err| io_error(parent, err))?;
    }

    let temp_path = temp_path_for(path);
    let mut file = tokio::fs::File::create(&temp_path)
        .await
        .map_err(|err| io_error(&temp_path, err))?;
    file.write_all(bytes)
        .await
        .map_err(|err| io_error(&temp_path, err))?;
    file.sync_all()
        .await
        .map_err(|err| io_error(&temp_path, err))?;
    drop(file);

    if let Err(err) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(io_error(path, err));
    }

    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn io_error(path: &Path, err: std::io::Error) -> Error {
    Error::Io {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> CryptoStore {
        CryptoStore::new(Identity::generate().unwrap())
    }

    #[tokio::test]
    async fn test_text_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store();
        let path = dir.path().join("nested/deeper/msg.1.txt.enc");

        store.write_text(&path, "hello, archive").await.unwrap();

        assert_eq!(store.read_text(&path).await.unwrap(), "hello, archive");
        let on_disk = std::fs::read(&path).unwrap();
        assert!(!on_disk.windows(5).any(|w| w == b"hello"));
    }

    #[tokio::test]
    async fn test_empty_payloads_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store();

        let text_path = dir.path().join("empty.txt.enc");
        store.write_text(&text_path, "").await.unwrap();
        assert_eq!(store.read_text(&text_path).await.unwrap(), "");

        let binary_path = dir.path().join("empty.bin.enc");
        store.write_binary(&binary_path, Vec::new()).await.unwrap();
        assert!(store.read_binary(&binary_path).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_content_and_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let store = store();
        let path = dir.path().join("meta.txt.enc");

        store.write_text(&path, "first").await.unwrap();
        store.write_text(&path, "second").await.unwrap();

        assert_eq!(store.read_text(&path).await.unwrap(), "second");
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("meta.txt.enc")]);
    }

    #[tokio::test]
    async fn test_missing_file_is_a_decryption_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.txt.enc");

        let store = store();
        assert!(!store.exists(&path).await.unwrap());
        assert!(matches!(
            store.read_text(&path).await,
            Err(Error::Decryption { .. })
        ));
    }

    #[tokio::test]
    async fn test_foreign_and_corrupt_files_fail_to_decrypt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("msg.txt.enc");

        store().write_text(&path, "sealed to someone else").await.unwrap();
        assert!(matches!(
            store().read_text(&path).await,
            Err(Error::Decryption { .. })
        ));

        std::fs::write(&path, b"plaintext that was never sealed").unwrap();
        assert!(matches!(
            store().read_text(&path).await,
            Err(Error::Decryption { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_an_encoding_error() {
        let dir = TempDir::new().unwrap();
        let store = store();
        let path = dir.path().join("photo.jpg.enc");

        store.write_binary(&path, vec![0xff, 0xfe, 0xfd]).await.unwrap();

        assert_eq!(
            store.read_text(&path).await,
            Err(Error::Encoding { path: path.clone() })
        );
    }

    #[tokio::test]
    async fn test_concurrent_writes_to_distinct_files() {
        let dir = TempDir::new().unwrap();
        let store = store();

        let writes = (0..32).map(|i| {
            let store = store.clone();
            let path = dir.path().join(format!("msg.{i}.txt.enc"));
            async move { store.write_text(&path, &format!("message {i}")).await }
        });
        for result in futures::future::join_all(writes).await {
            result.unwrap();
        }

        for i in 0..32 {
            let path = dir.path().join(format!("msg.{i}.txt.enc"));
            assert_eq!(store.read_text(&path).await.unwrap(), format!("message {i}"));
        }
    }
}
