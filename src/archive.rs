use crate::{CryptoStore, Error, MessageId, NormalizedMessage, SourceId};
use std::path::{Path, PathBuf};
use tracing::debug;

const MESSAGE_PREFIX: &str = "msg.";
const MESSAGE_SUFFIX: &str = ".txt.enc";

/// Durable, encrypted, one-file-per-item store of archived messages and photos.
///
/// Layout under the messages directory:
///
/// ```text
/// <source>/msg.<id>.txt.enc
/// <source>/photos/photo_<id>.jpg.enc
/// ```
///
/// Writing the same `(source, id)` again overwrites the previous record.
#[derive(Clone, Debug)]
pub struct MessageArchive {
    store: CryptoStore,
    root: PathBuf,
}

impl MessageArchive {
    pub fn new(store: CryptoStore, messages_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            root: messages_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn source_dir(&self, source: SourceId) -> PathBuf {
        self.root.join(source.to_string())
    }

    pub fn message_path(&self, source: SourceId, id: MessageId) -> PathBuf {
        self.source_dir(source)
            .join(format!("{MESSAGE_PREFIX}{id}{MESSAGE_SUFFIX}"))
    }

    pub fn media_path(&self, source: SourceId, id: MessageId) -> PathBuf {
        self.source_dir(source)
            .join("photos")
            .join(format!("photo_{id}.jpg.enc"))
    }

    /// Persists the normalized text of a message.
    pub async fn write_message(&self, message: &NormalizedMessage) -> Result<(), Error> {
        let path = self.message_path(message.source, message.id);
        debug!("archiving message {} of {}", message.id, message.source);
        self.store.write_text(&path, &message.text).await
    }

    /// Persists a downloaded photo next to its message.
    pub async fn write_media(
        &self,
        source: SourceId,
        id: MessageId,
        bytes: Vec<u8>,
    ) -> Result<(), Error> {
        let path = self.media_path(source, id);
        debug!("archiving photo of message {id} of {source}");
        self.store.write_binary(&path, bytes).await
    }

    pub async fn read_message(&self, source: SourceId, id: MessageId) -> Result<String, Error> {
        self.store.read_text(&self.message_path(source, id)).await
    }

    pub async fn read_media(&self, source: SourceId, id: MessageId) -> Result<Vec<u8>, Error> {
        self.store.read_binary(&self.media_path(source, id)).await
    }

    /// Ids of all archived text records of a source, ascending.
    pub async fn archived_ids(&self, source: SourceId) -> Result<Vec<MessageId>, Error> {
        let dir = self.source_dir(source);
        if !self.store.exists(&dir).await? {
            return Ok(Vec::new());
        }

        let io_error = |err: std::io::Error| Error::Io {
            path: dir.clone(),
            reason: err.to_string(),
        };

        let mut entries = tokio::fs::read_dir(&dir).await.map_err(io_error)?;
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
            let name = entry.file_name();
            let id = name
                .to_str()
                .and_then(|name| name.strip_prefix(MESSAGE_PREFIX))
                .and_then(|rest| rest.strip_suffix(MESSAGE_SUFFIX))
                .and_then(|id| id.parse::<MessageId>().ok());

            if let Some(id) = id {
                ids.push(id);
            }
        }

        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Identity;
    use tempfile::TempDir;

    fn archive(dir: &TempDir) -> MessageArchive {
        let store = CryptoStore::new(Identity::generate().unwrap());
        MessageArchive::new(store, dir.path().join("messages"))
    }

    fn message(id: i64, text: &str) -> NormalizedMessage {
        NormalizedMessage {
            id: MessageId(id),
            source: SourceId(-1001),
            author: "channel".to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_paths_are_deterministic() {
        let dir = TempDir::new().unwrap();
        let archive = archive(&dir);
        let root = dir.path().join("messages");

        assert_eq!(
            archive.message_path(SourceId(-1001), MessageId(42)),
            root.join("-1001").join("msg.42.txt.enc")
        );
        assert_eq!(
            archive.media_path(SourceId(-1001), MessageId(42)),
            root.join("-1001").join("photos").join("photo_42.jpg.enc")
        );
    }

    #[tokio::test]
    async fn test_write_and_read_message() {
        let dir = TempDir::new().unwrap();
        let archive = archive(&dir);

        archive.write_message(&message(7, "[PHOTO]\nsunset")).await.unwrap();

        let text = archive.read_message(SourceId(-1001), MessageId(7)).await.unwrap();
        assert_eq!(text, "[PHOTO]\nsunset");
    }

    #[tokio::test]
    async fn test_write_and_read_media() {
        let dir = TempDir::new().unwrap();
        let archive = archive(&dir);
        let jpeg = vec![0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10];

        archive
            .write_media(SourceId(-1001), MessageId(9), jpeg.clone())
            .await
            .unwrap();

        let read = archive.read_media(SourceId(-1001), MessageId(9)).await.unwrap();
        assert_eq!(read, jpeg);
    }

    #[tokio::test]
    async fn test_rewrite_overwrites_instead_of_duplicating() {
        let dir = TempDir::new().unwrap();
        let archive = archive(&dir);

        archive.write_message(&message(3, "draft")).await.unwrap();
        archive.write_message(&message(3, "final")).await.unwrap();
        archive.write_message(&message(1, "older")).await.unwrap();

        assert_eq!(
            archive.archived_ids(SourceId(-1001)).await.unwrap(),
            vec![MessageId(1), MessageId(3)]
        );
        assert_eq!(
            archive.read_message(SourceId(-1001), MessageId(3)).await.unwrap(),
            "final"
        );
    }

    #[tokio::test]
    async fn test_unknown_source_has_no_records() {
        let dir = TempDir::new().unwrap();
        let archive = archive(&dir);

        assert!(archive.archived_ids(SourceId(5)).await.unwrap().is_empty());
    }
}
