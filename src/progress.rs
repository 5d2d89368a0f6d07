use crate::{CryptoStore, Error, MessageId, SourceId};
use std::path::PathBuf;
use tracing::debug;

/// Folds one more seen id into a running watermark.
///
/// Sources may deliver messages in any order within a window, so the next
/// watermark is the maximum of everything seen, not the id of the last item.
pub fn advance_watermark(current: Option<MessageId>, seen: MessageId) -> MessageId {
    match current {
        Some(current) => current.max(seen),
        None => seen,
    }
}

/// Per-source record of the last processed message id.
#[derive(Clone, Debug)]
pub struct ProgressTracker {
    store: CryptoStore,
    root: PathBuf,
}

impl ProgressTracker {
    pub fn new(store: CryptoStore, messages_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            root: messages_dir.into(),
        }
    }

    pub fn watermark_path(&self, source: SourceId) -> PathBuf {
        self.root
            .join(source.to_string())
            .join("meta.latest_msg.txt.enc")
    }

    /// The last processed id of `source`, or `None` if it was never synced.
    ///
    /// A record that exists but cannot be read is an error, never `None`:
    /// treating it as absent would silently restart the source from scratch.
    pub async fn watermark(&self, source: SourceId) -> Result<Option<MessageId>, Error> {
        let path = self.watermark_path(source);
        if !self.store.exists(&path).await? {
            return Ok(None);
        }

        let text = self.store.read_text(&path).await?;
        let id = text
            .trim()
            .parse::<MessageId>()
            .map_err(|err| Error::CorruptRecord {
                path,
                reason: err.to_string(),
            })?;

        debug!("last known message for {source}: {id}");
        Ok(Some(id))
    }

    pub async fn set_watermark(&self, source: SourceId, id: MessageId) -> Result<(), Error> {
        debug!("committing watermark {id} for {source}");
        self.store
            .write_text(&self.watermark_path(source), &id.to_string())
            .await
    }
}
