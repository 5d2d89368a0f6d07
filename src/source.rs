use crate::{Error, MessageId, RawMessage, SourceId, SourceInfo};
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Failure reported by a [`MessageSource`].
#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
#[error("{0}")]
pub struct SourceError(pub String);

impl From<SourceError> for Error {
    fn from(value: SourceError) -> Self {
        Self::SourceFetch(value.0)
    }
}

/// Failure reported by a [`Summarizer`].
#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
#[error("{0}")]
pub struct SummarizerError(pub String);

impl From<SummarizerError> for Error {
    fn from(value: SummarizerError) -> Self {
        Self::Summarizer(value.0)
    }
}

/// A finite, non-restartable sequence of messages in source-defined order.
pub type MessageStream<'a> = BoxStream<'a, Result<RawMessage, SourceError>>;

/// A connected chat client.
///
/// Connection, authentication and reconnection are the implementation's
/// business. Streams may yield ids in any order.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// All sources the account can read.
    async fn list_sources(&self) -> Result<Vec<SourceInfo>, SourceError>;

    /// The `limit` most recent messages of `source`.
    fn fetch_recent(&self, source: SourceId, limit: usize) -> MessageStream<'_>;

    /// Every message of `source` with an id strictly greater than `min_id`.
    fn fetch_since(&self, source: SourceId, min_id: MessageId) -> MessageStream<'_>;

    /// Marks a message as read on the source.
    async fn acknowledge(&self, source: SourceId, message: &RawMessage)
    -> Result<(), SourceError>;

    /// Name used in the permalink of a message.
    async fn resolve_author(
        &self,
        source: SourceId,
        message: &RawMessage,
    ) -> Result<String, SourceError>;

    /// Bytes of the photo attached to a message.
    async fn download_photo(
        &self,
        source: SourceId,
        message: &RawMessage,
    ) -> Result<Vec<u8>, SourceError>;

    /// Serialized login session, persisted at shutdown and handed back at the
    /// next startup.
    async fn export_session(&self) -> Result<String, SourceError>;
}

/// A text summarization backend.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarizes `text`, optionally with JPEG images for context.
    ///
    /// Returns `Ok(None)` for empty input.
    async fn summarize(
        &self,
        text: &str,
        images: &[Vec<u8>],
    ) -> Result<Option<String>, SummarizerError>;
}
