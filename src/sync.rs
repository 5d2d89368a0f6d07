//! One incremental pass over one source.
//!
//! A pass reads the source's watermark, fetches either a bounded cold-start
//! window or everything newer than the watermark, archives every message that
//! carries content, and only then commits the new watermark. Because the
//! commit happens after every archival write has completed, an interrupted or
//! failed pass can simply be run again: archived files are overwritten with
//! identical content and the window is re-fetched from the old watermark.

use crate::{
    CryptoStore, Error, Media, MessageArchive, MessageId, MessageSource, NormalizedMessage,
    ProgressTracker, RawMessage, SourceError, SourceId, SyncConfig, TranscriptBuilder,
    advance_watermark,
};
use futures::future::{self, BoxFuture};
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt, TryStreamExt};
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

/// Result of a successful pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassOutcome {
    pub source: SourceId,
    /// Watermark before the pass.
    pub previous_watermark: Option<MessageId>,
    /// Watermark committed by the pass.
    pub watermark: Option<MessageId>,
    /// Archived messages, oldest first.
    pub messages: Vec<NormalizedMessage>,
    /// Photos of the archived messages, oldest first. Only collected when
    /// [`SyncConfig::attach_photos`] is set.
    pub photos: Vec<Vec<u8>>,
    /// Rendered transcript of `messages`, `None` when nothing new arrived.
    pub transcript: Option<String>,
}

/// What one archival task produced.
enum Archived {
    Text,
    Photo {
        id: MessageId,
        bytes: Option<Vec<u8>>,
    },
}

/// Per-source incremental sync over an encrypted archive.
#[derive(Clone, Debug)]
pub struct SyncEngine {
    config: SyncConfig,
    archive: MessageArchive,
    tracker: ProgressTracker,
    transcripts: TranscriptBuilder,
}

impl SyncEngine {
    pub fn new(config: SyncConfig, store: CryptoStore) -> Self {
        let archive = MessageArchive::new(store.clone(), config.messages_dir());
        let tracker = ProgressTracker::new(store, config.messages_dir());
        let transcripts = TranscriptBuilder::new(config.permalink_host.clone());

        Self {
            config,
            archive,
            tracker,
            transcripts,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn archive(&self) -> &MessageArchive {
        &self.archive
    }

    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    /// Runs one pass over `source_id`.
    ///
    /// Fails without touching the watermark if the source fails mid-stream or
    /// if any archival write fails.
    pub async fn sync_source(
        &self,
        source: &dyn MessageSource,
        source_id: SourceId,
    ) -> Result<PassOutcome, Error> {
        info!("processing: '{source_id}'");

        let previous_watermark = self.tracker.watermark(source_id).await?;
        let mut messages = match previous_watermark {
            None => {
                info!("new history for {source_id}");
                source.fetch_recent(source_id, self.config.cold_start_limit)
            }
            Some(watermark) => source.fetch_since(source_id, watermark),
        };

        let limit = self.config.max_concurrent_writes.max(1);
        let mut watermark = previous_watermark;
        let mut seen = HashSet::new();
        let mut batch = Vec::new();
        let mut pending: FuturesUnordered<BoxFuture<'_, Result<Archived, Error>>> =
            FuturesUnordered::new();
        let mut archived = Vec::new();
        let mut acknowledgements: Vec<BoxFuture<'_, (MessageId, Result<(), SourceError>)>> =
            Vec::new();

        // Archival runs while the stream is still being read.
        let streamed: Result<(), Error> = loop {
            tokio::select! {
                Some(done) = pending.next(), if !pending.is_empty() => archived.push(done),
                next = messages.try_next() => {
                    let raw = match next {
                        Ok(Some(raw)) => raw,
                        Ok(None) => break Ok(()),
                        Err(err) => break Err(err.into()),
                    };
                    watermark = Some(advance_watermark(watermark, raw.id));

                    if previous_watermark.is_some_and(|w| raw.id <= w) {
                        debug!("stale delivery of message {}, skipping", raw.id);
                        continue;
                    }
                    if !seen.insert(raw.id) {
                        debug!("message {} delivered twice, skipping", raw.id);
                        continue;
                    }
                    debug!("id: {}: {}", raw.id, raw.text);

                    let ack_message = raw.clone();
                    acknowledgements.push(
                        async move {
                            let result = source.acknowledge(source_id, &ack_message).await;
                            (ack_message.id, result)
                        }
                        .boxed(),
                    );

                    let Some(text) = raw.content() else {
                        debug!("message {} has no content", raw.id);
                        continue;
                    };

                    if raw.media.as_ref().is_some_and(Media::is_photo) {
                        make_room(&mut pending, &mut archived, limit).await;
                        pending.push(self.archive_photo(source, source_id, raw.clone()).boxed());
                    }

                    let author = match source.resolve_author(source_id, &raw).await {
                        Ok(author) => author,
                        Err(err) => break Err(err.into()),
                    };
                    let message = NormalizedMessage {
                        id: raw.id,
                        source: source_id,
                        author,
                        text,
                    };

                    let queued = message.clone();
                    make_room(&mut pending, &mut archived, limit).await;
                    pending.push(
                        async move {
                            self.archive
                                .write_message(&queued)
                                .await
                                .map(|()| Archived::Text)
                        }
                        .boxed(),
                    );
                    batch.push(message);
                }
            }
        };
        drop(messages);

        debug!(
            "waiting for {} archival tasks and {} acknowledgements",
            pending.len(),
            acknowledgements.len()
        );
        let (remaining, acknowledged) = future::join(
            pending.collect::<Vec<_>>(),
            future::join_all(acknowledgements),
        )
        .await;
        archived.extend(remaining);

        for (id, result) in acknowledged {
            if let Err(err) = result {
                warn!("failed to mark message {id} of {source_id} as read: {err}");
            }
        }
        streamed?;

        let mut photos = Vec::new();
        let mut failure = None;
        for result in archived {
            match result {
                Ok(Archived::Text) => {}
                Ok(Archived::Photo { id, bytes }) => {
                    if let Some(bytes) = bytes {
                        photos.push((id, bytes));
                    }
                }
                Err(err) => {
                    error!("archival write for {source_id} failed: {err}");
                    if failure.is_none() {
                        failure = Some(err);
                    }
                }
            }
        }
        if let Some(err) = failure {
            warn!("watermark of {source_id} stays at {previous_watermark:?}");
            return Err(err);
        }

        if let Some(id) = watermark {
            self.tracker.set_watermark(source_id, id).await?;
        }

        // Arrival is typically newest-first and may be shuffled; ids are chronological.
        batch.sort_by_key(|message| message.id);
        photos.sort_by_key(|(id, _)| *id);

        let transcript = self.transcripts.render(&batch);

        Ok(PassOutcome {
            source: source_id,
            previous_watermark,
            watermark,
            messages: batch,
            photos: photos.into_iter().map(|(_, bytes)| bytes).collect(),
            transcript,
        })
    }

    async fn archive_photo(
        &self,
        source: &dyn MessageSource,
        source_id: SourceId,
        raw: RawMessage,
    ) -> Result<Archived, Error> {
        let bytes = source.download_photo(source_id, &raw).await?;
        let kept = self.config.attach_photos.then(|| bytes.clone());

        self.archive.write_media(source_id, raw.id, bytes).await?;
        Ok(Archived::Photo {
            id: raw.id,
            bytes: kept,
        })
    }
}

/// Waits for in-flight archival tasks until fewer than `limit` remain.
async fn make_room<F: Future>(
    pending: &mut FuturesUnordered<F>,
    finished: &mut Vec<F::Output>,
    limit: usize,
) {
    while pending.len() >= limit {
        match pending.next().await {
            Some(done) => finished.push(done),
            None => break,
        }
    }
}
