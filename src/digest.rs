use crate::{
    CryptoStore, Error, MessageSource, SessionStore, SourceInfo, Summarizer, SyncConfig,
    SyncEngine,
};
use tracing::{error, info, warn};

/// What one source produced during a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DigestOutcome {
    Summary(String),
    /// No new message with content since the last run.
    NothingNew,
    /// Messages were archived and the watermark advanced, but the summarizer
    /// failed.
    SummaryUnavailable(String),
    /// The pass failed. The watermark is unchanged.
    Failed(Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Digest {
    pub source: SourceInfo,
    pub outcome: DigestOutcome,
}

/// Runs sync passes over every source of a connected client and summarizes
/// what each pass archived.
pub struct Digester {
    engine: SyncEngine,
    sessions: SessionStore,
    source: Box<dyn MessageSource>,
    summarizer: Box<dyn Summarizer>,
}

impl Digester {
    pub fn new(
        config: SyncConfig,
        store: CryptoStore,
        source: Box<dyn MessageSource>,
        summarizer: Box<dyn Summarizer>,
    ) -> Self {
        let sessions = SessionStore::new(store.clone(), &config);
        let engine = SyncEngine::new(config, store);

        Self {
            engine,
            sessions,
            source,
            summarizer,
        }
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Processes every source, one at a time.
    ///
    /// Only a failure to list sources aborts the run. A failing source is
    /// reported as [`DigestOutcome::Failed`] and the run moves on.
    pub async fn run(&self) -> Result<Vec<Digest>, Error> {
        let sources = self.source.list_sources().await?;
        info!("{} sources to process", sources.len());

        let mut digests = Vec::with_capacity(sources.len());
        for source in sources {
            let outcome = self.digest_source(&source).await;
            digests.push(Digest { source, outcome });
        }

        Ok(digests)
    }

    pub async fn digest_source(&self, info: &SourceInfo) -> DigestOutcome {
        let pass = match self.engine.sync_source(&*self.source, info.id).await {
            Ok(pass) => pass,
            Err(err) => {
                error!("sync of '{}' failed: {err}", info.name);
                return DigestOutcome::Failed(err);
            }
        };

        let Some(transcript) = pass.transcript else {
            info!("nothing new in '{}'", info.name);
            return DigestOutcome::NothingNew;
        };

        match self.summarizer.summarize(&transcript, &pass.photos).await {
            Ok(Some(summary)) => DigestOutcome::Summary(summary),
            Ok(None) => DigestOutcome::NothingNew,
            Err(err) => {
                warn!("summary of '{}' unavailable: {err}", info.name);
                DigestOutcome::SummaryUnavailable(err.to_string())
            }
        }
    }

    /// Persists the client's session so the next startup can resume it.
    pub async fn shutdown(self) -> Result<(), Error> {
        let session = self.source.export_session().await?;
        self.sessions.save(&session).await?;
        info!("session saved to {}", self.sessions.path().display());
        Ok(())
    }
}
