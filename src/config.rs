use crate::{ConfigError, Error, Identity, OpenAiSummarizer};
use std::path::PathBuf;

/// Tunables for the sync engine and the on-disk layout.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Root of the encrypted data directory.
    pub data_dir: PathBuf,
    /// Number of most recent messages fetched for a source without a watermark.
    pub cold_start_limit: usize,
    /// Host used in message permalinks.
    pub permalink_host: String,
    /// Upper bound on archival writes in flight during one pass.
    pub max_concurrent_writes: usize,
    /// File stem of the persisted session blob.
    pub session_name: String,
    /// Hand archived photos to the summarizer together with the transcript.
    pub attach_photos: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            cold_start_limit: 2,
            permalink_host: "t.me".to_string(),
            max_concurrent_writes: 16,
            session_name: "digest".to_string(),
            attach_photos: false,
        }
    }
}

impl SyncConfig {
    /// Directory holding one sub-directory per source.
    pub fn messages_dir(&self) -> PathBuf {
        self.data_dir.join("messages")
    }

    /// Directory holding the persisted session blob.
    pub fn sessions_dir(&self) -> PathBuf {
        self.data_dir.join("sessions")
    }
}

/// Credentials and overrides read from the environment at startup.
pub struct Settings {
    pub api_id: i32,
    pub api_hash: String,
    pub identity: Identity,
    pub openai_api_key: String,
    pub data_dir: Option<PathBuf>,
    pub openai_base_url: Option<String>,
    pub openai_model: Option<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads settings through `lookup`, failing on the first missing or
    /// malformed variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| lookup(var).ok_or(ConfigError::Missing(var));

        let api_id = required("API_ID")?
            .trim()
            .parse::<i32>()
            .map_err(|err| ConfigError::Malformed {
                var: "API_ID",
                reason: err.to_string(),
            })?;
        let api_hash = required("API_HASH")?;
        let identity = required("DIGEST_IDENTITY")?
            .parse::<Identity>()
            .map_err(|err| ConfigError::Malformed {
                var: "DIGEST_IDENTITY",
                reason: err.to_string(),
            })?;
        let openai_api_key = required("OPENAI_API_KEY")?;

        Ok(Self {
            api_id,
            api_hash,
            identity,
            openai_api_key,
            data_dir: lookup("DIGEST_DATA_DIR").map(PathBuf::from),
            openai_base_url: lookup("OPENAI_BASE_URL"),
            openai_model: lookup("OPENAI_MODEL"),
        })
    }

    /// Sync configuration with the environment overrides applied.
    pub fn sync_config(&self) -> SyncConfig {
        let mut config = SyncConfig::default();
        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        config
    }

    /// OpenAI client with the endpoint and model overrides applied.
    pub fn summarizer(&self) -> Result<OpenAiSummarizer, Error> {
        let mut summarizer = OpenAiSummarizer::new(self.openai_api_key.clone())?;
        if let Some(base_url) = &self.openai_base_url {
            summarizer = summarizer.with_base_url(base_url.clone());
        }
        if let Some(model) = &self.openai_model {
            summarizer = summarizer.with_model(model.clone());
        }
        Ok(summarizer)
    }
}
