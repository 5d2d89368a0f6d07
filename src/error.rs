use std::path::PathBuf;

/// Errors that can occur while syncing, archiving or summarizing chat sources.
#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum Error {
    /// Startup configuration is missing or malformed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A cryptographic operation failed.
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),

    /// Random number generation failed.
    #[error("Random number generation failed")]
    Random,

    /// Serialization or deserialization failed.
    #[error("Serialization/deserialization failed: {0}")]
    Serde(String),

    /// A stored file is absent, corrupt, or not sealed to the held identity.
    #[error("Failed to decrypt {}: {reason}", .path.display())]
    Decryption { path: PathBuf, reason: String },

    /// A stored file decrypted, but its plaintext is not UTF-8.
    #[error("{} does not hold valid UTF-8 text", .path.display())]
    Encoding { path: PathBuf },

    /// A stored file decrypted to text that cannot be interpreted.
    #[error("Corrupt record {}: {reason}", .path.display())]
    CorruptRecord { path: PathBuf, reason: String },

    /// Writing to the data directory failed.
    #[error("I/O error on {}: {reason}", .path.display())]
    Io { path: PathBuf, reason: String },

    /// The message source failed to list, fetch or resolve messages.
    #[error("Message source error: {0}")]
    SourceFetch(String),

    /// The summarization backend failed.
    #[error("Summarizer error: {0}")]
    Summarizer(String),

    /// A blocking worker task panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Task(String),
}

impl From<aes_gcm_siv::Error> for Error {
    fn from(value: aes_gcm_siv::Error) -> Self {
        Self::Crypto(value.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Task(value.to_string())
    }
}

/// Fatal startup errors. Each kind maps to its own process exit code.
#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("Please set required environment variable {0}")]
    Missing(&'static str),

    /// A required environment variable is set but cannot be parsed.
    #[error("{var} is malformed: {reason}")]
    Malformed { var: &'static str, reason: String },
}

impl ConfigError {
    /// Exit code for the process: 1 when something is missing, 2 when malformed.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Missing(_) => 1,
            Self::Malformed { .. } => 2,
        }
    }
}
