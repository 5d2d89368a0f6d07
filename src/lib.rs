mod types;
pub use types::*;

mod error;
pub use error::{ConfigError, Error};

mod crypto;
pub use crypto::{Identity, Recipient, SealedFile, generate_random_seed};

mod config;
pub use config::{Settings, SyncConfig};

mod message;
pub use message::*;

mod store;
pub use store::CryptoStore;

mod progress;
pub use progress::*;

mod archive;
pub use archive::MessageArchive;

mod session;
pub use session::SessionStore;

mod source;
pub use source::*;

mod transcript;
pub use transcript::*;

mod sync;
pub use sync::{PassOutcome, SyncEngine};

mod digest;
pub use digest::*;

pub mod summarizer;
pub use summarizer::OpenAiSummarizer;

pub mod logging;
