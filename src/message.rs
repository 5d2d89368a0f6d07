use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Identifier of a message within its source. Ids grow over time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(pub i64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl From<i64> for MessageId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Stable identifier of a chat or channel. Names may change, ids do not.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId(pub i64);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for SourceId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// A source as listed by the message source, with its current display name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceInfo {
    pub id: SourceId,
    pub name: String,
}

/// Non-text content attached to a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Media {
    Photo,
    Video { file_name: Option<String> },
    Audio { file_name: Option<String> },
    File { file_name: Option<String> },
    Location,
    Contact,
    Poll { question: String },
    WebPage { title: Option<String> },
    /// Media of a kind the source could not classify.
    Other,
}

impl Media {
    /// Canonical marker inlined into the message text, e.g. `[FILE: report.pdf]`.
    pub fn marker(&self) -> String {
        match self {
            Self::Photo => "[PHOTO]".to_string(),
            Self::Video { file_name } => tagged("VIDEO", file_name.as_deref()),
            Self::Audio { file_name } => tagged("AUDIO", file_name.as_deref()),
            Self::File { file_name } => tagged("FILE", file_name.as_deref()),
            Self::Location => "[LOCATION]".to_string(),
            Self::Contact => "[CONTACT]".to_string(),
            Self::Poll { question } => format!("[POLL: {question}]"),
            Self::WebPage { title } => format!("[WEBPAGE: {}]", title.as_deref().unwrap_or("")),
            Self::Other => "[MEDIA]".to_string(),
        }
    }

    /// Photos are the only media archived as binary blobs.
    pub fn is_photo(&self) -> bool {
        matches!(self, Self::Photo)
    }
}

fn tagged(tag: &str, file_name: Option<&str>) -> String {
    match file_name {
        Some(name) => format!("[{tag}: {name}]"),
        None => format!("[{tag}]"),
    }
}

/// A message as delivered by the source, before normalization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawMessage {
    pub id: MessageId,
    pub text: String,
    pub media: Option<Media>,
}

impl RawMessage {
    pub fn new(id: impl Into<MessageId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            media: None,
        }
    }

    pub fn with_media(mut self, media: Media) -> Self {
        self.media = Some(media);
        self
    }

    /// Text with the media marker folded in, or `None` when the message
    /// carries neither text nor media.
    pub fn content(&self) -> Option<String> {
        let marker = self.media.as_ref().map(Media::marker);

        match (marker, self.text.is_empty()) {
            (Some(marker), true) => Some(marker),
            (Some(marker), false) => Some(format!("{marker}\n{}", self.text)),
            (None, false) => Some(self.text.clone()),
            (None, true) => None,
        }
    }
}

/// A message reduced to what is archived and summarized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedMessage {
    pub id: MessageId,
    pub source: SourceId,
    pub author: String,
    pub text: String,
}

impl NormalizedMessage {
    /// Normalizes `raw`, dropping it when it carries no content.
    pub fn from_raw(source: SourceId, author: impl Into<String>, raw: &RawMessage) -> Option<Self> {
        raw.content().map(|text| Self {
            id: raw.id,
            source,
            author: author.into(),
            text,
        })
    }
}
