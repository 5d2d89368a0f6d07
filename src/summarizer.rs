use crate::{Error, Summarizer, SummarizerError};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4.1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Instructions sent with every transcript.
pub const SYSTEM_PROMPT: &str = "\
You summarize messages harvested from a single chat or channel.
Messages are separated by the line '=-=-=-=-='. Each message starts with its
permalink (url), the username of the source and then the text.

Language: reply in the language that dominates the messages. If several
languages are equally common, use the language of the most recent messages.

Media markers stand in for attachments:
- [PHOTO] an image; mention it when it adds context
- [VIDEO: name], [AUDIO: name] recordings; mention them when they carry information
- [FILE: name] documents; always mention them
- [LOCATION], [CONTACT] shared locations and contacts; mention them when relevant
- [POLL: question] summarize the question and its context
- [WEBPAGE: title] linked pages; mention them when they are references or news

Keep code snippets, technical links, version numbers and terminology intact.
Merge repeated information and prefer corrections over the statements they
correct. Skip greetings, emoji-only and off-topic chatter.

Structure the summary as: main developments first, then decisions and
outcomes, important links and media with the permalinks of the messages they
come from, notable discussions, and action items if there are any.

Present only the final summary, without describing your process.";

#[derive(serde::Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(serde::Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(serde::Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// [`Summarizer`] backed by an OpenAI-compatible chat completions endpoint.
#[derive(Clone, Debug)]
pub struct OpenAiSummarizer {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiSummarizer {
    pub fn new(api_key: impl Into<String>) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| Error::Summarizer(format!("HTTP client error: {err}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// Builds the chat completions request body. Images are attached as
/// low-detail JPEG data URLs.
pub fn request_body(model: &str, text: &str, images: &[Vec<u8>]) -> Value {
    let user_content = if images.is_empty() {
        Value::String(text.to_string())
    } else {
        let mut parts = vec![json!({ "type": "text", "text": text })];
        parts.extend(images.iter().map(|image| {
            json!({
                "type": "image_url",
                "image_url": {
                    "url": format!("data:image/jpeg;base64,{}", STANDARD.encode(image)),
                    "detail": "low"
                }
            })
        }));
        Value::Array(parts)
    };

    json!({
        "model": model,
        "n": 1,
        "messages": [
            { "role": "system", "content": SYSTEM_PROMPT },
            { "role": "user", "content": user_content }
        ]
    })
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(
        &self,
        text: &str,
        images: &[Vec<u8>],
    ) -> Result<Option<String>, SummarizerError> {
        if text.is_empty() {
            return Ok(None);
        }

        debug!(
            "requesting summary of {} bytes with {} images from {}",
            text.len(),
            images.len(),
            self.model
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request_body(&self.model, text, images))
            .send()
            .await
            .map_err(|err| SummarizerError(format!("request failed: {err}")))?
            .error_for_status()
            .map_err(|err| SummarizerError(format!("request rejected: {err}")))?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|err| SummarizerError(format!("failed to parse response: {err}")))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content))
    }
}
