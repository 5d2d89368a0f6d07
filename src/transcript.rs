use crate::{MessageId, NormalizedMessage};

/// Separator between message blocks. Chosen so it does not occur in ordinary
/// chat text.
pub const DELIMITER: &str = "\n=-=-=-=-=\n";

/// `https://<host>/<author>/<id>`
pub fn permalink(host: &str, author: &str, id: MessageId) -> String {
    format!("https://{host}/{author}/{id}")
}

/// Renders an ordered batch of messages into one text blob for summarization.
#[derive(Clone, Debug)]
pub struct TranscriptBuilder {
    host: String,
}

impl TranscriptBuilder {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    /// Renders `messages` in the given order, or `None` if there are none.
    pub fn render(&self, messages: &[NormalizedMessage]) -> Option<String> {
        if messages.is_empty() {
            return None;
        }

        let blocks: Vec<String> = messages
            .iter()
            .map(|message| {
                format!(
                    "url: {}\nusername: {}\n text:{}",
                    permalink(&self.host, &message.author, message.id),
                    message.author,
                    message.text
                )
            })
            .collect();

        Some(blocks.join(DELIMITER))
    }
}
